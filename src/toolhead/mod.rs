//! Toolhead-facing interfaces.
//!
//! The toolhead, its clock and stepper enable tracking live outside this
//! crate. These traits describe what the transform chain and manual axes
//! need from them, with the current committed time passed explicitly.

mod registry;

pub use registry::{ExtraAxisRegistry, EXTRA_AXIS_BASE, MAX_EXTRA_AXES};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::Result;
use crate::motion::{Move, SharedQueue};
use crate::rail::SharedStepGenerator;

/// Shared print clock.
pub trait MotionClock {
    /// Time at which the last queued toolhead move ends.
    fn get_last_move_time(&mut self) -> f64;

    /// Delay further toolhead moves by `delay` seconds.
    fn dwell(&mut self, delay: f64);

    /// Note that a controller move queue received motion up to `time`.
    fn note_mcu_movequeue_activity(&mut self, time: f64);
}

/// Tracks driver enable lines for every stepper.
pub trait StepperEnable {
    /// Enable the named stepper at `print_time`.
    fn motor_enable(&mut self, stepper: &str, print_time: f64);

    /// Disable the named stepper at `print_time`.
    fn motor_disable(&mut self, stepper: &str, print_time: f64);
}

/// A coordinate appended to the toolhead position after x, y, z and e.
pub trait ExtraAxis: fmt::Debug {
    /// Object name, as referenced by pivot stage `control` options.
    fn name(&self) -> &str;

    /// Command-language letter of the axis.
    fn gcode_id(&self) -> Option<char>;

    /// Queue the axis' segments go to.
    ///
    /// The toolhead finalizes it alongside its own queue once steps are
    /// generated, so retained history stays bounded.
    fn trapq(&self) -> &SharedQueue;

    /// Queue this axis' component of a toolhead move.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is rejected by the axis queue.
    fn process_move(&mut self, print_time: f64, mv: &ToolheadMove, ea_index: usize) -> Result<()>;

    /// Check a toolhead move against this axis' limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the move is not allowed.
    fn check_move(&self, mv: &ToolheadMove, ea_index: usize) -> Result<()>;

    /// Maximum squared junction velocity between two moves.
    fn calc_junction(&self, prev: &ToolheadMove, mv: &ToolheadMove, ea_index: usize) -> f64;
}

/// Toolhead services used by extra axes.
pub trait Toolhead: MotionClock {
    /// Append an extra axis to the toolhead position at `position`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::DuplicateExtraAxis` if the name is taken.
    fn add_extra_axis(&mut self, axis: Box<dyn ExtraAxis>, position: f64) -> Result<()>;

    /// Remove an extra axis by name. Removing an unknown axis is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the toolhead cannot drop the axis.
    fn remove_extra_axis(&mut self, name: &str) -> Result<()>;

    /// Include a generator in the toolhead step generation loop.
    fn register_step_generator(&mut self, generator: SharedStepGenerator);

    /// Remove a generator from the toolhead step generation loop.
    fn unregister_step_generator(&mut self, generator: &SharedStepGenerator);
}

/// A toolhead move with per-axis ratios, already split into phases.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolheadMove {
    /// Start coordinate, one entry per axis.
    pub start_pos: Vec<f64>,
    /// Per-axis share of the move distance.
    pub axes_r: Vec<f64>,
    /// Acceleration phase duration.
    pub accel_t: f64,
    /// Cruise phase duration.
    pub cruise_t: f64,
    /// Deceleration phase duration.
    pub decel_t: f64,
    /// Start speed along the move.
    pub start_v: f64,
    /// Cruise speed along the move.
    pub cruise_v: f64,
    /// Acceleration along the move.
    pub accel: f64,
    /// Highest squared cruise speed allowed for this move.
    pub max_cruise_v2: f64,
}

impl ToolheadMove {
    /// Build a move between two coordinates with the given phases.
    ///
    /// The axis ratios are the per-axis deltas over the Euclidean distance
    /// of the first three axes. Extra axes of a pure extra-axis move use the
    /// length of their own delta instead.
    #[allow(clippy::too_many_arguments)]
    pub fn between(
        start: &[f64],
        end: &[f64],
        accel_t: f64,
        cruise_t: f64,
        decel_t: f64,
        start_v: f64,
        cruise_v: f64,
        accel: f64,
    ) -> Self {
        let deltas: Vec<f64> = start.iter().zip(end).map(|(s, e)| e - s).collect();
        let xyz2: f64 = deltas.iter().take(3).map(|d| d * d).sum();
        let mut dist = libm::sqrt(xyz2);
        if dist == 0.0 {
            dist = libm::sqrt(deltas.iter().map(|d| d * d).sum());
        }
        let axes_r = deltas
            .iter()
            .map(|d| if dist > 0.0 { d / dist } else { 0.0 })
            .collect();
        Self {
            start_pos: start.to_vec(),
            axes_r,
            accel_t,
            cruise_t,
            decel_t,
            start_v,
            cruise_v,
            accel,
            max_cruise_v2: cruise_v * cruise_v,
        }
    }

    /// Total duration.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.accel_t + self.cruise_t + self.decel_t
    }

    /// One-dimensional segment for axis `index`, or `None` if the move has
    /// no such axis.
    pub fn axis_segment(&self, print_time: f64, index: usize) -> Option<Move> {
        let start_pos = *self.start_pos.get(index)?;
        let r = *self.axes_r.get(index)?;
        Some(Move::new(
            print_time,
            start_pos,
            self.accel_t,
            self.cruise_t,
            self.decel_t,
            self.start_v * r,
            self.cruise_v * r,
            self.accel * r,
        ))
    }
}

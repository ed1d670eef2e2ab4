//! Pivot coordinate transform.
//!
//! Each stage rotates the cartesian part of the coordinate around a fixed
//! pivot point, by an angle taken from an extra axis (a rotary table or
//! tilting head driven by a manual stepper). Moves that turn a rotary axis
//! are split so no sub-move sweeps more than `resolution` of arc.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;

use libm::{ceil, cos, fabs, sin, sqrt};
use tracing::{debug, info};

use super::host::TransformHost;
use super::MoveTransform;
use crate::config::{PivotCoordConfig, MAX_STAGES};
use crate::error::{CommandError, ConfigError, Error, MotionError, Result};
use crate::motion::Axis;
use crate::toolhead::ExtraAxisRegistry;

/// One rotation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotStage {
    control: String,
    rotate_axis: Axis,
    offset: [f64; 3],
    /// Coordinate index of the driving extra axis, while it is registered.
    ea_index: Option<usize>,
}

impl PivotStage {
    /// Name of the extra axis driving the rotation.
    #[inline]
    pub fn control(&self) -> &str {
        &self.control
    }

    /// Axis the rotation happens around.
    #[inline]
    pub fn rotate_axis(&self) -> Axis {
        self.rotate_axis
    }

    /// Pivot point.
    #[inline]
    pub fn offset(&self) -> [f64; 3] {
        self.offset
    }

    /// Current coordinate index of the driving axis.
    #[inline]
    pub fn ea_index(&self) -> Option<usize> {
        self.ea_index
    }
}

/// Chain of pivot rotations in front of an inner transform.
#[derive(Debug)]
pub struct PivotCoord {
    stages: Vec<PivotStage>,
    inv_resolution: f64,
    axis_to_radians: f64,
    /// Last untransformed position
    last_pos: Vec<f64>,
    /// Squared pivot distance per coordinate index at `last_pos`
    last_pivots_d2: Vec<f64>,
    next: Option<Box<dyn MoveTransform>>,
}

impl PivotCoord {
    /// Create a transform with no stages.
    ///
    /// `resolution` bounds the arc length of each sub-move and
    /// `axis_full_rotation` is the rotary axis travel of one full turn.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless both are finite and > 0.
    pub fn new(
        resolution: f64,
        axis_full_rotation: f64,
    ) -> core::result::Result<Self, ConfigError> {
        for (option, value) in [
            ("resolution", resolution),
            ("axis_full_rotation", axis_full_rotation),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    option: crate::error::name(option),
                    value,
                    reason: "must be > 0",
                });
            }
        }
        Ok(Self {
            stages: Vec::new(),
            inv_resolution: 1.0 / resolution,
            axis_to_radians: 2.0 * core::f64::consts::PI / axis_full_rotation,
            last_pos: Vec::new(),
            last_pivots_d2: Vec::new(),
            next: None,
        })
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for malformed stage options or non-positive
    /// resolution and full rotation.
    pub fn from_config(config: &PivotCoordConfig) -> core::result::Result<Self, ConfigError> {
        let mut pivot = Self::new(config.resolution.value(), config.axis_full_rotation.value())?;
        for stage in config.stages()? {
            pivot.add_stage(&stage.control, stage.rotate_axis, stage.offset)?;
        }
        Ok(pivot)
    }

    /// Append a stage driven by the extra axis named `control`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TooManyStages` past the stage limit.
    pub fn add_stage(
        &mut self,
        control: &str,
        rotate_axis: Axis,
        offset: [f64; 3],
    ) -> core::result::Result<(), ConfigError> {
        if self.stages.len() >= MAX_STAGES {
            return Err(ConfigError::TooManyStages(MAX_STAGES));
        }
        self.stages.push(PivotStage {
            control: String::from(control),
            rotate_axis,
            offset,
            ea_index: None,
        });
        Ok(())
    }

    /// Configured stages in order.
    #[inline]
    pub fn stages(&self) -> &[PivotStage] {
        &self.stages
    }

    /// Last untransformed position.
    #[inline]
    pub fn last_position(&self) -> &[f64] {
        &self.last_pos
    }

    /// Place this transform in front of `next`.
    pub fn attach(&mut self, next: Box<dyn MoveTransform>) {
        self.next = Some(next);
    }

    /// Whether an inner transform is attached.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.next.is_some()
    }

    /// Resolve each stage's driving axis against the registry.
    pub fn resolve_extra_axes(&mut self, registry: &ExtraAxisRegistry) {
        for stage in &mut self.stages {
            stage.ea_index = registry.index_of(&stage.control);
        }
    }

    /// Rotate `coord` through every stage whose driving axis is registered.
    ///
    /// Forward order rotates by the axis angle; `reverse` walks the stages
    /// backwards with negated angles, undoing a forward pass. Returns the
    /// rotated coordinate and the squared pivot distance per coordinate
    /// index (zero where no stage is driven).
    ///
    /// # Errors
    ///
    /// Returns `MotionError::CoordinateTooShort` if the coordinate lacks
    /// the cartesian axes or a driving axis.
    pub fn pivot_coords(&self, coord: &[f64], reverse: bool) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut coord = coord.to_vec();
        let len = coord.len();
        if len < 3 {
            return Err(MotionError::CoordinateTooShort { len, index: 2 }.into());
        }
        let mut pivots_d2 = vec![0.0; len];
        let pmult = if reverse {
            -self.axis_to_radians
        } else {
            self.axis_to_radians
        };

        let mut apply = |stage: &PivotStage| -> Result<()> {
            let Some(ea_index) = stage.ea_index else {
                return Ok(());
            };
            let angle = *coord
                .get(ea_index)
                .ok_or(MotionError::CoordinateTooShort { len, index: ea_index })?
                * pmult;
            let [ox, oy, oz] = stage.offset;
            let oc = [coord[0] - ox, coord[1] - oy, coord[2] - oz];
            let (c0, c1) = match stage.rotate_axis {
                Axis::X => (oc[1], oc[2]),
                Axis::Y => (oc[2], oc[0]),
                Axis::Z => (oc[0], oc[1]),
            };
            let (s, c) = (sin(angle), cos(angle));
            let (n0, n1) = (c0 * c - c1 * s, c0 * s + c1 * c);
            let rotated = match stage.rotate_axis {
                Axis::X => [oc[0], n0, n1],
                Axis::Y => [n1, oc[1], n0],
                Axis::Z => [n0, n1, oc[2]],
            };
            coord[0] = rotated[0] + ox;
            coord[1] = rotated[1] + oy;
            coord[2] = rotated[2] + oz;
            pivots_d2[ea_index] = c0 * c0 + c1 * c1;
            Ok(())
        };

        if reverse {
            self.stages.iter().rev().try_for_each(&mut apply)?;
        } else {
            self.stages.iter().try_for_each(&mut apply)?;
        }
        Ok((coord, pivots_d2))
    }

    fn next_mut(&mut self) -> Result<&mut Box<dyn MoveTransform>> {
        self.next
            .as_mut()
            .ok_or(Error::Motion(MotionError::TransformDetached("pivot_coord")))
    }

    /// Worst-case arc length swept by any stage between the last position
    /// and `target`.
    fn angular_travel(&self, target: &[f64], next_pivots_d2: &[f64]) -> f64 {
        let mut travel: f64 = 0.0;
        for stage in &self.stages {
            let Some(i) = stage.ea_index else { continue };
            let (Some(&new), Some(&last)) = (target.get(i), self.last_pos.get(i)) else {
                continue;
            };
            if new == last {
                continue;
            }
            let last_d2 = self.last_pivots_d2.get(i).copied().unwrap_or(0.0);
            let next_d2 = next_pivots_d2.get(i).copied().unwrap_or(0.0);
            let radius = sqrt(last_d2.max(next_d2));
            travel = travel.max(fabs(new - last) * self.axis_to_radians * radius);
        }
        travel
    }
}

impl MoveTransform for PivotCoord {
    fn get_position(&mut self) -> Result<Vec<f64>> {
        let coord = self.next_mut()?.get_position()?;
        let (untransformed, pivots_d2) = self.pivot_coords(&coord, true)?;
        self.last_pos = untransformed.clone();
        self.last_pivots_d2 = pivots_d2;
        Ok(untransformed)
    }

    fn move_to(&mut self, target: &[f64], speed: f64) -> Result<()> {
        if self.last_pos.len() != target.len() {
            self.get_position()?;
        }
        let (next_pos, next_pivots_d2) = self.pivot_coords(target, false)?;

        let travel = self.angular_travel(target, &next_pivots_d2);
        let segments = ceil(travel * self.inv_resolution) as usize;
        if segments >= 2 {
            let inv = 1.0 / segments as f64;
            let last_pos = self.last_pos.clone();
            debug!(segments, travel, "splitting rotary move");
            for i in 1..segments {
                let frac = i as f64 * inv;
                let spos: Vec<f64> = last_pos
                    .iter()
                    .zip(target)
                    .map(|(lp, np)| lp + (np - lp) * frac)
                    .collect();
                let (npos, _) = self.pivot_coords(&spos, false)?;
                self.next_mut()?.move_to(&npos, speed)?;
            }
        }

        self.next_mut()?.move_to(&next_pos, speed)?;
        self.last_pos = target.to_vec();
        self.last_pivots_d2 = next_pivots_d2;
        Ok(())
    }

    fn update_extra_axes(&mut self, registry: &ExtraAxisRegistry) {
        self.resolve_extra_axes(registry);
        if let Some(next) = self.next.as_mut() {
            next.update_extra_axes(registry);
        }
    }

    fn take_next(&mut self) -> Option<Box<dyn MoveTransform>> {
        self.next.take()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Activation control for a [`PivotCoord`].
///
/// While inactive the transform is parked here; while active it sits on top
/// of the host's chain with the previous transform inside it.
#[derive(Debug)]
pub struct PivotCoordControl {
    parked: Option<Box<PivotCoord>>,
}

impl PivotCoordControl {
    /// Create an inactive control for `pivot`.
    pub fn new(pivot: PivotCoord) -> Self {
        Self {
            parked: Some(Box::new(pivot)),
        }
    }

    /// Whether the transform is installed in a host.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.parked.is_none()
    }

    /// Parked transform, while inactive.
    pub fn pivot(&self) -> Option<&PivotCoord> {
        self.parked.as_deref()
    }

    /// Install the transform on top of the host's chain.
    ///
    /// Stage axes are resolved against `registry` and the host's last
    /// position is re-read through the new chain.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::TransformAlreadyActive` if already active,
    /// leaving the chain untouched.
    pub fn activate(
        &mut self,
        host: &mut TransformHost,
        registry: &ExtraAxisRegistry,
    ) -> Result<()> {
        let Some(mut pivot) = self.parked.take() else {
            return Err(CommandError::TransformAlreadyActive.into());
        };
        pivot.resolve_extra_axes(registry);
        host.replace_with(move |previous| {
            pivot.attach(previous);
            pivot as Box<dyn MoveTransform>
        });
        host.reset_last_position()?;
        info!("pivot transform activated");
        Ok(())
    }

    /// Remove the transform from the host and restore the previous one.
    ///
    /// Does nothing when already inactive.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::TransformNotOnTop` if another transform was
    /// installed above this one.
    pub fn deactivate(&mut self, host: &mut TransformHost) -> Result<()> {
        if self.parked.is_some() {
            return Ok(());
        }
        if !host.transform().as_any().is::<PivotCoord>() {
            return Err(CommandError::TransformNotOnTop.into());
        }
        let previous = host
            .transform_mut()
            .take_next()
            .ok_or(Error::Motion(MotionError::TransformDetached("pivot_coord")))?;
        let pivot = host.set_move_transform(previous, true)?;
        let pivot = pivot
            .into_any()
            .downcast::<PivotCoord>()
            .map_err(|_| Error::Motion(MotionError::TransformDetached("pivot_coord")))?;
        self.parked = Some(pivot);
        info!("pivot transform deactivated");
        Ok(())
    }
}

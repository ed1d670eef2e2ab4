//! Manual stepper: an independently clocked single-rail axis.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String as ObjectName;
use alloc::vec::Vec;
use core::cell::RefCell;

use heapless::String;
use tracing::{debug, info, warn};

use super::homing::{HomingCoordinator, ManualHomingTarget};
use super::state::AxisState;
use crate::config::ManualStepperConfig;
use crate::error::{name, CommandError, ConfigError, Error, MotionError, Result};
use crate::kinematics::StepperPositions;
use crate::motion::{Move, SharedQueue, TrapQueue, TrapezoidProfile};
use crate::rail::{Endstop, Rail, SharedRail, SharedStepGenerator, Stepper, StepperRef};
use crate::toolhead::{ExtraAxis, MotionClock, StepperEnable, Toolhead, ToolheadMove};

/// Axis letters that can never name an extra axis.
pub const RESERVED_AXES: &str = "XYZEFN";

/// How far past a standalone move its queue is finalized.
pub const FINALIZE_HORIZON: f64 = 99999.9;

/// Extra-axis registration: the axis letter and the generator handed to
/// the toolhead.
#[derive(Debug)]
struct Registration {
    gcode_id: char,
    generator: SharedStepGenerator,
}

/// A single rail driven outside the toolhead's kinematics.
///
/// Moves go to a private one-channel queue on a virtual clock
/// (`next_cmd_time`) that is synchronized with the toolhead clock before
/// anything that could race toolhead motion.
#[derive(Debug)]
pub struct ManualStepper {
    name: String<32>,
    object_name: ObjectName,
    rail: SharedRail,
    queue: SharedQueue,
    can_home: bool,
    velocity: f64,
    accel: f64,
    homing_accel: f64,
    next_cmd_time: f64,
    state: AxisState,
    registration: Option<Registration>,
}

impl ManualStepper {
    /// Create a manual stepper around `rail`.
    ///
    /// The rail is bound to a fresh one-channel queue. The axis can home
    /// when the rail has an endstop.
    pub fn new(stepper_name: &str, mut rail: Rail, velocity: f64, accel: f64) -> Self {
        let queue = TrapQueue::shared(1);
        rail.set_trapq(queue.clone());
        let can_home = !rail.get_endstops().is_empty();
        Self {
            name: name(stepper_name),
            object_name: format!("manual_stepper {stepper_name}"),
            rail: Rc::new(RefCell::new(rail)),
            queue,
            can_home,
            velocity,
            accel,
            homing_accel: accel,
            next_cmd_time: 0.0,
            state: AxisState::Idle,
            registration: None,
        }
    }

    /// Build a manual stepper from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a non-positive velocity, a negative
    /// acceleration, or an endstop on another controller.
    pub fn from_config(
        stepper_name: &str,
        config: &ManualStepperConfig,
    ) -> core::result::Result<Self, ConfigError> {
        if config.velocity.value() <= 0.0 {
            return Err(ConfigError::InvalidValue {
                option: name("velocity"),
                value: config.velocity.value(),
                reason: "must be > 0",
            });
        }
        if config.accel.value() < 0.0 {
            return Err(ConfigError::InvalidValue {
                option: name("accel"),
                value: config.accel.value(),
                reason: "must be >= 0",
            });
        }
        let mut rail = Rail::new(config.stepper.name.as_str());
        if let Some(ref endstop) = config.endstop {
            rail.add_endstop(Endstop::new(
                config.stepper.name.as_str(),
                endstop.pin.as_str(),
                endstop.controller.as_str(),
            ))?;
        }
        rail.add_stepper(Stepper::from_config(&config.stepper))?;
        Ok(Self::new(
            stepper_name,
            rail,
            config.velocity.value(),
            config.accel.value(),
        ))
    }

    /// Short name, as given in the configuration section.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Object name (`manual_stepper <name>`), used as the extra axis name.
    #[inline]
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// The rail, shared with the toolhead step generation loop while
    /// registered as an extra axis.
    #[inline]
    pub fn rail(&self) -> &SharedRail {
        &self.rail
    }

    /// The private move queue.
    #[inline]
    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Whether the axis has an endstop.
    #[inline]
    pub fn can_home(&self) -> bool {
        self.can_home
    }

    /// Default move velocity.
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Default move acceleration.
    #[inline]
    pub fn accel(&self) -> f64 {
        self.accel
    }

    /// Virtual clock: time at which the next command starts.
    #[inline]
    pub fn next_cmd_time(&self) -> f64 {
        self.next_cmd_time
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> AxisState {
        self.state
    }

    /// Registered axis letter, if any.
    pub fn gcode_axis(&self) -> Option<char> {
        self.registration.as_ref().map(|r| r.gcode_id)
    }

    /// Bring the virtual clock and the toolhead clock together.
    ///
    /// If this axis is ahead the toolhead dwells; otherwise the virtual
    /// clock jumps forward. Neither clock moves backward.
    pub fn sync_print_time<C: MotionClock + ?Sized>(&mut self, clock: &mut C) {
        let print_time = clock.get_last_move_time();
        if self.next_cmd_time > print_time {
            clock.dwell(self.next_cmd_time - print_time);
        } else {
            self.next_cmd_time = print_time;
        }
    }

    fn check_commandable(&self) -> Result<()> {
        if self.registration.is_some() {
            return Err(CommandError::AxisRegistered(self.name.clone()).into());
        }
        if self.state != AxisState::Idle {
            return Err(CommandError::NotIdle(self.name.clone()).into());
        }
        Ok(())
    }

    /// Enable or disable every stepper of the rail at the virtual clock.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` while registered as an extra axis or homing.
    pub fn enable<C, E>(&mut self, clock: &mut C, enables: &mut E, enable: bool) -> Result<()>
    where
        C: MotionClock + ?Sized,
        E: StepperEnable + ?Sized,
    {
        self.check_commandable()?;
        self.sync_print_time(clock);
        let names: Vec<StepperRef> = self.rail.borrow().stepper_refs();
        for stepper in &names {
            if enable {
                enables.motor_enable(stepper.name.as_str(), self.next_cmd_time);
            } else {
                enables.motor_disable(stepper.name.as_str(), self.next_cmd_time);
            }
        }
        self.sync_print_time(clock);
        Ok(())
    }

    /// Set the rail position without moving.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` while registered as an extra axis or homing.
    pub fn set_position(&mut self, pos: f64) -> Result<()> {
        self.check_commandable()?;
        self.do_set_position(pos)
    }

    pub(crate) fn do_set_position(&mut self, pos: f64) -> Result<()> {
        self.rail.borrow_mut().set_position(&[pos, 0.0, 0.0])
    }

    /// Move to `target`.
    ///
    /// `speed` and `accel` default to the configured values. With `sync`
    /// the toolhead clock is brought up to the end of the move.
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` for a non-positive speed, a negative
    /// acceleration, while registered as an extra axis or homing.
    pub fn move_to<C: MotionClock + ?Sized>(
        &mut self,
        clock: &mut C,
        target: f64,
        speed: Option<f64>,
        accel: Option<f64>,
        sync: bool,
    ) -> Result<()> {
        self.check_commandable()?;
        let (speed, accel) = self.resolve_speeds(speed, accel)?;
        self.do_move(clock, target, speed, accel, sync)
    }

    fn resolve_speeds(&self, speed: Option<f64>, accel: Option<f64>) -> Result<(f64, f64)> {
        let speed = speed.unwrap_or(self.velocity);
        let accel = accel.unwrap_or(self.accel);
        if speed.is_nan() || speed <= 0.0 {
            return Err(CommandError::InvalidSpeed(speed).into());
        }
        if accel.is_nan() || accel < 0.0 {
            return Err(CommandError::InvalidAccel(accel).into());
        }
        Ok((speed, accel))
    }

    pub(crate) fn do_move<C: MotionClock + ?Sized>(
        &mut self,
        clock: &mut C,
        target: f64,
        speed: f64,
        accel: f64,
        sync: bool,
    ) -> Result<()> {
        self.sync_print_time(clock);
        let cp = self.rail.borrow().get_commanded_position();
        let profile = TrapezoidProfile::symmetric(target - cp, speed, accel);
        let sign = profile.direction.sign();
        let segment = Move::new(
            self.next_cmd_time,
            cp,
            profile.accel_t,
            profile.cruise_t,
            profile.accel_t,
            0.0,
            sign * profile.cruise_v,
            sign * accel,
        );
        self.queue.borrow_mut().append(0, segment)?;
        self.next_cmd_time += profile.duration();
        debug!(
            stepper = self.name.as_str(),
            from = cp,
            to = target,
            end_time = self.next_cmd_time,
            "manual move queued"
        );

        self.rail.borrow_mut().generate_steps(self.next_cmd_time)?;
        let horizon = self.next_cmd_time + FINALIZE_HORIZON;
        self.queue.borrow_mut().finalize(horizon, horizon);
        clock.note_mcu_movequeue_activity(self.next_cmd_time);
        if sync {
            self.sync_print_time(clock);
        }
        Ok(())
    }

    /// Move toward `target` until the endstop reaches the `triggered` state.
    ///
    /// The homing coordinator drives this axis through a
    /// [`ManualHomingTarget`]; the axis returns to idle afterwards, whether
    /// or not the coordinator succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NoEndstop` without an endstop, any argument or
    /// state `CommandError`, or the coordinator's error.
    #[allow(clippy::too_many_arguments)]
    pub fn homing_move<H, C>(
        &mut self,
        coordinator: &mut H,
        clock: &mut C,
        target: f64,
        speed: Option<f64>,
        accel: Option<f64>,
        triggered: bool,
        check_trigger: bool,
    ) -> Result<()>
    where
        H: HomingCoordinator + ?Sized,
        C: MotionClock + ?Sized,
    {
        self.check_commandable()?;
        if !self.can_home {
            warn!(stepper = self.name.as_str(), "homing without endstop");
            return Err(CommandError::NoEndstop(self.name.clone()).into());
        }
        let (speed, accel) = self.resolve_speeds(speed, accel)?;
        self.homing_accel = accel;
        let endstops: Vec<Endstop> = self.rail.borrow().get_endstops().to_vec();

        self.state = AxisState::Homing;
        debug!(stepper = self.name.as_str(), target, "homing move");
        let result = {
            let mut target_adapter = ManualHomingTarget::new(self, clock);
            coordinator.manual_home(
                &mut target_adapter,
                &endstops,
                [target, 0.0, 0.0, 0.0],
                speed,
                triggered,
                check_trigger,
            )
        };
        self.state = AxisState::Idle;
        result
    }

    /// Register with the toolhead as extra axis `gcode_axis`, or unregister
    /// when `gcode_axis` is empty.
    ///
    /// Unregistering while unregistered does nothing.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::AxisRegistered` when registering while
    /// already registered, `CommandError::InvalidGcodeAxis` for anything but
    /// one uppercase letter outside `XYZEFN`, or the toolhead's error. State
    /// is unchanged on error.
    pub fn set_gcode_axis<T: Toolhead + ?Sized>(
        &mut self,
        toolhead: &mut T,
        gcode_axis: &str,
    ) -> Result<()> {
        if let Some(registration) = self.registration.as_ref() {
            if !gcode_axis.is_empty() {
                return Err(CommandError::AxisRegistered(self.name.clone()).into());
            }
            toolhead.remove_extra_axis(&self.object_name)?;
            toolhead.unregister_step_generator(&registration.generator);
            info!(
                stepper = self.name.as_str(),
                axis = %registration.gcode_id,
                "extra axis unregistered"
            );
            self.registration = None;
            return Ok(());
        }

        let mut chars = gcode_axis.chars();
        let gcode_id = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_uppercase() && !RESERVED_AXES.contains(c) => c,
            _ if gcode_axis.is_empty() => return Ok(()),
            _ => {
                return Err(CommandError::InvalidGcodeAxis(name(gcode_axis)).into());
            }
        };

        let position = self.get_position()[0];
        toolhead.add_extra_axis(Box::new(self.extra_axis(gcode_id)), position)?;
        let generator: SharedStepGenerator = self.rail.clone();
        toolhead.register_step_generator(generator.clone());
        self.registration = Some(Registration {
            gcode_id,
            generator,
        });
        info!(stepper = self.name.as_str(), axis = %gcode_id, position, "extra axis registered");
        Ok(())
    }

    fn extra_axis(&self, gcode_id: char) -> ManualExtraAxis {
        ManualExtraAxis {
            name: self.object_name.clone(),
            gcode_id,
            queue: self.queue.clone(),
        }
    }

    /// Position as a homing coordinate: the rail position then zeros.
    pub fn get_position(&self) -> [f64; 4] {
        [self.rail.borrow().get_commanded_position(), 0.0, 0.0, 0.0]
    }

    /// Steppers moved by this axis.
    pub fn get_steppers(&self) -> Vec<StepperRef> {
        self.rail.borrow().stepper_refs()
    }

    /// Axis coordinate for measured stepper positions.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::MissingRailPosition` if the rail is absent.
    pub fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]> {
        let rail = self.rail.borrow();
        let key: String<32> = name(rail.name());
        let pos = positions
            .get(&key)
            .copied()
            .ok_or(Error::Motion(MotionError::MissingRailPosition(key.clone())))?;
        Ok([pos, 0.0, 0.0])
    }

    /// Commanded position keyed by rail name.
    pub fn stepper_positions(&self) -> StepperPositions {
        let rail = self.rail.borrow();
        let mut positions = StepperPositions::new();
        let _ = positions.insert(name(rail.name()), rail.get_commanded_position());
        positions
    }

    pub(crate) fn homing_accel(&self) -> f64 {
        self.homing_accel
    }

    pub(crate) fn dwell(&mut self, delay: f64) {
        self.next_cmd_time += delay.max(0.0);
    }
}

/// Extra-axis view of a manual stepper handed to the toolhead.
///
/// Toolhead moves append this axis' component to the stepper's queue; the
/// rail registered as a step generator turns it into steps.
#[derive(Debug, Clone)]
pub struct ManualExtraAxis {
    name: ObjectName,
    gcode_id: char,
    queue: SharedQueue,
}

impl ExtraAxis for ManualExtraAxis {
    fn name(&self) -> &str {
        &self.name
    }

    fn gcode_id(&self) -> Option<char> {
        Some(self.gcode_id)
    }

    fn trapq(&self) -> &SharedQueue {
        &self.queue
    }

    fn process_move(&mut self, print_time: f64, mv: &ToolheadMove, ea_index: usize) -> Result<()> {
        let segment = mv
            .axis_segment(print_time, ea_index)
            .ok_or(MotionError::CoordinateTooShort {
                len: mv.start_pos.len().min(mv.axes_r.len()),
                index: ea_index,
            })?;
        self.queue.borrow_mut().append(0, segment)?;
        Ok(())
    }

    fn check_move(&self, _mv: &ToolheadMove, _ea_index: usize) -> Result<()> {
        Ok(())
    }

    fn calc_junction(&self, _prev: &ToolheadMove, mv: &ToolheadMove, _ea_index: usize) -> f64 {
        mv.max_cruise_v2
    }
}

//! Homing support for manual axes.
//!
//! The homing coordinator lives outside this crate. It drives a
//! [`HomingTarget`] the same way it drives the toolhead: read the position,
//! issue a drip move toward the endstop, and reset the position once the
//! endstop triggers.

use alloc::vec::Vec;

use super::stepper::ManualStepper;
use crate::error::{MotionError, Result};
use crate::kinematics::StepperPositions;
use crate::rail::{Endstop, StepperRef};
use crate::toolhead::MotionClock;

/// Position and move provider for a homing coordinator.
///
/// A target is also its own kinematics: it reports its steppers and maps
/// stepper positions back to a coordinate.
pub trait HomingTarget {
    /// Current coordinate.
    fn get_position(&self) -> Vec<f64>;

    /// Reset the coordinate without moving.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate is too short.
    fn set_position(&mut self, newpos: &[f64]) -> Result<()>;

    /// Bring pending motion up to date with the shared clock.
    fn flush_step_generation(&mut self);

    /// Time at which the last queued move ends.
    fn get_last_move_time(&mut self) -> f64;

    /// Delay the next move by `delay` seconds (negative delays are ignored).
    fn dwell(&mut self, delay: f64);

    /// Move toward `newpos` until the endstop triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the move cannot be queued.
    fn drip_move(&mut self, newpos: &[f64], speed: f64) -> Result<()>;

    /// Steppers moved by this target.
    fn get_steppers(&self) -> Vec<StepperRef>;

    /// Coordinate for measured stepper positions.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::MissingRailPosition` if a stepper is absent.
    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]>;

    /// Commanded stepper positions keyed by name.
    fn stepper_positions(&self) -> StepperPositions;
}

/// External homing coordinator.
pub trait HomingCoordinator {
    /// Home `target` toward `pos` against `endstops`.
    ///
    /// `triggered` selects the endstop state that ends the move;
    /// `check_trigger` reports a move that ends without reaching it.
    ///
    /// # Errors
    ///
    /// Returns an error if homing fails or the target rejects a move.
    fn manual_home(
        &mut self,
        target: &mut dyn HomingTarget,
        endstops: &[Endstop],
        pos: [f64; 4],
        speed: f64,
        triggered: bool,
        check_trigger: bool,
    ) -> Result<()>;
}

/// A manual stepper paired with the shared clock for one homing move.
pub struct ManualHomingTarget<'a, C: MotionClock + ?Sized> {
    stepper: &'a mut ManualStepper,
    clock: &'a mut C,
}

impl<'a, C: MotionClock + ?Sized> ManualHomingTarget<'a, C> {
    /// Pair `stepper` with `clock`.
    pub fn new(stepper: &'a mut ManualStepper, clock: &'a mut C) -> Self {
        Self { stepper, clock }
    }
}

impl<C: MotionClock + ?Sized> HomingTarget for ManualHomingTarget<'_, C> {
    fn get_position(&self) -> Vec<f64> {
        self.stepper.get_position().to_vec()
    }

    fn set_position(&mut self, newpos: &[f64]) -> Result<()> {
        let pos = *newpos
            .first()
            .ok_or(MotionError::CoordinateTooShort { len: 0, index: 0 })?;
        self.stepper.do_set_position(pos)
    }

    fn flush_step_generation(&mut self) {
        self.stepper.sync_print_time(&mut *self.clock);
    }

    fn get_last_move_time(&mut self) -> f64 {
        self.stepper.sync_print_time(&mut *self.clock);
        self.stepper.next_cmd_time()
    }

    fn dwell(&mut self, delay: f64) {
        self.stepper.dwell(delay);
    }

    fn drip_move(&mut self, newpos: &[f64], speed: f64) -> Result<()> {
        let target = *newpos
            .first()
            .ok_or(MotionError::CoordinateTooShort { len: 0, index: 0 })?;
        let accel = self.stepper.homing_accel();
        self.stepper.do_move(&mut *self.clock, target, speed, accel, true)
    }

    fn get_steppers(&self) -> Vec<StepperRef> {
        self.stepper.get_steppers()
    }

    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]> {
        self.stepper.calc_position(positions)
    }

    fn stepper_positions(&self) -> StepperPositions {
        self.stepper.stepper_positions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandError, Error};
    use crate::manual::AxisState;
    use crate::rail::{Rail, StepLog, Stepper};

    #[derive(Debug, Default)]
    struct Clock {
        last_move_time: f64,
    }

    impl MotionClock for Clock {
        fn get_last_move_time(&mut self) -> f64 {
            self.last_move_time
        }

        fn dwell(&mut self, delay: f64) {
            self.last_move_time += delay;
        }

        fn note_mcu_movequeue_activity(&mut self, _time: f64) {}
    }

    /// Drives the target to the requested position, then declares the
    /// endstop position zero.
    #[derive(Debug, Default)]
    struct Coordinator {
        endstop_names: Vec<heapless::String<32>>,
        steppers: Vec<StepperRef>,
        start: Vec<f64>,
    }

    impl HomingCoordinator for Coordinator {
        fn manual_home(
            &mut self,
            target: &mut dyn HomingTarget,
            endstops: &[Endstop],
            pos: [f64; 4],
            speed: f64,
            _triggered: bool,
            _check_trigger: bool,
        ) -> Result<()> {
            self.endstop_names = endstops.iter().map(|e| e.name().try_into().unwrap()).collect();
            self.steppers = target.get_steppers();
            self.start = target.get_position();
            target.flush_step_generation();
            target.drip_move(&pos, speed)?;
            target.dwell(-1.0);
            target.set_position(&[0.0, 0.0, 0.0, 0.0])
        }
    }

    fn homeable() -> (ManualStepper, StepLog) {
        let log = StepLog::new();
        let mut rail = Rail::new("stepper_a");
        rail.add_endstop(Endstop::new("stepper_a", "PC1", "mcu")).unwrap();
        rail.add_stepper(Stepper::new("stepper_a", "mcu", 1.0).with_sink(log.clone()))
            .unwrap();
        (ManualStepper::new("a", rail, 5.0, 0.0), log)
    }

    #[test]
    fn test_homing_move_drives_target() {
        let (mut stepper, log) = homeable();
        let mut clock = Clock::default();
        let mut coordinator = Coordinator::default();

        stepper
            .homing_move(&mut coordinator, &mut clock, -3.0, Some(10.0), None, true, true)
            .unwrap();

        assert_eq!(coordinator.endstop_names, ["stepper_a"]);
        assert_eq!(coordinator.steppers.len(), 1);
        assert_eq!(coordinator.start, [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(log.net_steps(), -3);
        assert_eq!(stepper.get_position()[0], 0.0);
        assert_eq!(stepper.state(), AxisState::Idle);
        // 3mm at 10mm/s, synced with the toolhead
        assert!((stepper.next_cmd_time() - 0.3).abs() < 1e-12);
        assert!((clock.last_move_time - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_homing_rejects_bad_speed() {
        let (mut stepper, _) = homeable();
        let mut clock = Clock::default();
        let result = stepper.homing_move(
            &mut Coordinator::default(),
            &mut clock,
            -3.0,
            Some(-1.0),
            None,
            true,
            true,
        );
        assert!(matches!(
            result,
            Err(Error::Command(CommandError::InvalidSpeed(_)))
        ));
    }

    #[test]
    fn test_target_rejects_empty_coordinate() {
        let (mut stepper, _) = homeable();
        let mut clock = Clock::default();
        let mut target = ManualHomingTarget::new(&mut stepper, &mut clock);
        assert!(target.drip_move(&[], 5.0).is_err());
        assert!(target.set_position(&[]).is_err());
        target.dwell(0.5);
        assert!((target.get_last_move_time() - 0.5).abs() < 1e-12);
    }
}

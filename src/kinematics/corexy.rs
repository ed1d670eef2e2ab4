//! CoreXY: two belts jointly drive X and Y.

use alloc::vec::Vec;

use super::{rail_positions, Kinematics, StepperPositions};
use crate::config::{KinematicsConfig, KinematicsKind};
use crate::error::{ConfigError, Result};
use crate::motion::Axis;
use crate::rail::{AllocatorKind, Rail, Sign};

/// CoreXY topology. Rail A follows `x + y`, rail B follows `x - y`.
#[derive(Debug)]
pub struct CoreXY {
    rails: Vec<Rail>,
}

impl CoreXY {
    /// Wire three rails into a CoreXY topology.
    ///
    /// Each belt rail's endstop also stops the other belt's steppers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if the belts are on
    /// different controllers than the endstops.
    pub fn new(mut a: Rail, mut b: Rail, mut z: Rail) -> core::result::Result<Self, ConfigError> {
        a.add_stepper_to_endstops(&b.stepper_refs())?;
        b.add_stepper_to_endstops(&a.stepper_refs())?;
        a.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Plus));
        b.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Minus));
        z.setup_pulse_allocator(AllocatorKind::Cartesian(Axis::Z));
        Ok(Self {
            rails: alloc::vec![a, b, z],
        })
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid rail.
    pub fn from_config(config: &KinematicsConfig) -> core::result::Result<Self, ConfigError> {
        Self::new(
            Rail::from_config(&config.stepper_x)?,
            Rail::from_config(&config.stepper_y)?,
            Rail::from_config(&config.stepper_z)?,
        )
    }
}

impl Kinematics for CoreXY {
    fn kind(&self) -> KinematicsKind {
        KinematicsKind::CoreXY
    }

    fn rails(&self) -> &[Rail] {
        &self.rails
    }

    fn rails_mut(&mut self) -> &mut [Rail] {
        &mut self.rails
    }

    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]> {
        let [a, b, z] = rail_positions::<3>(&self.rails, positions)?;
        Ok([0.5 * (a + b), 0.5 * (a - b), z])
    }
}

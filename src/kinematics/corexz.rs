//! CoreXZ: two belts jointly drive X and Z.

use alloc::vec::Vec;

use super::{rail_positions, Kinematics, StepperPositions};
use crate::config::{KinematicsConfig, KinematicsKind};
use crate::error::{ConfigError, Result};
use crate::motion::Axis;
use crate::rail::{AllocatorKind, Rail, Sign};

/// CoreXZ topology. Rail A follows `x + z`, rail B follows `x - z`, and the
/// Y rail is independent.
#[derive(Debug)]
pub struct CoreXZ {
    rails: Vec<Rail>,
}

impl CoreXZ {
    /// Wire three rails into a CoreXZ topology.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if the belts are on
    /// different controllers than the endstops.
    pub fn new(mut a: Rail, mut y: Rail, mut b: Rail) -> core::result::Result<Self, ConfigError> {
        b.add_stepper_to_endstops(&a.stepper_refs())?;
        a.add_stepper_to_endstops(&b.stepper_refs())?;
        a.setup_pulse_allocator(AllocatorKind::CoreXZ(Sign::Plus));
        y.setup_pulse_allocator(AllocatorKind::Cartesian(Axis::Y));
        b.setup_pulse_allocator(AllocatorKind::CoreXZ(Sign::Minus));
        Ok(Self {
            rails: alloc::vec![a, y, b],
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

impl Kinematics for CoreXZ {
    fn kind(&self) -> KinematicsKind {
        KinematicsKind::CoreXZ
    }

    fn rails(&self) -> &[Rail] {
        &self.rails
    }

    fn rails_mut(&mut self) -> &mut [Rail] {
        &mut self.rails
    }

    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]> {
        let [a, y, b] = rail_positions::<3>(&self.rails, positions)?;
        Ok([0.5 * (a + b), y, 0.5 * (a - b)])
    }
}

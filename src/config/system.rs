//! System configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::kinematics::KinematicsConfig;
use super::manual_stepper::ManualStepperConfig;
use super::pivot::PivotCoordConfig;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    /// Toolhead kinematics.
    #[serde(default)]
    pub kinematics: Option<KinematicsConfig>,

    /// Pivot coordinate transform chain.
    #[serde(default)]
    pub pivot_coord: Option<PivotCoordConfig>,

    /// Named manual stepper axes.
    #[serde(default)]
    pub manual_steppers: FnvIndexMap<String<32>, ManualStepperConfig, 8>,
}

impl SystemConfig {
    /// Get a manual stepper configuration by name.
    pub fn manual_stepper(&self, name: &str) -> Option<&ManualStepperConfig> {
        self.manual_steppers
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all manual stepper names.
    pub fn manual_stepper_names(&self) -> impl Iterator<Item = &str> {
        self.manual_steppers.keys().map(|s| s.as_str())
    }
}

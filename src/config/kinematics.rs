//! Kinematic topology configuration from TOML.

use serde::Deserialize;

use super::stepper::RailConfig;

/// Supported coupled topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KinematicsKind {
    /// Two belts jointly drive X and Y.
    #[serde(rename = "corexy")]
    CoreXY,
    /// Two belts jointly drive X and Z.
    #[serde(rename = "corexz")]
    CoreXZ,
    /// X rail coupled to Y, with an optional dual carriage (Markforged).
    #[serde(rename = "hybrid_corexy")]
    HybridCoreXY,
}

/// Toolhead kinematics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KinematicsConfig {
    /// Topology to build.
    pub kind: KinematicsKind,

    /// Rail wired to the toolhead X channel (belt A on CoreXY/CoreXZ).
    pub stepper_x: RailConfig,

    /// Rail wired to the toolhead Y channel (belt B on CoreXY).
    pub stepper_y: RailConfig,

    /// Rail wired to the toolhead Z channel (belt B on CoreXZ).
    pub stepper_z: RailConfig,

    /// Second X carriage (hybrid CoreXY only).
    #[serde(default)]
    pub dual_carriage: Option<RailConfig>,
}

impl KinematicsConfig {
    /// Iterate over every configured rail.
    pub fn rails(&self) -> impl Iterator<Item = &RailConfig> {
        [&self.stepper_x, &self.stepper_y, &self.stepper_z]
            .into_iter()
            .chain(self.dual_carriage.as_ref())
    }
}

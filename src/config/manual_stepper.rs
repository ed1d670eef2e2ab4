//! Manual stepper configuration from TOML.

use serde::Deserialize;

use super::stepper::{EndstopConfig, StepperConfig};
use super::units::{MmPerSec, MmPerSecSquared};

/// An independently clocked auxiliary axis.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualStepperConfig {
    /// The single stepper driven by this axis.
    pub stepper: StepperConfig,

    /// Default move velocity (must be > 0).
    #[serde(default = "default_velocity")]
    pub velocity: MmPerSec,

    /// Default move acceleration; 0 means moves cruise for their whole duration.
    #[serde(default)]
    pub accel: MmPerSecSquared,

    /// Optional endstop; without it the axis cannot home.
    #[serde(default)]
    pub endstop: Option<EndstopConfig>,
}

fn default_velocity() -> MmPerSec {
    MmPerSec(5.0)
}

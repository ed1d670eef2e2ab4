//! Configuration module for kinematic-transform.
//!
//! Provides types for loading and validating kinematics, pivot transform and
//! manual stepper configurations from TOML files (with `std` feature) or
//! pre-parsed data.

mod kinematics;
mod manual_stepper;
mod pivot;
mod stepper;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use kinematics::{KinematicsConfig, KinematicsKind};
pub use manual_stepper::ManualStepperConfig;
pub use pivot::{PivotCoordConfig, PivotStageConfig, StageValue, MAX_STAGES};
pub use stepper::{EndstopConfig, RailConfig, StepperConfig};
pub use system::SystemConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Degrees, Microsteps, Millimeters, MmPerSec, MmPerSecSquared, Steps};

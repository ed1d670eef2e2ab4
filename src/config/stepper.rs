//! Stepper, endstop and rail configuration from TOML.

use alloc::vec::Vec;

use heapless::String;
use serde::Deserialize;

use super::units::{Microsteps, Millimeters};

/// A single actuator (stepper driver) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StepperConfig {
    /// Stepper name (max 32 chars), e.g. `stepper_x`.
    pub name: String<32>,

    /// Controller (MCU) that drives this stepper.
    #[serde(default = "default_controller")]
    pub controller: String<32>,

    /// STEP pin identifier.
    pub step_pin: String<32>,

    /// DIR pin identifier.
    pub dir_pin: String<32>,

    /// Optional ENABLE pin identifier.
    #[serde(default)]
    pub enable_pin: Option<String<32>>,

    /// Distance traveled per full rotation of the motor shaft.
    pub rotation_distance: Millimeters,

    /// Full steps per motor rotation (typically 200 for 1.8° motors).
    #[serde(default = "default_full_steps")]
    pub full_steps_per_rotation: u16,

    /// Microstep setting (1, 2, 4, 8, 16, 32, etc.).
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Gear ratio (motor rotations per output rotation).
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,

    /// Invert direction pin logic.
    #[serde(default)]
    pub invert_direction: bool,
}

fn default_controller() -> String<32> {
    crate::error::name("mcu")
}

fn default_full_steps() -> u16 {
    200
}

fn default_gear_ratio() -> f64 {
    1.0
}

impl StepperConfig {
    /// Distance moved by a single microstep.
    pub fn step_distance(&self) -> f64 {
        self.rotation_distance.0
            / (self.full_steps_per_rotation as f64
                * self.microsteps.value() as f64
                * self.gear_ratio)
    }
}

/// Endstop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndstopConfig {
    /// Endstop pin identifier.
    pub pin: String<32>,

    /// Controller (MCU) that samples the endstop.
    #[serde(default = "default_controller")]
    pub controller: String<32>,
}

/// A rail: one or more coupled steppers plus an optional endstop.
#[derive(Debug, Clone, Deserialize)]
pub struct RailConfig {
    /// Steppers on this rail. The first stepper names the rail.
    pub steppers: Vec<StepperConfig>,

    /// Endstop homing this rail.
    #[serde(default)]
    pub endstop: Option<EndstopConfig>,
}

impl RailConfig {
    /// Name of the rail (its first stepper), or empty when misconfigured.
    pub fn name(&self) -> &str {
        self.steppers.first().map(|s| s.name.as_str()).unwrap_or("")
    }
}

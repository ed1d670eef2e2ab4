//! Endstops and the steppers they home.

use alloc::vec::Vec;

use heapless::String;

use super::stepper::Stepper;
use crate::error::{name, ConfigError};

/// Lightweight reference to a stepper, resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepperRef {
    /// Stepper name.
    pub name: String<32>,
    /// Controller driving the stepper.
    pub controller: String<32>,
}

impl From<&Stepper> for StepperRef {
    fn from(stepper: &Stepper) -> Self {
        Self {
            name: name(stepper.name()),
            controller: name(stepper.controller()),
        }
    }
}

/// An endstop and every stepper whose motion it must stop.
///
/// On coupled topologies steppers of other rails are registered too, so a
/// combined-axis home halts both physical actuators on one trigger timeline.
#[derive(Debug, Clone)]
pub struct Endstop {
    name: String<32>,
    pin: String<32>,
    controller: String<32>,
    steppers: Vec<StepperRef>,
}

impl Endstop {
    /// Create an endstop with no steppers.
    pub fn new(endstop_name: &str, pin: &str, controller: &str) -> Self {
        Self {
            name: name(endstop_name),
            pin: name(pin),
            controller: name(controller),
            steppers: Vec::new(),
        }
    }

    /// Endstop name (the rail it belongs to).
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Endstop pin.
    #[inline]
    pub fn pin(&self) -> &str {
        self.pin.as_str()
    }

    /// Controller sampling the endstop.
    #[inline]
    pub fn controller(&self) -> &str {
        self.controller.as_str()
    }

    /// Register a stepper to be stopped by this endstop.
    ///
    /// Registering the same stepper twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if the stepper is driven by
    /// a different controller than the one sampling the endstop.
    pub fn add_stepper(&mut self, stepper: StepperRef) -> Result<(), ConfigError> {
        if stepper.controller != self.controller {
            return Err(ConfigError::ControllerMismatch {
                endstop: self.name.clone(),
                endstop_controller: self.controller.clone(),
                stepper: stepper.name,
                stepper_controller: stepper.controller,
            });
        }
        if !self.has_stepper(stepper.name.as_str()) {
            self.steppers.push(stepper);
        }
        Ok(())
    }

    /// Steppers stopped by this endstop.
    #[inline]
    pub fn get_steppers(&self) -> &[StepperRef] {
        &self.steppers
    }

    /// Check if a stepper is registered.
    pub fn has_stepper(&self, stepper_name: &str) -> bool {
        self.steppers.iter().any(|s| s.name.as_str() == stepper_name)
    }
}

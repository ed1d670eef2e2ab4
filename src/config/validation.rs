//! Configuration validation.

use alloc::format;
use alloc::vec::Vec;

use crate::error::{name, ConfigError, Error, Result};

use super::kinematics::KinematicsKind;
use super::stepper::{RailConfig, StepperConfig};
use super::SystemConfig;

/// Validate a system configuration.
///
/// Checks:
/// - Stepper mechanics are positive and stepper names are unique
/// - Kinematic rails have endstops and single-stepper rails stay single
/// - Pivot stages parse, each control names a configured manual stepper,
///   and resolution/full rotation are positive
/// - Manual stepper velocity is > 0 and accel is >= 0
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    let mut names: Vec<&str> = Vec::new();

    if let Some(ref kin) = config.kinematics {
        for rail in kin.rails() {
            validate_rail(rail)?;
            if rail.endstop.is_none() {
                return Err(Error::Config(ConfigError::MissingEndstop(name(rail.name()))));
            }
            for stepper in &rail.steppers {
                push_unique(&mut names, stepper.name.as_str())?;
            }
        }
        if kin.kind == KinematicsKind::HybridCoreXY {
            single_stepper(&kin.stepper_x)?;
            if let Some(ref dc) = kin.dual_carriage {
                single_stepper(dc)?;
            }
        } else if let Some(ref dc) = kin.dual_carriage {
            return Err(Error::Config(ConfigError::UnknownOption(name(dc.name()))));
        }
    }

    if let Some(ref pivot) = config.pivot_coord {
        if pivot.resolution.0 <= 0.0 {
            return Err(invalid("resolution", pivot.resolution.0, "must be > 0"));
        }
        if pivot.axis_full_rotation.0 <= 0.0 {
            return Err(invalid(
                "axis_full_rotation",
                pivot.axis_full_rotation.0,
                "must be > 0",
            ));
        }
        for (i, stage) in pivot.stages()?.iter().enumerate() {
            let configured = stage
                .control
                .strip_prefix("manual_stepper ")
                .is_some_and(|key| config.manual_stepper(key).is_some());
            if !configured {
                return Err(Error::Config(ConfigError::InvalidChoice {
                    option: name(&format!("control_{i}")),
                    value: name(&stage.control),
                }));
            }
        }
    }

    for (_, manual) in config.manual_steppers.iter() {
        validate_stepper(&manual.stepper)?;
        push_unique(&mut names, manual.stepper.name.as_str())?;
        if manual.velocity.0 <= 0.0 {
            return Err(invalid("velocity", manual.velocity.0, "must be > 0"));
        }
        if manual.accel.0 < 0.0 {
            return Err(invalid("accel", manual.accel.0, "must be >= 0"));
        }
    }

    Ok(())
}

pub(crate) fn validate_rail(rail: &RailConfig) -> Result<()> {
    if rail.steppers.is_empty() {
        return Err(Error::Config(ConfigError::EmptyRail(name(rail.name()))));
    }
    for stepper in &rail.steppers {
        validate_stepper(stepper)?;
    }
    Ok(())
}

pub(crate) fn validate_stepper(config: &StepperConfig) -> Result<()> {
    if config.rotation_distance.0 <= 0.0 {
        return Err(invalid(
            "rotation_distance",
            config.rotation_distance.0,
            "must be > 0",
        ));
    }
    if config.full_steps_per_rotation == 0 {
        return Err(invalid("full_steps_per_rotation", 0.0, "must be > 0"));
    }
    if config.gear_ratio <= 0.0 {
        return Err(invalid("gear_ratio", config.gear_ratio, "must be > 0"));
    }
    Ok(())
}

fn single_stepper(rail: &RailConfig) -> Result<()> {
    if rail.steppers.len() != 1 {
        return Err(Error::Config(ConfigError::TooManySteppers(name(rail.name()))));
    }
    Ok(())
}

fn push_unique<'a>(names: &mut Vec<&'a str>, stepper: &'a str) -> Result<()> {
    if names.contains(&stepper) {
        return Err(Error::Config(ConfigError::DuplicateStepperName(name(stepper))));
    }
    names.push(stepper);
    Ok(())
}

fn invalid(option: &str, value: f64, reason: &'static str) -> Error {
    Error::Config(ConfigError::InvalidValue {
        option: name(option),
        value,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{Microsteps, Millimeters};

    fn make_stepper(rotation_distance: f64) -> StepperConfig {
        StepperConfig {
            name: heapless::String::try_from("stepper_a").unwrap(),
            controller: heapless::String::try_from("mcu").unwrap(),
            step_pin: heapless::String::try_from("PB0").unwrap(),
            dir_pin: heapless::String::try_from("PB1").unwrap(),
            enable_pin: None,
            rotation_distance: Millimeters(rotation_distance),
            full_steps_per_rotation: 200,
            microsteps: Microsteps::SIXTEENTH,
            gear_ratio: 1.0,
            invert_direction: false,
        }
    }

    #[test]
    fn test_invalid_rotation_distance() {
        let result = validate_stepper(&make_stepper(-1.0));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_empty_rail() {
        let rail = RailConfig {
            steppers: Vec::new(),
            endstop: None,
        };
        assert!(matches!(
            validate_rail(&rail),
            Err(Error::Config(ConfigError::EmptyRail(_)))
        ));
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate_config(&SystemConfig::default()).is_ok());
    }
}

//! Unit tests for configuration validation.

use kinematic_transform::config::{parse_config, validate_config, SystemConfig};
use kinematic_transform::error::{ConfigError, Error};

fn stepper(name: &str, extra: &str) -> String {
    format!(
        r#"name = "{name}"
step_pin = "P0"
dir_pin = "P1"
rotation_distance = 40.0
{extra}"#
    )
}

fn corexy(x_extra: &str, dual: bool) -> String {
    let mut toml = String::from("[kinematics]\nkind = \"corexy\"\n");
    for (section, name, extra) in [
        ("stepper_x", "stepper_x", x_extra),
        ("stepper_y", "stepper_y", ""),
        ("stepper_z", "stepper_z", ""),
    ] {
        toml += &format!(
            "[kinematics.{section}]\nendstop = {{ pin = \"E0\" }}\n[[kinematics.{section}.steppers]]\n{}\n",
            stepper(name, extra)
        );
    }
    if dual {
        toml += &format!(
            "[kinematics.dual_carriage]\nendstop = {{ pin = \"E1\" }}\n[[kinematics.dual_carriage.steppers]]\n{}\n",
            stepper("dual_carriage", "")
        );
    }
    toml
}

/// Test that a well-formed CoreXY passes.
#[test]
fn test_valid_corexy() {
    assert!(parse_config(&corexy("", false)).is_ok());
}

/// Test that a non-positive rotation distance is rejected.
#[test]
fn test_zero_rotation_distance() {
    let toml = corexy("", false).replacen("rotation_distance = 40.0", "rotation_distance = 0.0", 1);
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
}

/// Test that a negative gear ratio is rejected.
#[test]
fn test_negative_gear_ratio() {
    assert!(matches!(
        parse_config(&corexy("gear_ratio = -1.0", false)),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
}

/// Test that duplicate stepper names are rejected.
#[test]
fn test_duplicate_stepper_names() {
    let toml = corexy("", false).replace("name = \"stepper_z\"", "name = \"stepper_x\"");
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::DuplicateStepperName(_)))
    ));
}

/// Test that a coupled rail without endstop is rejected.
#[test]
fn test_rail_without_endstop() {
    let toml = corexy("", false).replacen("endstop = { pin = \"E0\" }\n", "", 1);
    assert!(matches!(
        parse_config(&toml),
        Err(Error::Config(ConfigError::MissingEndstop(_)))
    ));
}

/// Test that a dual carriage is only accepted on hybrid CoreXY.
#[test]
fn test_dual_carriage_requires_hybrid() {
    assert!(matches!(
        parse_config(&corexy("", true)),
        Err(Error::Config(ConfigError::UnknownOption(_)))
    ));
    let hybrid = corexy("", true).replace("\"corexy\"", "\"hybrid_corexy\"");
    assert!(parse_config(&hybrid).is_ok());
}

/// Test manual stepper velocity and acceleration bounds.
#[test]
fn test_manual_stepper_bounds() {
    let base = format!(
        "[manual_steppers.a]\nvelocity = 0.0\n[manual_steppers.a.stepper]\n{}\n",
        stepper("a", "")
    );
    assert!(matches!(
        parse_config(&base),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));

    let negative_accel = base.replace("velocity = 0.0", "accel = -1.0");
    assert!(matches!(
        parse_config(&negative_accel),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
}

/// Test pivot resolution and stage checks.
#[test]
fn test_pivot_validation() {
    assert!(matches!(
        parse_config("[pivot_coord]\nresolution = 0.0\n"),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
    assert!(matches!(
        parse_config("[pivot_coord]\ncontrol_0 = \"manual_stepper a\"\n"),
        Err(Error::Config(ConfigError::MissingOption(_)))
    ));
    assert!(matches!(
        parse_config("[pivot_coord]\nspeed = 3.0\n"),
        Err(Error::Config(ConfigError::UnknownOption(_)))
    ));
}

/// Test that every pivot stage control names a configured manual stepper.
#[test]
fn test_pivot_control_must_exist() {
    let pivot = "[pivot_coord]\ncontrol_0 = \"manual_stepper c\"\nrotate_axis_0 = \"z\"\n";
    let manual = format!("[manual_steppers.c.stepper]\n{}\n", stepper("stepper_c", ""));

    assert!(matches!(
        parse_config(pivot),
        Err(Error::Config(ConfigError::InvalidChoice { .. }))
    ));
    assert!(parse_config(&format!("{pivot}{manual}")).is_ok());

    let wrong_kind = format!("{}{manual}", pivot.replace("manual_stepper c", "stepper_c"));
    assert!(matches!(
        parse_config(&wrong_kind),
        Err(Error::Config(ConfigError::InvalidChoice { .. }))
    ));
}

/// Test that an empty configuration is valid.
#[test]
fn test_empty_config() {
    assert!(validate_config(&SystemConfig::default()).is_ok());
}

//! Unit tests for TOML configuration parsing.

use kinematic_transform::config::{load_config, parse_config, KinematicsKind, SystemConfig};
use kinematic_transform::error::{ConfigError, Error};
use kinematic_transform::motion::Axis;

const HYBRID: &str = r#"
[kinematics]
kind = "hybrid_corexy"

[kinematics.stepper_x]
endstop = { pin = "PA5" }

[[kinematics.stepper_x.steppers]]
name = "stepper_x"
step_pin = "PA0"
dir_pin = "PA1"
rotation_distance = 40.0
microsteps = 16

[kinematics.stepper_y]
endstop = { pin = "PB5" }

[[kinematics.stepper_y.steppers]]
name = "stepper_y"
step_pin = "PB0"
dir_pin = "PB1"
rotation_distance = 40.0

[[kinematics.stepper_y.steppers]]
name = "stepper_y1"
step_pin = "PB2"
dir_pin = "PB3"
rotation_distance = 40.0
invert_direction = true

[kinematics.stepper_z]
endstop = { pin = "PC5", controller = "mcu" }

[[kinematics.stepper_z.steppers]]
name = "stepper_z"
step_pin = "PC0"
dir_pin = "PC1"
rotation_distance = 8.0
gear_ratio = 2.0

[kinematics.dual_carriage]
endstop = { pin = "PD5" }

[[kinematics.dual_carriage.steppers]]
name = "dual_carriage"
step_pin = "PD0"
dir_pin = "PD1"
rotation_distance = 40.0
"#;

/// Test parsing a hybrid CoreXY machine with a dual carriage.
#[test]
fn test_parse_hybrid_kinematics() {
    let config: SystemConfig = parse_config(HYBRID).expect("Failed to parse TOML");
    let kin = config.kinematics.as_ref().expect("Kinematics not found");

    assert_eq!(kin.kind, KinematicsKind::HybridCoreXY);
    assert_eq!(kin.rails().count(), 4);
    assert_eq!(kin.stepper_y.steppers.len(), 2);
    assert!(kin.stepper_y.steppers[1].invert_direction);
    assert_eq!(kin.stepper_x.steppers[0].controller.as_str(), "mcu");
    assert_eq!(kin.stepper_x.steppers[0].microsteps.value(), 16);
    // 8mm / (200 * 16 * 2)
    assert!((kin.stepper_z.steppers[0].step_distance() - 0.00125).abs() < 1e-12);
    assert_eq!(kin.dual_carriage.as_ref().unwrap().name(), "dual_carriage");
}

/// Test parsing manual steppers with defaults and an endstop.
#[test]
fn test_parse_manual_steppers() {
    let toml_str = r#"
[manual_steppers.lift]
accel = 50.0
endstop = { pin = "PG1" }

[manual_steppers.lift.stepper]
name = "lift"
step_pin = "PG2"
dir_pin = "PG3"
rotation_distance = 8.0

[manual_steppers.table]
velocity = 90.0

[manual_steppers.table.stepper]
name = "table"
step_pin = "PH2"
dir_pin = "PH3"
rotation_distance = 360.0
"#;

    let config = parse_config(toml_str).unwrap();
    let names: Vec<&str> = config.manual_stepper_names().collect();
    assert_eq!(names, ["lift", "table"]);

    let lift = config.manual_stepper("lift").unwrap();
    assert_eq!(lift.velocity.0, 5.0);
    assert_eq!(lift.accel.0, 50.0);
    assert_eq!(lift.endstop.as_ref().unwrap().pin.as_str(), "PG1");

    let table = config.manual_stepper("table").unwrap();
    assert_eq!(table.accel.0, 0.0);
    assert!(table.endstop.is_none());
    assert!(config.manual_stepper("missing").is_none());
}

/// Test parsing several pivot stages with offsets.
#[test]
fn test_parse_pivot_stages() {
    let toml_str = r#"
[pivot_coord]
axis_full_rotation = 400.0
control_0 = "manual_stepper a"
rotate_axis_0 = "x"
offset_y_0 = 10
offset_z_0 = -2.5
control_1 = "manual_stepper c"
rotate_axis_1 = "z"

[manual_steppers.a.stepper]
name = "stepper_a"
step_pin = "PE0"
dir_pin = "PE1"
rotation_distance = 360.0

[manual_steppers.c.stepper]
name = "stepper_c"
step_pin = "PF0"
dir_pin = "PF1"
rotation_distance = 360.0
"#;

    let config = parse_config(toml_str).unwrap();
    let pivot = config.pivot_coord.unwrap();
    assert_eq!(pivot.resolution.0, 0.1);
    assert_eq!(pivot.axis_full_rotation.0, 400.0);

    let stages = pivot.stages().unwrap();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].control, "manual_stepper a");
    assert_eq!(stages[0].rotate_axis, Axis::X);
    assert_eq!(stages[0].offset, [0.0, 10.0, -2.5]);
    assert_eq!(stages[1].rotate_axis, Axis::Z);
    assert_eq!(stages[1].offset, [0.0; 3]);
}

/// Test that an unknown topology is rejected.
#[test]
fn test_unknown_kinematics_kind() {
    let toml_str = HYBRID.replace("hybrid_corexy", "delta");
    assert!(matches!(
        parse_config(&toml_str),
        Err(Error::Config(ConfigError::ParseError(_)))
    ));
}

/// Test that an invalid microstep value is rejected.
#[test]
fn test_invalid_microsteps() {
    let toml_str = HYBRID.replace("microsteps = 16", "microsteps = 12");
    assert!(parse_config(&toml_str).is_err());
}

/// Test loading configuration from a file.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!(
        "kinematic-transform-{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, HYBRID).unwrap();
    let config = load_config(&path);
    std::fs::remove_file(&path).unwrap();

    assert!(config.unwrap().kinematics.is_some());
}

/// Test that a missing file is reported as an I/O error.
#[test]
fn test_load_missing_file() {
    assert!(matches!(
        load_config("/nonexistent/printer.toml"),
        Err(Error::Config(ConfigError::IoError(_)))
    ));
}

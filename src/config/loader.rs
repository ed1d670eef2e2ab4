//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{name, ConfigError, Error, Result};

use super::SystemConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use kinematic_transform::load_config;
///
/// let config = load_config("printer.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SystemConfig> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::Config(ConfigError::IoError(name(&e.to_string()))))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(name(e.message()))))?;

    super::validation::validate_config(&config)?;

    tracing::debug!(
        manual_steppers = config.manual_steppers.len(),
        pivot = config.pivot_coord.is_some(),
        "configuration parsed"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_stepper() {
        let toml = r#"
[manual_steppers.a_axis]
velocity = 20.0
accel = 100.0

[manual_steppers.a_axis.stepper]
name = "a_axis"
step_pin = "PC0"
dir_pin = "PC1"
rotation_distance = 360.0
"#;

        let config = parse_config(toml).unwrap();
        let manual = config.manual_stepper("a_axis").unwrap();
        assert!((manual.velocity.0 - 20.0).abs() < 1e-12);
        assert!(manual.endstop.is_none());
    }

    #[test]
    fn test_parse_pivot_coord() {
        let toml = r#"
[pivot_coord]
resolution = 0.05
control_0 = "manual_stepper a_axis"
rotate_axis_0 = "x"
offset_z_0 = 12.5

[manual_steppers.a_axis.stepper]
name = "a_axis"
step_pin = "PC0"
dir_pin = "PC1"
rotation_distance = 360.0
"#;

        let config = parse_config(toml).unwrap();
        let stages = config.pivot_coord.unwrap().stages().unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].offset, [0.0, 0.0, 12.5]);
    }

    #[test]
    fn test_parse_rejects_bad_rotate_axis() {
        let toml = r#"
[pivot_coord]
control_0 = "manual_stepper a_axis"
rotate_axis_0 = "q"
"#;

        assert!(matches!(
            parse_config(toml),
            Err(Error::Config(ConfigError::InvalidChoice { .. }))
        ));
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(matches!(
            parse_config("[pivot_coord"),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }
}

//! Pivot coordinate transform configuration from TOML.
//!
//! Stages are given as flat numbered options, matching the printer config
//! section layout:
//!
//! ```toml
//! [pivot_coord]
//! resolution = 0.1
//! control_0 = "manual_stepper a_axis"
//! rotate_axis_0 = "x"
//! offset_y_0 = 10.0
//! ```

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::Deserialize;

use super::units::{Degrees, Millimeters};
use crate::error::{name, ConfigError};
use crate::motion::Axis;

/// Maximum number of numbered pivot stages.
pub const MAX_STAGES: usize = 99;

/// Raw option value for a numbered stage key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    /// Numeric option (offsets).
    Number(f64),
    /// Text option (control object, rotate axis).
    Text(String),
}

/// Pivot transform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PivotCoordConfig {
    /// Maximum arc length of a rotational sub-segment.
    #[serde(default = "default_resolution")]
    pub resolution: Millimeters,

    /// Rotary axis travel that corresponds to one full turn.
    #[serde(default = "default_full_rotation")]
    pub axis_full_rotation: Degrees,

    /// Numbered stage options (`control_N`, `rotate_axis_N`, `offset_*_N`).
    #[serde(flatten)]
    pub stage_options: BTreeMap<String, StageValue>,
}

fn default_resolution() -> Millimeters {
    Millimeters(0.1)
}

fn default_full_rotation() -> Degrees {
    Degrees(360.0)
}

/// One parsed rotation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotStageConfig {
    /// Name of the extra axis object driving this rotation.
    pub control: String,
    /// Axis the rotation happens around.
    pub rotate_axis: Axis,
    /// Pivot point.
    pub offset: [f64; 3],
}

impl Default for PivotCoordConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            axis_full_rotation: default_full_rotation(),
            stage_options: BTreeMap::new(),
        }
    }
}

impl PivotCoordConfig {
    /// Parse the numbered stage options into ordered stages.
    ///
    /// Stages are read from index 0 and end at the first missing `control_N`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown options, a missing or invalid
    /// `rotate_axis_N`, or values of the wrong type.
    pub fn stages(&self) -> Result<Vec<PivotStageConfig>, ConfigError> {
        let mut stages = Vec::new();
        let mut consumed = 0usize;

        for i in 0..MAX_STAGES {
            let control_key = format!("control_{i}");
            let control = match self.stage_options.get(&control_key) {
                None => break,
                Some(StageValue::Text(t)) => t.clone(),
                Some(StageValue::Number(v)) => {
                    return Err(ConfigError::InvalidValue {
                        option: name(&control_key),
                        value: *v,
                        reason: "expected an object name",
                    })
                }
            };
            consumed += 1;

            let axis_key = format!("rotate_axis_{i}");
            let rotate_axis = match self.stage_options.get(&axis_key) {
                None => return Err(ConfigError::MissingOption(name(&axis_key))),
                Some(StageValue::Text(t)) => Axis::from_name(t).ok_or_else(|| {
                    ConfigError::InvalidChoice {
                        option: name(&axis_key),
                        value: name(t),
                    }
                })?,
                Some(StageValue::Number(v)) => {
                    return Err(ConfigError::InvalidValue {
                        option: name(&axis_key),
                        value: *v,
                        reason: "expected one of x, y, z",
                    })
                }
            };
            consumed += 1;

            let mut offset = [0.0; 3];
            for (slot, axis) in offset.iter_mut().zip(["x", "y", "z"]) {
                let key = format!("offset_{axis}_{i}");
                match self.stage_options.get(&key) {
                    None => {}
                    Some(StageValue::Number(v)) => {
                        *slot = *v;
                        consumed += 1;
                    }
                    Some(StageValue::Text(t)) => {
                        return Err(ConfigError::InvalidChoice {
                            option: name(&key),
                            value: name(t),
                        })
                    }
                }
            }

            stages.push(PivotStageConfig {
                control,
                rotate_axis,
                offset,
            });
        }

        if consumed != self.stage_options.len() {
            // Something left over: a stray key, or a stage after a gap.
            for key in self.stage_options.keys() {
                if !self.is_consumed(key, stages.len()) {
                    if key.starts_with("control_") && stages.len() == MAX_STAGES {
                        return Err(ConfigError::TooManyStages(MAX_STAGES));
                    }
                    return Err(ConfigError::UnknownOption(name(key)));
                }
            }
        }

        Ok(stages)
    }

    fn is_consumed(&self, key: &str, stage_count: usize) -> bool {
        let Some((prefix, index)) = key.rsplit_once('_') else {
            return false;
        };
        let Ok(index) = index.parse::<usize>() else {
            return false;
        };
        index < stage_count
            && matches!(
                prefix,
                "control" | "rotate_axis" | "offset_x" | "offset_y" | "offset_z"
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> StageValue {
        StageValue::Text(String::from(s))
    }

    #[test]
    fn test_defaults() {
        let config = PivotCoordConfig::default();
        assert!((config.resolution.0 - 0.1).abs() < 1e-12);
        assert!((config.axis_full_rotation.0 - 360.0).abs() < 1e-12);
        assert!(config.stages().unwrap().is_empty());
    }

    #[test]
    fn test_stages_in_order() {
        let mut config = PivotCoordConfig::default();
        config.stage_options.insert("control_0".into(), text("manual_stepper a"));
        config.stage_options.insert("rotate_axis_0".into(), text("x"));
        config.stage_options.insert("offset_y_0".into(), StageValue::Number(5.0));
        config.stage_options.insert("control_1".into(), text("manual_stepper c"));
        config.stage_options.insert("rotate_axis_1".into(), text("z"));

        let stages = config.stages().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].rotate_axis, Axis::X);
        assert_eq!(stages[0].offset, [0.0, 5.0, 0.0]);
        assert_eq!(stages[1].control, "manual_stepper c");
        assert_eq!(stages[1].rotate_axis, Axis::Z);
    }

    #[test]
    fn test_invalid_rotate_axis() {
        let mut config = PivotCoordConfig::default();
        config.stage_options.insert("control_0".into(), text("manual_stepper a"));
        config.stage_options.insert("rotate_axis_0".into(), text("w"));
        assert!(matches!(
            config.stages(),
            Err(ConfigError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_missing_rotate_axis() {
        let mut config = PivotCoordConfig::default();
        config.stage_options.insert("control_0".into(), text("manual_stepper a"));
        assert!(matches!(config.stages(), Err(ConfigError::MissingOption(_))));
    }

    #[test]
    fn test_stage_after_gap_is_rejected() {
        let mut config = PivotCoordConfig::default();
        config.stage_options.insert("control_1".into(), text("manual_stepper a"));
        config.stage_options.insert("rotate_axis_1".into(), text("y"));
        assert!(matches!(config.stages(), Err(ConfigError::UnknownOption(_))));
    }
}

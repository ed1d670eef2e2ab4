//! Hybrid CoreXY (Markforged): the X rail rides on the Y gantry.

use alloc::vec::Vec;

use super::dual_carriage::{Carriage, DualCarriages};
use super::{rail_positions, Kinematics, StepperPositions};
use crate::config::{KinematicsConfig, KinematicsKind};
use crate::error::{ConfigError, Result};
use crate::motion::Axis;
use crate::rail::{AllocatorKind, Rail, Sign};

/// Hybrid CoreXY topology with an optional second X carriage.
///
/// The X rail follows `x - y` and the second carriage follows `x + y`. Both
/// carriages are stopped by the Y endstop.
#[derive(Debug)]
pub struct HybridCoreXY {
    rails: Vec<Rail>,
    dual: Option<DualCarriages>,
}

impl HybridCoreXY {
    /// Wire the rails into a hybrid CoreXY topology.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TooManySteppers` if a carriage rail has more
    /// than one stepper, or `ConfigError::ControllerMismatch` if a carriage
    /// is on a different controller than the Y endstop.
    pub fn new(
        mut x: Rail,
        mut y: Rail,
        mut z: Rail,
        dual_carriage: Option<Rail>,
    ) -> core::result::Result<Self, ConfigError> {
        if x.get_steppers().len() != 1 {
            return Err(ConfigError::TooManySteppers(crate::error::name(x.name())));
        }
        y.add_stepper_to_endstops(&x.stepper_refs())?;
        x.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Minus));
        y.setup_pulse_allocator(AllocatorKind::Cartesian(Axis::Y));
        z.setup_pulse_allocator(AllocatorKind::Cartesian(Axis::Z));

        let mut dual = None;
        let mut rails = alloc::vec![x, y, z];
        if let Some(mut dc) = dual_carriage {
            if dc.get_steppers().len() != 1 {
                return Err(ConfigError::TooManySteppers(crate::error::name(dc.name())));
            }
            rails[1].add_stepper_to_endstops(&dc.stepper_refs())?;
            dc.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Plus));
            dual = Some(DualCarriages::new(rails[0].name(), dc.name()));
            rails.push(dc);
        }

        Ok(Self { rails, dual })
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid rail.
    pub fn from_config(config: &KinematicsConfig) -> core::result::Result<Self, ConfigError> {
        let dual_carriage = config
            .dual_carriage
            .as_ref()
            .map(Rail::from_config)
            .transpose()?;
        Self::new(
            Rail::from_config(&config.stepper_x)?,
            Rail::from_config(&config.stepper_y)?,
            Rail::from_config(&config.stepper_z)?,
            dual_carriage,
        )
    }

    /// Mutable dual carriage control, for the component switching carriages.
    pub fn dual_carriages_mut(&mut self) -> Option<&mut DualCarriages> {
        self.dual.as_mut()
    }
}

impl Kinematics for HybridCoreXY {
    fn kind(&self) -> KinematicsKind {
        KinematicsKind::HybridCoreXY
    }

    fn rails(&self) -> &[Rail] {
        &self.rails
    }

    fn rails_mut(&mut self) -> &mut [Rail] {
        &mut self.rails
    }

    fn dual_carriages(&self) -> Option<&DualCarriages> {
        self.dual.as_ref()
    }

    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]> {
        let second_active = self
            .dual
            .as_ref()
            .is_some_and(|dc| dc.active_carriage() == Carriage::Second);
        if second_active {
            let [_, y, z, carriage] = rail_positions::<4>(&self.rails, positions)?;
            Ok([carriage - y, y, z])
        } else {
            let [x, y, z] = rail_positions::<3>(&self.rails, positions)?;
            Ok([x + y, y, z])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::name;
    use crate::rail::{Endstop, Stepper};

    fn rail(rail_name: &str) -> Rail {
        let mut rail = Rail::new(rail_name);
        rail.add_endstop(Endstop::new(rail_name, "PC0", "mcu")).unwrap();
        rail.add_stepper(Stepper::new(rail_name, "mcu", 0.0125)).unwrap();
        rail
    }

    fn hybrid() -> HybridCoreXY {
        HybridCoreXY::new(
            rail("stepper_x"),
            rail("stepper_y"),
            rail("stepper_z"),
            Some(rail("dual_carriage")),
        )
        .unwrap()
    }

    fn positions() -> StepperPositions {
        let mut positions = StepperPositions::new();
        positions.insert(name("stepper_x"), 5.0).unwrap();
        positions.insert(name("stepper_y"), 2.0).unwrap();
        positions.insert(name("stepper_z"), 1.0).unwrap();
        positions.insert(name("dual_carriage"), 9.0).unwrap();
        positions
    }

    #[test]
    fn test_carriage_handoff_agrees() {
        let mut kin = hybrid();
        let first = kin.calc_position(&positions()).unwrap();

        if let Some(dc) = kin.dual_carriages_mut() {
            dc.set_active(Carriage::Second);
        }
        let second = kin.calc_position(&positions()).unwrap();

        assert_eq!(first, [7.0, 2.0, 1.0]);
        assert_eq!(second, [7.0, 2.0, 1.0]);
    }

    #[test]
    fn test_y_endstop_stops_both_carriages() {
        let kin = hybrid();
        let (rails, dual) = kin.get_rails();
        assert_eq!(rails.len(), 4);
        assert!(dual.is_some());
        let y_endstop = &rails[1].get_endstops()[0];
        assert!(y_endstop.has_stepper("stepper_x"));
        assert!(y_endstop.has_stepper("dual_carriage"));
    }

    #[test]
    fn test_without_dual_carriage() {
        let kin = HybridCoreXY::new(rail("stepper_x"), rail("stepper_y"), rail("stepper_z"), None)
            .unwrap();
        assert!(kin.dual_carriages().is_none());

        let mut positions = StepperPositions::new();
        positions.insert(name("stepper_x"), 5.0).unwrap();
        positions.insert(name("stepper_y"), 2.0).unwrap();
        positions.insert(name("stepper_z"), 0.0).unwrap();
        assert_eq!(kin.calc_position(&positions).unwrap(), [7.0, 2.0, 0.0]);
    }

    #[test]
    fn test_set_position_drives_both_carriages() {
        let mut kin = hybrid();
        kin.set_position(&[7.0, 2.0, 1.0]).unwrap();
        let rails = kin.rails();
        assert_eq!(rails[0].get_commanded_position(), 5.0);
        assert_eq!(rails[3].get_commanded_position(), 9.0);
    }
}

//! Kinematic topologies.
//!
//! Each topology owns its rails, wires their pulse allocators and shared
//! endstops, and maps rail positions back to toolhead coordinates.

mod corexy;
mod corexz;
mod dual_carriage;
mod hybrid_corexy;

pub use corexy::CoreXY;
pub use corexz::CoreXZ;
pub use dual_carriage::{Carriage, DualCarriages};
pub use hybrid_corexy::HybridCoreXY;

use alloc::boxed::Box;
use core::fmt;

use heapless::{FnvIndexMap, String};
use tracing::info;

use crate::config::{KinematicsConfig, KinematicsKind};
use crate::error::{name, MotionError, Result};
use crate::motion::SharedQueue;
use crate::rail::Rail;

/// Rail positions keyed by rail name.
pub type StepperPositions = FnvIndexMap<String<32>, f64, 16>;

/// A toolhead topology: rails plus the map from rail to toolhead position.
pub trait Kinematics: fmt::Debug {
    /// Topology kind.
    fn kind(&self) -> KinematicsKind;

    /// Every rail in order (x, y, z, then any second carriage).
    fn rails(&self) -> &[Rail];

    /// Mutable access to every rail.
    fn rails_mut(&mut self) -> &mut [Rail];

    /// Dual carriage control, if the topology has one.
    fn dual_carriages(&self) -> Option<&DualCarriages> {
        None
    }

    /// Ordered rails and the optional dual carriage control.
    fn get_rails(&self) -> (&[Rail], Option<&DualCarriages>) {
        (self.rails(), self.dual_carriages())
    }

    /// Toolhead coordinate for the given rail positions.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::MissingRailPosition` if a rail is absent.
    fn calc_position(&self, positions: &StepperPositions) -> Result<[f64; 3]>;

    /// Bind every rail to the toolhead queue.
    fn set_trapq(&mut self, queue: &SharedQueue) {
        for rail in self.rails_mut() {
            rail.set_trapq(queue.clone());
        }
    }

    /// Generate steps on every rail up to `upto`.
    ///
    /// # Errors
    ///
    /// Propagates the first rail failure.
    fn generate_steps(&mut self, upto: f64) -> Result<()> {
        for rail in self.rails_mut() {
            rail.generate_steps(upto)?;
        }
        Ok(())
    }

    /// Set every rail from a toolhead coordinate without stepping.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::CoordinateTooShort` for a short coordinate.
    fn set_position(&mut self, coord: &[f64]) -> Result<()> {
        for rail in self.rails_mut() {
            rail.set_position(coord)?;
        }
        Ok(())
    }

    /// Commanded position of every rail.
    fn stepper_positions(&self) -> StepperPositions {
        let mut positions = StepperPositions::new();
        for rail in self.rails() {
            // A topology has at most four rails
            let _ = positions.insert(name(rail.name()), rail.get_commanded_position());
        }
        positions
    }
}

/// Look up the positions of `rails` in order.
pub(crate) fn rail_positions<const N: usize>(
    rails: &[Rail],
    positions: &StepperPositions,
) -> Result<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, rail) in out.iter_mut().zip(rails) {
        let key: String<32> = name(rail.name());
        *slot = *positions
            .get(&key)
            .ok_or_else(|| MotionError::MissingRailPosition(key.clone()))?;
    }
    Ok(out)
}

/// Build the configured topology.
///
/// # Errors
///
/// Returns a `ConfigError` for an invalid rail or a controller mismatch on a
/// coupled endstop.
pub fn from_config(config: &KinematicsConfig) -> Result<Box<dyn Kinematics>> {
    let kinematics: Box<dyn Kinematics> = match config.kind {
        KinematicsKind::CoreXY => Box::new(CoreXY::from_config(config)?),
        KinematicsKind::CoreXZ => Box::new(CoreXZ::from_config(config)?),
        KinematicsKind::HybridCoreXY => Box::new(HybridCoreXY::from_config(config)?),
    };
    info!(
        kind = ?config.kind,
        rails = kinematics.rails().len(),
        "kinematics built"
    );
    Ok(kinematics)
}

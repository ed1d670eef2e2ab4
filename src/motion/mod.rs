//! Motion module for kinematic-transform.
//!
//! Provides the trapezoidal move segment, the symmetric trapezoid planner
//! and the per-channel move segment queue.

mod profile;
mod queue;
mod segment;

pub use profile::{Direction, MotionPhase, TrapezoidProfile};
pub use queue::{Samples, SharedQueue, TrapQueue, TIME_EPSILON};
pub use segment::Move;

use serde::Deserialize;

/// Cartesian toolhead axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// X axis (coordinate index 0).
    X,
    /// Y axis (coordinate index 1).
    Y,
    /// Z axis (coordinate index 2).
    Z,
}

impl Axis {
    /// All axes in coordinate order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Parse a lowercase axis name (`x`, `y` or `z`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// Coordinate index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lowercase axis name.
    pub const fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

//! Motion profile calculation.
//!
//! Provides the symmetric trapezoidal planner used for standalone moves:
//! equal acceleration and deceleration phases around an optional cruise.

use libm::sqrt;

/// Direction of motion along a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Increasing position.
    Positive,
    /// Decreasing position.
    Negative,
}

impl Direction {
    /// Get direction from a signed distance. Zero counts as positive.
    #[inline]
    pub fn from_distance(distance: f64) -> Self {
        if distance >= 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

/// Phase of a trapezoidal segment at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// Ramping from the start velocity toward cruise velocity.
    Accelerating,
    /// Moving at constant cruise velocity.
    Cruising,
    /// Mirrored ramp away from cruise velocity.
    Decelerating,
    /// Segment complete.
    Complete,
}

/// Symmetric trapezoidal profile for a move starting and ending at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidProfile {
    /// Direction of the move.
    pub direction: Direction,

    /// Duration of the acceleration phase (equal to the deceleration phase).
    pub accel_t: f64,

    /// Duration of the cruise phase.
    pub cruise_t: f64,

    /// Cruise speed (unsigned).
    pub cruise_v: f64,
}

impl TrapezoidProfile {
    /// Plan a move of `distance` at up to `speed` with acceleration `accel`.
    ///
    /// With `accel == 0` or a zero distance the move cruises for its whole
    /// duration. When the distance is too short to reach `speed` the cruise
    /// speed drops to `sqrt(distance * accel)` and the cruise phase vanishes.
    ///
    /// `speed` must be strictly positive.
    pub fn symmetric(distance: f64, speed: f64, accel: f64) -> Self {
        let direction = Direction::from_distance(distance);
        let dist = distance.abs();

        if accel == 0.0 || dist == 0.0 {
            return Self {
                direction,
                accel_t: 0.0,
                cruise_t: dist / speed,
                cruise_v: speed,
            };
        }

        let mut cruise_v = speed;
        let max_cruise_v2 = dist * accel;
        if max_cruise_v2 < speed * speed {
            cruise_v = sqrt(max_cruise_v2);
        }
        let accel_t = cruise_v / accel;
        // Ramp distance on each side is 0.5 * cruise_v * accel_t
        let cruise_t = ((dist - accel_t * cruise_v) / cruise_v).max(0.0);

        Self {
            direction,
            accel_t,
            cruise_t,
            cruise_v,
        }
    }

    /// Total move duration.
    #[inline]
    pub fn duration(&self) -> f64 {
        2.0 * self.accel_t + self.cruise_t
    }

    /// Distance covered (unsigned).
    pub fn distance(&self) -> f64 {
        self.cruise_v * (self.accel_t + self.cruise_t)
    }
}

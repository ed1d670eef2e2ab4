//! Trapezoidal move segment.

use super::profile::MotionPhase;
use crate::error::QueueError;

/// Relative tolerance used when checking that the cruise velocity follows
/// from the start velocity and acceleration.
const VELOCITY_TOLERANCE: f64 = 1e-6;

/// Immutable one-dimensional trapezoidal segment on a single channel.
///
/// Velocities and acceleration are signed along the channel. The position
/// ramps from `start_v` at `accel` for `accel_t`, holds `cruise_v` for
/// `cruise_t`, then ramps back with `-accel` for `decel_t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    /// Absolute machine time at which the segment starts.
    pub start_time: f64,
    /// Channel position at `start_time`.
    pub start_pos: f64,
    /// Acceleration phase duration.
    pub accel_t: f64,
    /// Cruise phase duration.
    pub cruise_t: f64,
    /// Deceleration phase duration.
    pub decel_t: f64,
    /// Velocity at `start_time`.
    pub start_v: f64,
    /// Velocity during the cruise phase.
    pub cruise_v: f64,
    /// Acceleration applied during the ramp-up phase.
    pub accel: f64,
}

impl Move {
    /// Create a segment. Use [`Move::validate`] before relying on it.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        start_time: f64,
        start_pos: f64,
        accel_t: f64,
        cruise_t: f64,
        decel_t: f64,
        start_v: f64,
        cruise_v: f64,
        accel: f64,
    ) -> Self {
        Self {
            start_time,
            start_pos,
            accel_t,
            cruise_t,
            decel_t,
            start_v,
            cruise_v,
            accel,
        }
    }

    /// Segment that holds `pos` for `duration` seconds.
    pub const fn hold(start_time: f64, pos: f64, duration: f64) -> Self {
        Self::new(start_time, pos, 0.0, duration, 0.0, 0.0, 0.0, 0.0)
    }

    /// Check the segment's internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a `QueueError` for non-finite fields, negative phase
    /// durations, or a cruise velocity that the ramp cannot reach.
    pub fn validate(&self) -> Result<(), QueueError> {
        let fields = [
            ("start_time", self.start_time),
            ("start_pos", self.start_pos),
            ("accel_t", self.accel_t),
            ("cruise_t", self.cruise_t),
            ("decel_t", self.decel_t),
            ("start_v", self.start_v),
            ("cruise_v", self.cruise_v),
            ("accel", self.accel),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(QueueError::NonFinite(field));
            }
        }

        for (phase, value) in [
            ("accel", self.accel_t),
            ("cruise", self.cruise_t),
            ("decel", self.decel_t),
        ] {
            if value < 0.0 {
                return Err(QueueError::NegativeDuration { phase, value });
            }
        }

        // A zero-length ramp is an instantaneous velocity change
        if self.accel_t > 0.0 {
            let reached = self.start_v + self.accel * self.accel_t;
            let scale = self.cruise_v.abs().max(self.start_v.abs()).max(1.0);
            if (reached - self.cruise_v).abs() > VELOCITY_TOLERANCE * scale {
                return Err(QueueError::UnreachableCruise {
                    start_v: self.start_v,
                    cruise_v: self.cruise_v,
                    accel: self.accel,
                    accel_t: self.accel_t,
                });
            }
        }

        Ok(())
    }

    /// Total segment duration.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.accel_t + self.cruise_t + self.decel_t
    }

    /// Absolute time at which the segment ends.
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Velocity at the end of the segment.
    #[inline]
    pub fn end_velocity(&self) -> f64 {
        self.cruise_v - self.accel * self.decel_t
    }

    /// Channel position at the end of the segment.
    pub fn end_position(&self) -> f64 {
        self.position_at(self.end_time())
    }

    /// Absolute times at which the phases change, including start and end.
    pub fn phase_boundaries(&self) -> [f64; 4] {
        let cruise_start = self.start_time + self.accel_t;
        let decel_start = cruise_start + self.cruise_t;
        [self.start_time, cruise_start, decel_start, self.end_time()]
    }

    /// Phase at absolute time `t`. Times before the start are reported as
    /// the first phase.
    pub fn phase_at(&self, t: f64) -> MotionPhase {
        let rel = t - self.start_time;
        if rel >= self.duration() {
            MotionPhase::Complete
        } else if rel < self.accel_t {
            MotionPhase::Accelerating
        } else if rel < self.accel_t + self.cruise_t {
            MotionPhase::Cruising
        } else {
            MotionPhase::Decelerating
        }
    }

    /// Channel position at absolute time `t`, clamped to the segment.
    pub fn position_at(&self, t: f64) -> f64 {
        let mut rel = (t - self.start_time).clamp(0.0, self.duration());
        let mut pos = self.start_pos;

        let accel_rel = rel.min(self.accel_t);
        pos += (self.start_v + 0.5 * self.accel * accel_rel) * accel_rel;
        rel -= accel_rel;

        let cruise_rel = rel.min(self.cruise_t);
        pos += self.cruise_v * cruise_rel;
        rel -= cruise_rel;

        pos += (self.cruise_v - 0.5 * self.accel * rel) * rel;
        pos
    }

    /// Channel velocity at absolute time `t`, clamped to the segment.
    pub fn velocity_at(&self, t: f64) -> f64 {
        let rel = (t - self.start_time).clamp(0.0, self.duration());
        if rel < self.accel_t {
            self.start_v + self.accel * rel
        } else if rel < self.accel_t + self.cruise_t {
            self.cruise_v
        } else {
            self.cruise_v - self.accel * (rel - self.accel_t - self.cruise_t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trapezoid() -> Move {
        Move::new(0.0, 0.0, 1.0, 2.0, 1.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_trapezoid_displacement() {
        let m = trapezoid();
        // 5 + 20 + 5
        assert!((m.end_position() - 30.0).abs() < 1e-12);
        assert!((m.end_time() - 4.0).abs() < 1e-12);
        assert!(m.end_velocity().abs() < 1e-12);
    }

    #[test]
    fn test_phase_boundaries_are_continuous() {
        let m = trapezoid();
        let eps = 1e-9;
        for t in [1.0, 3.0] {
            let before = m.position_at(t - eps);
            let after = m.position_at(t + eps);
            assert!((before - after).abs() < 1e-6);
        }
        assert!((m.position_at(1.0) - 5.0).abs() < 1e-12);
        assert!((m.position_at(3.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_phase_at() {
        let m = trapezoid();
        assert_eq!(m.phase_at(0.5), MotionPhase::Accelerating);
        assert_eq!(m.phase_at(2.0), MotionPhase::Cruising);
        assert_eq!(m.phase_at(3.5), MotionPhase::Decelerating);
        assert_eq!(m.phase_at(4.0), MotionPhase::Complete);
    }

    #[test]
    fn test_position_clamped_outside_segment() {
        let m = trapezoid();
        assert_eq!(m.position_at(-1.0), 0.0);
        assert!((m.position_at(10.0) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_direction() {
        let m = Move::new(2.0, 30.0, 1.0, 2.0, 1.0, 0.0, -10.0, -10.0);
        assert!(m.validate().is_ok());
        assert!(m.end_position().abs() < 1e-12);
        assert!((m.velocity_at(3.0) + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_negative_duration() {
        let m = Move::new(0.0, 0.0, 1.0, -2.0, 1.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            m.validate(),
            Err(QueueError::NegativeDuration { phase: "cruise", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unreachable_cruise() {
        let m = Move::new(0.0, 0.0, 1.0, 2.0, 1.0, 0.0, 12.0, 10.0);
        assert!(matches!(
            m.validate(),
            Err(QueueError::UnreachableCruise { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let m = Move::new(0.0, f64::NAN, 1.0, 2.0, 1.0, 0.0, 10.0, 10.0);
        assert!(matches!(m.validate(), Err(QueueError::NonFinite("start_pos"))));
    }

    #[test]
    fn test_instant_velocity_change_is_allowed() {
        // Pure cruise from rest, as planned with unbounded acceleration
        let m = Move::new(0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 5.0, 0.0);
        assert!(m.validate().is_ok());
        assert!((m.end_position() - 20.0).abs() < 1e-12);
    }
}

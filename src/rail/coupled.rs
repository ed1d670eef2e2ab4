//! Rails: coupled steppers sharing one derived position.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use heapless::String;
use tracing::{debug, trace};

use super::allocator::{AllocatorKind, PulseAllocator};
use super::endstop::{Endstop, StepperRef};
use super::stepper::Stepper;
use crate::config::RailConfig;
use crate::error::{name, ConfigError, Error, MotionError, Result};
use crate::motion::{Direction, TrapQueue, SharedQueue, TIME_EPSILON};

/// Bisection iterations when locating a step time.
const STEP_SEARCH_ITERATIONS: usize = 64;

/// Anything that turns queued motion into steps up to a time.
pub trait StepGenerator: core::fmt::Debug {
    /// Generate every step due up to `upto`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator is not bound to a queue or reads a
    /// channel the queue lacks.
    fn generate_steps(&mut self, upto: f64) -> Result<()>;
}

/// Step generator shared with the toolhead's step generation loop.
pub type SharedStepGenerator = Rc<RefCell<dyn StepGenerator>>;

/// Rail shared between its owner and the toolhead's step generation loop.
pub type SharedRail = Rc<RefCell<Rail>>;

/// One or more physically coupled steppers with their endstops.
#[derive(Debug)]
pub struct Rail {
    name: String<32>,
    steppers: Vec<Stepper>,
    endstops: Vec<Endstop>,
    allocator: PulseAllocator,
    trapq: Option<SharedQueue>,
    commanded_pos: f64,
    last_flush_time: f64,
}

impl Rail {
    /// Create an empty rail with a cartesian X allocator.
    pub fn new(rail_name: &str) -> Self {
        Self {
            name: name(rail_name),
            steppers: Vec::new(),
            endstops: Vec::new(),
            allocator: PulseAllocator::default(),
            trapq: None,
            commanded_pos: 0.0,
            last_flush_time: 0.0,
        }
    }

    /// Build a rail from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyRail` without steppers, or
    /// `ConfigError::ControllerMismatch` if the endstop and a stepper sit on
    /// different controllers.
    pub fn from_config(config: &RailConfig) -> core::result::Result<Self, ConfigError> {
        if config.steppers.is_empty() {
            return Err(ConfigError::EmptyRail(name(config.name())));
        }
        let mut rail = Self::new(config.name());
        if let Some(ref endstop) = config.endstop {
            rail.add_endstop(Endstop::new(
                config.name(),
                endstop.pin.as_str(),
                endstop.controller.as_str(),
            ))?;
        }
        for stepper in &config.steppers {
            rail.add_stepper(Stepper::from_config(stepper))?;
        }
        Ok(rail)
    }

    /// Rail name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Add a stepper and register it with every endstop of the rail.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if an endstop sits on a
    /// different controller. The rail is unchanged on error.
    pub fn add_stepper(&mut self, stepper: Stepper) -> core::result::Result<(), ConfigError> {
        let stepper_ref = StepperRef::from(&stepper);
        let mut endstops = self.endstops.clone();
        for endstop in &mut endstops {
            endstop.add_stepper(stepper_ref.clone())?;
        }
        self.endstops = endstops;
        self.steppers.push(stepper);
        Ok(())
    }

    /// Add an endstop and register every stepper of the rail with it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if a stepper sits on a
    /// different controller.
    pub fn add_endstop(&mut self, mut endstop: Endstop) -> core::result::Result<(), ConfigError> {
        for stepper in &self.steppers {
            endstop.add_stepper(StepperRef::from(stepper))?;
        }
        self.endstops.push(endstop);
        Ok(())
    }

    /// Register steppers of another rail with this rail's endstops.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ControllerMismatch` if any stepper sits on a
    /// different controller than an endstop. The rail is unchanged on error.
    pub fn add_stepper_to_endstops(
        &mut self,
        steppers: &[StepperRef],
    ) -> core::result::Result<(), ConfigError> {
        let mut endstops = self.endstops.clone();
        for endstop in &mut endstops {
            for stepper in steppers {
                endstop.add_stepper(stepper.clone())?;
            }
        }
        self.endstops = endstops;
        Ok(())
    }

    /// Steppers on this rail.
    #[inline]
    pub fn get_steppers(&self) -> &[Stepper] {
        &self.steppers
    }

    /// Mutable access to the steppers (to attach sinks).
    #[inline]
    pub fn steppers_mut(&mut self) -> &mut [Stepper] {
        &mut self.steppers
    }

    /// References to the steppers on this rail.
    pub fn stepper_refs(&self) -> Vec<StepperRef> {
        self.steppers.iter().map(StepperRef::from).collect()
    }

    /// Endstops homing this rail.
    #[inline]
    pub fn get_endstops(&self) -> &[Endstop] {
        &self.endstops
    }

    /// Bind the queue this rail reads segments from.
    pub fn set_trapq(&mut self, queue: SharedQueue) {
        self.trapq = Some(queue);
    }

    /// Bound queue, if any.
    #[inline]
    pub fn trapq(&self) -> Option<&SharedQueue> {
        self.trapq.as_ref()
    }

    /// Select how queue channels map onto this rail.
    pub fn setup_pulse_allocator(&mut self, kind: AllocatorKind) {
        self.allocator = PulseAllocator::new(kind);
    }

    /// Current allocator.
    #[inline]
    pub fn allocator(&self) -> &PulseAllocator {
        &self.allocator
    }

    /// Cached commanded position.
    #[inline]
    pub fn get_commanded_position(&self) -> f64 {
        self.commanded_pos
    }

    /// Time up to which steps have been generated.
    #[inline]
    pub fn last_flush_time(&self) -> f64 {
        self.last_flush_time
    }

    /// Set the rail position from a toolhead coordinate without stepping.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::CoordinateTooShort` if the coordinate lacks a
    /// channel read by the allocator.
    pub fn set_position(&mut self, coord: &[f64]) -> Result<()> {
        let pos = self.allocator.calc_position(coord).ok_or(MotionError::CoordinateTooShort {
            len: coord.len(),
            index: self.allocator.max_channel(),
        })?;
        for stepper in &mut self.steppers {
            stepper.set_position(pos);
        }
        self.commanded_pos = pos;
        Ok(())
    }

    /// Generate every step due up to `upto`.
    ///
    /// Repeated or non-advancing calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::UnboundQueue` if no queue is bound, or
    /// `MotionError::ChannelOutOfRange` if the allocator reads a channel the
    /// queue lacks.
    pub fn generate_steps(&mut self, upto: f64) -> Result<()> {
        let queue = self
            .trapq
            .clone()
            .ok_or_else(|| Error::Motion(MotionError::UnboundQueue(self.name.clone())))?;
        if upto <= self.last_flush_time {
            return Ok(());
        }
        let queue = queue.borrow();
        for channel in self.allocator.channels() {
            if channel >= queue.channel_count() {
                return Err(Error::Motion(MotionError::ChannelOutOfRange {
                    rail: self.name.clone(),
                    channel,
                }));
            }
        }

        let from = self.last_flush_time;
        let Some(start_pos) = self.allocator.position_at(&queue, from)? else {
            // Nothing was ever queued on this rail's channels
            self.last_flush_time = upto;
            return Ok(());
        };

        let (times, covered) = breakpoints(&self.allocator, &queue, from, upto)?;
        let allocator = &self.allocator;
        let position = |t: f64| -> Result<f64> {
            Ok(allocator.position_at(&queue, t)?.unwrap_or(start_pos))
        };
        let position_before = |t: f64| -> Result<f64> {
            Ok(allocator.position_before(&queue, t)?.unwrap_or(start_pos))
        };

        // Windows are evaluated between one-sided limits, so a jump between
        // segments (a position reset) never produces steps.
        let mut count = 0usize;
        let mut pos_end = start_pos;
        for window in times.windows(2) {
            let (a, b) = (window[0], window[1]);
            let pos_a = position(a)?;
            let pos_b = position_before(b)?;
            let pos_m = position(0.5 * (a + b))?;
            match turning_point(a, b, pos_a, pos_m, pos_b) {
                Some(t) => {
                    let pos_t = position(t)?;
                    count += step_monotone(&mut self.steppers, &position, a, t, pos_a, pos_t)?;
                    count += step_monotone(&mut self.steppers, &position, t, b, pos_t, pos_b)?;
                }
                None => {
                    count += step_monotone(&mut self.steppers, &position, a, b, pos_a, pos_b)?;
                }
            }
            pos_end = pos_b;
        }

        // A window with no queued motion only holds the last segment's end,
        // which a later set_position supersedes.
        if covered {
            for stepper in &mut self.steppers {
                stepper.note_commanded(pos_end);
            }
            self.commanded_pos = pos_end;
        }
        self.last_flush_time = upto;
        debug!(rail = self.name.as_str(), upto, steps = count, "steps generated");
        Ok(())
    }
}

impl StepGenerator for Rail {
    fn generate_steps(&mut self, upto: f64) -> Result<()> {
        Rail::generate_steps(self, upto)
    }
}

/// Sorted phase boundaries of every segment touching `(from, upto)`, plus
/// both ends of the range, and whether any segment touched it.
fn breakpoints(
    allocator: &PulseAllocator,
    queue: &TrapQueue,
    from: f64,
    upto: f64,
) -> Result<(Vec<f64>, bool)> {
    let mut times = vec![from, upto];
    let mut covered = false;
    for channel in allocator.channels() {
        for segment in queue.segments(channel)? {
            if segment.end_time() <= from || segment.start_time >= upto {
                continue;
            }
            covered = true;
            times.extend(
                segment
                    .phase_boundaries()
                    .into_iter()
                    .filter(|t| *t > from && *t < upto),
            );
        }
    }
    times.sort_by(f64::total_cmp);
    times.dedup_by(|a, b| (*a - *b).abs() < TIME_EPSILON);
    Ok((times, covered))
}

/// Time inside `(a, b)` where the quadratic through the three samples turns
/// around, if any.
fn turning_point(a: f64, b: f64, pos_a: f64, pos_m: f64, pos_b: f64) -> Option<f64> {
    let h = b - a;
    let c2 = 2.0 * (pos_a + pos_b - 2.0 * pos_m) / (h * h);
    if c2 == 0.0 || !c2.is_finite() {
        return None;
    }
    let c1 = (pos_b - pos_a) / h - c2 * h;
    let s = -c1 / (2.0 * c2);
    (s > TIME_EPSILON && s < h - TIME_EPSILON).then_some(a + s)
}

/// Emit steps for every half-step boundary crossed while the rail moves
/// monotonically from `pos_lo` at `lo` to `pos_hi` at `hi`.
fn step_monotone(
    steppers: &mut [Stepper],
    position: &impl Fn(f64) -> Result<f64>,
    lo: f64,
    hi: f64,
    pos_lo: f64,
    pos_hi: f64,
) -> Result<usize> {
    let direction = if pos_hi > pos_lo {
        Direction::Positive
    } else if pos_hi < pos_lo {
        Direction::Negative
    } else {
        return Ok(0);
    };

    let mut count = 0;
    for stepper in steppers.iter_mut() {
        if stepper.step_distance() <= 0.0 {
            continue;
        }
        loop {
            let target = stepper.next_step_position(direction);
            let reached = match direction {
                Direction::Positive => target <= pos_hi,
                Direction::Negative => target >= pos_hi,
            };
            if !reached {
                break;
            }
            let time = find_crossing(position, lo, hi, target, direction)?;
            trace!(stepper = stepper.name(), time, "step");
            stepper.step(time, direction);
            count += 1;
        }
    }
    Ok(count)
}

/// Earliest time in `[lo, hi]` at which a monotone position reaches `target`.
fn find_crossing(
    position: &impl Fn(f64) -> Result<f64>,
    mut lo: f64,
    mut hi: f64,
    target: f64,
    direction: Direction,
) -> Result<f64> {
    for _ in 0..STEP_SEARCH_ITERATIONS {
        if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
            break;
        }
        let mid = 0.5 * (lo + hi);
        let pos = position(mid)?;
        let before = match direction {
            Direction::Positive => pos < target,
            Direction::Negative => pos > target,
        };
        if before {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{Axis, Move};
    use crate::rail::{Sign, StepLog};

    fn rail_with_log(step_distance: f64) -> (Rail, StepLog) {
        let log = StepLog::new();
        let mut rail = Rail::new("stepper_a");
        rail.add_stepper(Stepper::new("stepper_a", "mcu", step_distance).with_sink(log.clone()))
            .unwrap();
        (rail, log)
    }

    #[test]
    fn test_generate_steps_unbound_queue() {
        let (mut rail, _) = rail_with_log(0.1);
        assert!(matches!(
            rail.generate_steps(1.0),
            Err(Error::Motion(MotionError::UnboundQueue(_)))
        ));
    }

    #[test]
    fn test_generate_steps_trapezoid() {
        let (mut rail, log) = rail_with_log(0.5);
        let queue = TrapQueue::shared(1);
        queue
            .borrow_mut()
            .append(0, Move::new(0.0, 0.0, 1.0, 2.0, 1.0, 0.0, 10.0, 10.0))
            .unwrap();
        rail.set_trapq(queue);

        rail.generate_steps(5.0).unwrap();
        // 30mm at 0.5mm per step
        assert_eq!(log.len(), 60);
        assert!((rail.get_commanded_position() - 30.0).abs() < 1e-9);

        let events = log.events();
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
        // First step at the 0.25mm boundary: 5t^2 = 0.25
        assert!((events[0].time - libm::sqrt(0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_generate_steps_is_idempotent() {
        let (mut rail, log) = rail_with_log(0.5);
        let queue = TrapQueue::shared(1);
        queue
            .borrow_mut()
            .append(0, Move::new(0.0, 0.0, 1.0, 2.0, 1.0, 0.0, 10.0, 10.0))
            .unwrap();
        rail.set_trapq(queue);

        rail.generate_steps(2.0).unwrap();
        let partial = log.len();
        rail.generate_steps(2.0).unwrap();
        rail.generate_steps(1.0).unwrap();
        assert_eq!(log.len(), partial);

        rail.generate_steps(4.0).unwrap();
        assert_eq!(log.len(), 60);
    }

    #[test]
    fn test_generate_steps_reversal() {
        let (mut rail, log) = rail_with_log(1.0);
        let queue = TrapQueue::shared(1);
        // Start moving at +10mm/s and decelerate through zero: out 5mm and back
        queue
            .borrow_mut()
            .append(0, Move::new(0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 10.0, 10.0))
            .unwrap();
        rail.set_trapq(queue);

        rail.generate_steps(2.0).unwrap();
        assert_eq!(log.len(), 10);
        assert_eq!(log.net_steps(), 0);
    }

    #[test]
    fn test_corexy_rail_sums_channels() {
        let (mut rail, log) = rail_with_log(1.0);
        rail.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Minus));
        let queue = TrapQueue::shared(3);
        {
            let mut q = queue.borrow_mut();
            q.append(0, Move::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 0.0)).unwrap();
            q.append(1, Move::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 4.0, 0.0)).unwrap();
        }
        rail.set_trapq(queue);

        rail.generate_steps(1.0).unwrap();
        assert_eq!(log.net_steps(), 6);
        assert!((rail.get_commanded_position() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_channel_out_of_range() {
        let (mut rail, _) = rail_with_log(1.0);
        rail.setup_pulse_allocator(AllocatorKind::Cartesian(Axis::Z));
        rail.set_trapq(TrapQueue::shared(1));
        assert!(matches!(
            rail.generate_steps(1.0),
            Err(Error::Motion(MotionError::ChannelOutOfRange { channel: 2, .. }))
        ));
    }

    #[test]
    fn test_set_position_through_allocator() {
        let (mut rail, log) = rail_with_log(1.0);
        rail.setup_pulse_allocator(AllocatorKind::CoreXY(Sign::Plus));
        rail.set_position(&[7.0, 3.0, 2.0]).unwrap();

        assert_eq!(rail.get_commanded_position(), 10.0);
        assert!(log.is_empty());
        assert!(rail.set_position(&[7.0]).is_err());
    }

    #[test]
    fn test_position_reset_does_not_step() {
        let (mut rail, log) = rail_with_log(1.0);
        let queue = TrapQueue::shared(1);
        queue
            .borrow_mut()
            .append(0, Move::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 0.0))
            .unwrap();
        rail.set_trapq(queue.clone());
        rail.generate_steps(1.0).unwrap();
        assert_eq!(log.net_steps(), 5);

        rail.set_position(&[100.0, 0.0, 0.0]).unwrap();
        queue
            .borrow_mut()
            .append(0, Move::new(2.0, 100.0, 0.0, 1.0, 0.0, 0.0, -3.0, 0.0))
            .unwrap();
        rail.generate_steps(3.0).unwrap();

        assert_eq!(log.len(), 8);
        assert_eq!(log.net_steps(), 2);
        assert!((rail.get_commanded_position() - 97.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_flush_keeps_reset_position() {
        let (mut rail, log) = rail_with_log(1.0);
        let queue = TrapQueue::shared(1);
        queue
            .borrow_mut()
            .append(0, Move::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 5.0, 0.0))
            .unwrap();
        rail.set_trapq(queue);
        rail.generate_steps(1.0).unwrap();
        assert!((rail.get_commanded_position() - 5.0).abs() < 1e-9);

        rail.set_position(&[100.0, 0.0, 0.0]).unwrap();
        rail.generate_steps(2.0).unwrap();

        assert_eq!(rail.get_commanded_position(), 100.0);
        assert_eq!(rail.get_steppers()[0].commanded_position(), 100.0);
        assert_eq!(log.net_steps(), 5);
        assert_eq!(rail.last_flush_time(), 2.0);
    }

    #[test]
    fn test_endstop_registers_steppers() {
        let mut rail = Rail::new("stepper_x");
        rail.add_endstop(Endstop::new("stepper_x", "PA5", "mcu")).unwrap();
        rail.add_stepper(Stepper::new("stepper_x", "mcu", 0.01)).unwrap();
        rail.add_stepper(Stepper::new("stepper_x1", "mcu", 0.01)).unwrap();
        assert_eq!(rail.get_endstops()[0].get_steppers().len(), 2);

        let err = rail.add_stepper(Stepper::new("stepper_x2", "other", 0.01));
        assert!(matches!(err, Err(ConfigError::ControllerMismatch { .. })));
        assert_eq!(rail.get_steppers().len(), 2);
    }
}

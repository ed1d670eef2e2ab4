//! Step event sinks.
//!
//! Step pulse compression and transmission live outside this crate; a rail
//! hands every step it generates to the sink attached to the stepper.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::config::units::Steps;
use crate::motion::Direction;

/// A single generated step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Absolute machine time of the step.
    pub time: f64,
    /// Logical direction of the step.
    pub direction: Direction,
    /// DIR pin level after applying the stepper's inversion.
    pub dir_pin: bool,
    /// Controller step position after this step.
    pub position: Steps,
}

/// Consumer of generated steps.
pub trait StepSink: fmt::Debug {
    /// Receive one step.
    fn step(&mut self, event: StepEvent);
}

/// Sink that discards every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StepSink for NullSink {
    fn step(&mut self, _event: StepEvent) {}
}

/// Sink that records steps into a shared log.
///
/// Clones share the same log, so a handle kept by the caller observes the
/// steps recorded by the clone attached to a stepper.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    events: Rc<RefCell<Vec<StepEvent>>>,
}

impl StepLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded step in order.
    pub fn events(&self) -> Vec<StepEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Check if no steps were recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Sum of recorded steps, counting negative steps as -1.
    pub fn net_steps(&self) -> i64 {
        self.events
            .borrow()
            .iter()
            .map(|e| match e.direction {
                Direction::Positive => 1,
                Direction::Negative => -1,
            })
            .sum()
    }

    /// Drop all recorded steps.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl StepSink for StepLog {
    fn step(&mut self, event: StepEvent) {
        self.events.borrow_mut().push(event);
    }
}

//! Rail module for kinematic-transform.
//!
//! Provides steppers, endstops, pulse allocators and the rails grouping
//! them, plus the step sinks that receive generated steps.

mod allocator;
mod coupled;
mod endstop;
mod sink;
mod stepper;

pub use allocator::{AllocatorKind, PulseAllocator, Sign};
pub use coupled::{Rail, SharedRail, SharedStepGenerator, StepGenerator};
pub use endstop::{Endstop, StepperRef};
pub use sink::{NullSink, StepEvent, StepLog, StepSink};
pub use stepper::Stepper;

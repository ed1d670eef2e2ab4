//! Actuator (stepper) position tracking.
//!
//! Each stepper keeps an integer controller position and an offset that maps
//! rail coordinates onto it. Steps happen where the rail position crosses a
//! half-step boundary.

use alloc::boxed::Box;

use heapless::String;

use super::sink::{NullSink, StepEvent, StepSink};
use crate::config::units::Steps;
use crate::config::StepperConfig;
use crate::error::name;
use crate::motion::Direction;

/// A single actuator on a rail.
#[derive(Debug)]
pub struct Stepper {
    name: String<32>,
    controller: String<32>,
    step_distance: f64,
    invert_direction: bool,
    /// Last rail position this stepper was driven to
    commanded_pos: f64,
    /// Controller step counter
    mcu_position: Steps,
    /// `mcu_position * step_distance - commanded_pos` after the last reset
    mcu_offset: f64,
    sink: Box<dyn StepSink>,
}

impl Stepper {
    /// Create a stepper at position zero that discards its steps.
    pub fn new(stepper_name: &str, controller: &str, step_distance: f64) -> Self {
        Self {
            name: name(stepper_name),
            controller: name(controller),
            step_distance,
            invert_direction: false,
            commanded_pos: 0.0,
            mcu_position: Steps::default(),
            mcu_offset: 0.0,
            sink: Box::new(NullSink),
        }
    }

    /// Create a stepper from its configuration.
    pub fn from_config(config: &StepperConfig) -> Self {
        let mut stepper = Self::new(
            config.name.as_str(),
            config.controller.as_str(),
            config.step_distance(),
        );
        stepper.invert_direction = config.invert_direction;
        stepper
    }

    /// Attach a step sink, replacing the current one.
    pub fn with_sink(mut self, sink: impl StepSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Attach a step sink, replacing the current one.
    pub fn set_sink(&mut self, sink: Box<dyn StepSink>) {
        self.sink = sink;
    }

    /// Stepper name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Controller driving this stepper.
    #[inline]
    pub fn controller(&self) -> &str {
        self.controller.as_str()
    }

    /// Distance of one step.
    #[inline]
    pub fn step_distance(&self) -> f64 {
        self.step_distance
    }

    /// Last commanded rail position.
    #[inline]
    pub fn commanded_position(&self) -> f64 {
        self.commanded_pos
    }

    /// Controller step counter.
    #[inline]
    pub fn mcu_position(&self) -> Steps {
        self.mcu_position
    }

    /// Rail position corresponding to a controller step count.
    pub fn position_from_steps(&self, steps: Steps) -> f64 {
        steps.to_distance(self.step_distance) - self.mcu_offset
    }

    /// Reset the commanded position without stepping.
    ///
    /// The controller step counter is kept; the offset absorbs the change.
    pub fn set_position(&mut self, pos: f64) {
        self.mcu_offset = self.mcu_position.to_distance(self.step_distance) - pos;
        self.commanded_pos = pos;
    }

    pub(crate) fn note_commanded(&mut self, pos: f64) {
        self.commanded_pos = pos;
    }

    /// Rail position at which the next step in `direction` occurs.
    pub(crate) fn next_step_position(&self, direction: Direction) -> f64 {
        let half = 0.5 * direction.sign();
        (self.mcu_position.0 as f64 + half) * self.step_distance - self.mcu_offset
    }

    pub(crate) fn step(&mut self, time: f64, direction: Direction) {
        self.mcu_position = match direction {
            Direction::Positive => Steps(self.mcu_position.0 + 1),
            Direction::Negative => Steps(self.mcu_position.0 - 1),
        };
        let dir_pin = (direction == Direction::Positive) != self.invert_direction;
        self.sink.step(StepEvent {
            time,
            direction,
            dir_pin,
            position: self.mcu_position,
        });
    }
}

//! Error types for kinematic-transform.
//!
//! Four categories mirror how failures are handled by the host:
//! configuration errors abort initialization, command errors are reported
//! back to the caller with state untouched, queue errors reject a single
//! segment, and motion errors are fatal faults in the upstream plan.

use heapless::String;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all kinematic-transform operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Operator command rejected
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
    /// Move segment rejected by the queue
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    /// Fatal runtime fault
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    #[error("Parse error: {0}")]
    ParseError(String<128>),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    IoError(String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, ..., 256)
    #[error("Invalid microsteps: {0}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256")]
    InvalidMicrosteps(u16),
    /// Option value outside its allowed range
    #[error("Invalid value {value} for '{option}': {reason}")]
    InvalidValue {
        /// Option name
        option: String<32>,
        /// Offending value
        value: f64,
        /// Constraint that was violated
        reason: &'static str,
    },
    /// Option value is not one of the accepted choices
    #[error("Choice '{value}' for option '{option}' is not valid")]
    InvalidChoice {
        /// Option name
        option: String<32>,
        /// Offending value
        value: String<32>,
    },
    /// Required option is absent
    #[error("Option '{0}' must be specified")]
    MissingOption(String<32>),
    /// Option not recognized in its section
    #[error("Option '{0}' is not valid in this section")]
    UnknownOption(String<32>),
    /// Rail has no steppers
    #[error("Rail '{0}' has no steppers")]
    EmptyRail(String<32>),
    /// Rail requires exactly one stepper
    #[error("Rail '{0}' supports only a single stepper")]
    TooManySteppers(String<32>),
    /// Rail participating in a coupled topology needs an endstop
    #[error("Rail '{0}' requires an endstop")]
    MissingEndstop(String<32>),
    /// Endstop and stepper are driven by different controllers
    #[error("Endstop '{endstop}' on '{endstop_controller}' cannot home stepper '{stepper}' on '{stepper_controller}'")]
    ControllerMismatch {
        /// Endstop name
        endstop: String<32>,
        /// Controller of the endstop
        endstop_controller: String<32>,
        /// Stepper name
        stepper: String<32>,
        /// Controller of the stepper
        stepper_controller: String<32>,
    },
    /// Duplicate stepper name in configuration
    #[error("Duplicate stepper name: '{0}'")]
    DuplicateStepperName(String<32>),
    /// Too many pivot stages configured
    #[error("Too many pivot stages (max {0})")]
    TooManyStages(usize),
}

/// Errors reported back to the issuer of a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Homing requested on an axis without an endstop
    #[error("No endstop for manual stepper '{0}'")]
    NoEndstop(String<32>),
    /// Transform chain is already installed
    #[error("Pivot transform already activated")]
    TransformAlreadyActive,
    /// Another move transform is installed and force was not requested
    #[error("Move transform already specified")]
    TransformAlreadySet,
    /// The active transform is not the one being removed
    #[error("Active move transform is not the pivot transform")]
    TransformNotOnTop,
    /// G-code axis identifier rejected
    #[error("Not a valid GCODE_AXIS: '{0}'")]
    InvalidGcodeAxis(String<8>),
    /// Axis is registered as an extra axis and must be released first
    #[error("Manual stepper '{0}' must unregister from gcode axis first")]
    AxisRegistered(String<32>),
    /// Extra axis name is already known to the registry
    #[error("Extra axis '{0}' already registered")]
    DuplicateExtraAxis(String<32>),
    /// Operation requires the axis to be idle
    #[error("Manual stepper '{0}' is homing")]
    NotIdle(String<32>),
    /// Speed must be strictly positive
    #[error("Invalid speed {0}: must be > 0")]
    InvalidSpeed(f64),
    /// Acceleration must not be negative
    #[error("Invalid acceleration {0}: must be >= 0")]
    InvalidAccel(f64),
}

/// Segment validation errors raised by the move queue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Segment starts before the channel's tail end-time
    #[error("Segment at {start_time} precedes channel tail end {tail_end}")]
    OutOfOrder {
        /// Rejected segment start time
        start_time: f64,
        /// Current tail end time
        tail_end: f64,
    },
    /// A phase duration is negative
    #[error("Negative {phase} duration {value}")]
    NegativeDuration {
        /// Phase name
        phase: &'static str,
        /// Offending duration
        value: f64,
    },
    /// Cruise velocity does not follow from the start velocity and accel
    #[error("Cruise velocity {cruise_v} unreachable from {start_v} with accel {accel} over {accel_t}s")]
    UnreachableCruise {
        /// Segment start velocity
        start_v: f64,
        /// Segment cruise velocity
        cruise_v: f64,
        /// Segment acceleration
        accel: f64,
        /// Acceleration phase duration
        accel_t: f64,
    },
    /// A segment field or sample range bound is NaN or infinite
    #[error("Value '{0}' is not finite")]
    NonFinite(&'static str),
    /// Channel index outside the queue
    #[error("Unknown channel {0}")]
    UnknownChannel(usize),
    /// Requested range reaches into reclaimed history
    #[error("Range starting at {start} reaches reclaimed history (before {reclaimed})")]
    RangeReclaimed {
        /// Requested range start
        start: f64,
        /// Time before which segments were reclaimed
        reclaimed: f64,
    },
    /// Sample interval must be strictly positive
    #[error("Invalid sample interval {0}")]
    InvalidInterval(f64),
}

/// Fatal runtime faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// Step generation requested on a rail with no bound queue
    #[error("Rail '{0}' has no move queue bound")]
    UnboundQueue(String<32>),
    /// Rail allocator references a channel the queue lacks
    #[error("Rail '{rail}' references channel {channel} outside the queue")]
    ChannelOutOfRange {
        /// Rail name
        rail: String<32>,
        /// Missing channel
        channel: usize,
    },
    /// Transform node has no inner transform to forward to
    #[error("Transform '{0}' is not attached to an inner transform")]
    TransformDetached(&'static str),
    /// Stepper position map lacks a rail
    #[error("No position for rail '{0}'")]
    MissingRailPosition(String<32>),
    /// Coordinate vector too short for the requested axis
    #[error("Coordinate has {len} axes, index {index} requested")]
    CoordinateTooShort {
        /// Coordinate length
        len: usize,
        /// Requested index
        index: usize,
    },
}

/// Copy a name into a fixed-capacity string, truncating on overflow.
pub(crate) fn name<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

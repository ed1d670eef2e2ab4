//! # kinematic-transform
//!
//! Kinematic motion-transform core for a motion-control host: turns
//! toolhead trapezoidal moves into per-rail steps across coupled
//! topologies, through an optional chain of pivot coordinate transforms,
//! plus independently clocked manual axes.
//!
//! ## Features
//!
//! - **Move segment queue**: per-channel trapezoidal segments on absolute time
//! - **Rails**: coupled steppers, cross-registered endstops, pulse allocators
//! - **Topologies**: CoreXY, CoreXZ, hybrid CoreXY with a dual carriage
//! - **Pivot transforms**: rotary stages with bounded arc sub-segmentation
//! - **Manual axes**: standalone moves, homing, extra-axis registration
//! - **no_std compatible**: Core library needs only `alloc`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kinematic_transform::{kinematics, TrapQueue};
//!
//! let config = kinematic_transform::load_config("printer.toml")?;
//! let mut kin = kinematics::from_config(config.kinematics.as_ref().unwrap())?;
//!
//! let queue = TrapQueue::shared(3);
//! kin.set_trapq(&queue);
//! queue.borrow_mut().append_toolhead_move(print_time, &toolhead_move)?;
//! kin.generate_steps(print_time + toolhead_move.duration())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `alloc`: Heap allocation for no_std with an allocator (required; `std`
//!   enables it)
//! - `defmt`: Enables defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(not(feature = "alloc"))]
compile_error!("kinematic-transform needs a global allocator: enable the `alloc` or `std` feature");

// Core modules
pub mod config;
pub mod error;
pub mod kinematics;
pub mod manual;
pub mod motion;
pub mod rail;
pub mod toolhead;
pub mod transform;

// Re-exports for ergonomic API
pub use config::{validate_config, SystemConfig};
pub use error::{Error, Result};
pub use kinematics::{Kinematics, StepperPositions};
pub use manual::{AxisState, ManualStepper};
pub use motion::{Axis, Move, SharedQueue, TrapQueue, TrapezoidProfile};
pub use rail::{Rail, StepGenerator};
pub use toolhead::{ExtraAxisRegistry, ToolheadMove};
pub use transform::{MoveTransform, PivotCoord, PivotCoordControl, TransformHost};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Degrees, Millimeters, MmPerSec, MmPerSecSquared, Steps};

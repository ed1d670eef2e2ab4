//! Manual axes.
//!
//! A manual stepper is a single rail with its own one-channel move queue
//! and virtual clock. It either takes direct commands, or registers with
//! the toolhead as an extra axis so toolhead moves drive it.

mod homing;
mod state;
mod stepper;

pub use homing::{HomingCoordinator, HomingTarget, ManualHomingTarget};
pub use state::AxisState;
pub use stepper::{ManualExtraAxis, ManualStepper, FINALIZE_HORIZON, RESERVED_AXES};

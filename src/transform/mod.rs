//! Coordinate transform chain.
//!
//! Transforms wrap one inner transform each and expose the same position and
//! move surface, so they stack between the command layer and the toolhead.

mod host;
mod identity;
mod pivot;

pub use host::TransformHost;
pub use identity::{IdentityTransform, MoveLog};
pub use pivot::{PivotCoord, PivotCoordControl, PivotStage};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::error::Result;
use crate::toolhead::ExtraAxisRegistry;

/// Position and move surface shared by every link of the transform chain.
pub trait MoveTransform: Any + fmt::Debug {
    /// Current position in this transform's (untransformed) coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if an inner transform is missing or fails.
    fn get_position(&mut self) -> Result<Vec<f64>>;

    /// Move to `target` at `speed`.
    ///
    /// # Errors
    ///
    /// Returns an error if an inner transform is missing or rejects the move.
    fn move_to(&mut self, target: &[f64], speed: f64) -> Result<()>;

    /// Re-resolve extra axis indices after the registry changed.
    fn update_extra_axes(&mut self, _registry: &ExtraAxisRegistry) {}

    /// Whether this transform ends the chain (nothing underneath).
    fn is_terminal(&self) -> bool {
        false
    }

    /// Detach and return the inner transform, if any.
    fn take_next(&mut self) -> Option<Box<dyn MoveTransform>> {
        None
    }

    /// Borrow as `Any` for type checks.
    fn as_any(&self) -> &dyn Any;

    /// Convert into `Any` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

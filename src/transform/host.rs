//! Holder of the active transform chain.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use tracing::{debug, warn};

use super::identity::IdentityTransform;
use super::MoveTransform;
use crate::error::{CommandError, Result};
use crate::toolhead::ExtraAxisRegistry;

/// Owns the top of the transform chain that moves are issued to.
#[derive(Debug)]
pub struct TransformHost {
    transform: Box<dyn MoveTransform>,
    last_position: Vec<f64>,
}

impl TransformHost {
    /// Create a host issuing moves straight to `base`.
    pub fn new(base: Box<dyn MoveTransform>) -> Self {
        Self {
            transform: base,
            last_position: Vec::new(),
        }
    }

    /// Install `transform` as the active transform and return the previous
    /// one.
    ///
    /// # Errors
    ///
    /// Without `force`, returns `CommandError::TransformAlreadySet` if the
    /// active transform is not terminal. `transform` is dropped in that case.
    pub fn set_move_transform(
        &mut self,
        transform: Box<dyn MoveTransform>,
        force: bool,
    ) -> Result<Box<dyn MoveTransform>> {
        if !force && !self.transform.is_terminal() {
            warn!("move transform already specified");
            return Err(CommandError::TransformAlreadySet.into());
        }
        debug!(force, "move transform replaced");
        Ok(mem::replace(&mut self.transform, transform))
    }

    /// Replace the active transform with one built from it.
    pub fn replace_with(
        &mut self,
        build: impl FnOnce(Box<dyn MoveTransform>) -> Box<dyn MoveTransform>,
    ) {
        let placeholder: Box<dyn MoveTransform> = Box::new(IdentityTransform::default());
        let current = mem::replace(&mut self.transform, placeholder);
        self.transform = build(current);
    }

    /// Active transform.
    #[inline]
    pub fn transform(&self) -> &dyn MoveTransform {
        self.transform.as_ref()
    }

    /// Mutable active transform.
    #[inline]
    pub fn transform_mut(&mut self) -> &mut dyn MoveTransform {
        self.transform.as_mut()
    }

    /// Position reported by the active transform.
    ///
    /// # Errors
    ///
    /// Propagates errors from the chain.
    pub fn get_position(&mut self) -> Result<Vec<f64>> {
        self.transform.get_position()
    }

    /// Re-read the chain position as the last commanded position.
    ///
    /// # Errors
    ///
    /// Propagates errors from the chain.
    pub fn reset_last_position(&mut self) -> Result<&[f64]> {
        self.last_position = self.transform.get_position()?;
        Ok(&self.last_position)
    }

    /// Last commanded position.
    #[inline]
    pub fn last_position(&self) -> &[f64] {
        &self.last_position
    }

    /// Issue a move through the chain.
    ///
    /// # Errors
    ///
    /// Propagates errors from the chain. The last position is only updated
    /// when the move succeeds.
    pub fn move_to(&mut self, target: &[f64], speed: f64) -> Result<()> {
        self.transform.move_to(target, speed)?;
        self.last_position = target.to_vec();
        Ok(())
    }

    /// Forward an extra axis registry change down the chain.
    pub fn update_extra_axes(&mut self, registry: &ExtraAxisRegistry) {
        self.transform.update_extra_axes(registry);
    }
}

//! Extra axis registry for coordinate index lookup.
//!
//! Extra axes occupy toolhead coordinate slots after x, y, z and e, in
//! registration order. Removing an axis shifts every later axis down one
//! slot, so holders of an index re-resolve it by name after each change.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{name, CommandError};

/// Coordinate index of the first extra axis.
pub const EXTRA_AXIS_BASE: usize = 4;

/// Maximum number of extra axes in the registry.
pub const MAX_EXTRA_AXES: usize = 16;

/// Ordered registry of extra axis names.
#[derive(Debug, Clone, Default)]
pub struct ExtraAxisRegistry {
    axes: Vec<String>,
}

impl ExtraAxisRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self { axes: Vec::new() }
    }

    /// Register an axis by name and return its coordinate index.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::DuplicateExtraAxis` if the name is already
    /// registered or the registry is full.
    pub fn register(&mut self, axis_name: &str) -> Result<usize, CommandError> {
        if self.contains(axis_name) || self.axes.len() >= MAX_EXTRA_AXES {
            return Err(CommandError::DuplicateExtraAxis(name(axis_name)));
        }
        self.axes.push(String::from(axis_name));
        Ok(EXTRA_AXIS_BASE + self.axes.len() - 1)
    }

    /// Coordinate index of an axis.
    pub fn index_of(&self, axis_name: &str) -> Option<usize> {
        self.axes
            .iter()
            .position(|a| a == axis_name)
            .map(|i| EXTRA_AXIS_BASE + i)
    }

    /// Check if an axis is registered.
    pub fn contains(&self, axis_name: &str) -> bool {
        self.index_of(axis_name).is_some()
    }

    /// Remove an axis by name, returning the index it occupied.
    pub fn remove(&mut self, axis_name: &str) -> Option<usize> {
        let index = self.index_of(axis_name)?;
        self.axes.remove(index - EXTRA_AXIS_BASE);
        Some(index)
    }

    /// Get the number of registered axes.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Total coordinate length including x, y, z, e and every extra axis.
    pub fn coordinate_len(&self) -> usize {
        EXTRA_AXIS_BASE + self.axes.len()
    }

    /// Get an iterator over axis names in coordinate order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(String::as_str)
    }

    /// Clear all axes.
    pub fn clear(&mut self) {
        self.axes.clear();
    }
}

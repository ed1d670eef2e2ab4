//! Terminal transform that applies moves unchanged.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;

use super::MoveTransform;
use crate::error::Result;

/// Shared record of the moves reaching a terminal transform.
#[derive(Debug, Clone, Default)]
pub struct MoveLog {
    moves: Rc<RefCell<Vec<(Vec<f64>, f64)>>>,
}

impl MoveLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded `(target, speed)` in order.
    pub fn moves(&self) -> Vec<(Vec<f64>, f64)> {
        self.moves.borrow().clone()
    }

    /// Number of recorded moves.
    pub fn len(&self) -> usize {
        self.moves.borrow().len()
    }

    /// Check if no moves were recorded.
    pub fn is_empty(&self) -> bool {
        self.moves.borrow().is_empty()
    }

    /// Drop all recorded moves.
    pub fn clear(&self) {
        self.moves.borrow_mut().clear();
    }

    fn push(&self, target: &[f64], speed: f64) {
        self.moves.borrow_mut().push((target.to_vec(), speed));
    }
}

/// Terminal transform: tracks the commanded position and logs each move.
#[derive(Debug, Clone, Default)]
pub struct IdentityTransform {
    position: Vec<f64>,
    log: MoveLog,
}

impl IdentityTransform {
    /// Create a terminal transform at `position`.
    pub fn new(position: Vec<f64>) -> Self {
        Self {
            position,
            log: MoveLog::new(),
        }
    }

    /// Record moves into `log` (clones share the log).
    pub fn with_log(mut self, log: MoveLog) -> Self {
        self.log = log;
        self
    }

    /// Move log handle.
    pub fn log(&self) -> &MoveLog {
        &self.log
    }
}

impl MoveTransform for IdentityTransform {
    fn get_position(&mut self) -> Result<Vec<f64>> {
        Ok(self.position.clone())
    }

    fn move_to(&mut self, target: &[f64], speed: f64) -> Result<()> {
        self.position = target.to_vec();
        self.log.push(target, speed);
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

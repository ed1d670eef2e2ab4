//! Pulse allocators: which queue channels drive a rail.
//!
//! A rail's position is a plain channel (cartesian) or the signed sum of two
//! channels (cross-coupled belts).

use heapless::Vec;

use crate::error::QueueError;
use crate::motion::{Axis, TrapQueue};

/// Sign of the second channel in a cross-coupled allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sign {
    /// Sum of the two channels.
    Plus,
    /// Difference of the two channels.
    Minus,
}

impl Sign {
    /// Get the sign multiplier.
    #[inline]
    pub fn factor(self) -> f64 {
        match self {
            Sign::Plus => 1.0,
            Sign::Minus => -1.0,
        }
    }
}

/// Allocator selection for a rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocatorKind {
    /// Rail follows one toolhead axis.
    Cartesian(Axis),
    /// Rail follows `x ± y`.
    CoreXY(Sign),
    /// Rail follows `x ± z`.
    CoreXZ(Sign),
}

impl Default for AllocatorKind {
    fn default() -> Self {
        AllocatorKind::Cartesian(Axis::X)
    }
}

/// Channel weights derived from an [`AllocatorKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct PulseAllocator {
    kind: AllocatorKind,
    terms: Vec<(usize, f64), 2>,
}

impl Default for PulseAllocator {
    fn default() -> Self {
        Self::new(AllocatorKind::default())
    }
}

impl PulseAllocator {
    /// Build the allocator for `kind`.
    pub fn new(kind: AllocatorKind) -> Self {
        let mut terms = Vec::new();
        // Capacity is two and no kind pushes more than two terms
        let _ = match kind {
            AllocatorKind::Cartesian(axis) => terms.push((axis.index(), 1.0)),
            AllocatorKind::CoreXY(sign) => terms
                .push((Axis::X.index(), 1.0))
                .and_then(|()| terms.push((Axis::Y.index(), sign.factor()))),
            AllocatorKind::CoreXZ(sign) => terms
                .push((Axis::X.index(), 1.0))
                .and_then(|()| terms.push((Axis::Z.index(), sign.factor()))),
        };
        Self { kind, terms }
    }

    /// Allocator kind.
    #[inline]
    pub fn kind(&self) -> AllocatorKind {
        self.kind
    }

    /// Channels read by this allocator.
    pub fn channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.terms.iter().map(|(ch, _)| *ch)
    }

    /// Highest channel read by this allocator.
    pub fn max_channel(&self) -> usize {
        self.channels().max().unwrap_or(0)
    }

    /// Rail position for a toolhead coordinate, or `None` if the coordinate
    /// lacks a channel this allocator reads.
    pub fn calc_position(&self, coord: &[f64]) -> Option<f64> {
        self.terms
            .iter()
            .map(|(ch, w)| coord.get(*ch).map(|v| v * w))
            .sum()
    }

    /// Rail position at absolute time `t`, or `None` while any channel it
    /// reads has never received a segment.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` if a channel is outside the queue.
    pub fn position_at(&self, queue: &TrapQueue, t: f64) -> Result<Option<f64>, QueueError> {
        self.combine(|ch| queue.position_at(ch, t))
    }

    /// Rail position just before `t`, see [`TrapQueue::position_before`].
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` if a channel is outside the queue.
    pub fn position_before(&self, queue: &TrapQueue, t: f64) -> Result<Option<f64>, QueueError> {
        self.combine(|ch| queue.position_before(ch, t))
    }

    fn combine(
        &self,
        channel_pos: impl Fn(usize) -> Result<Option<f64>, QueueError>,
    ) -> Result<Option<f64>, QueueError> {
        let mut total = 0.0;
        for (ch, w) in &self.terms {
            match channel_pos(*ch)? {
                Some(pos) => total += pos * w,
                None => return Ok(None),
            }
        }
        Ok(Some(total))
    }
}

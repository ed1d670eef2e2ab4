//! Move segment queue.
//!
//! Holds, per channel, an ordered run of trapezoidal segments keyed by
//! absolute machine time. Segments move from the active list to a history
//! list once finalized, and old history is reclaimed. The newest history
//! segment of each channel is always retained so the channel position stays
//! queryable after everything has been finalized.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ops::Range;

use tracing::{debug, warn};

use super::segment::Move;
use crate::error::QueueError;
use crate::toolhead::ToolheadMove;

/// Slack allowed when comparing segment times.
pub const TIME_EPSILON: f64 = 1e-9;

/// Queue shared between the producer of segments and the rails reading them.
pub type SharedQueue = Rc<RefCell<TrapQueue>>;

#[derive(Debug, Clone)]
struct Channel {
    active: VecDeque<Move>,
    history: VecDeque<Move>,
    /// Segments ending at or before this time have been discarded.
    reclaimed: f64,
}

impl Channel {
    fn new() -> Self {
        Self {
            active: VecDeque::new(),
            history: VecDeque::new(),
            reclaimed: f64::NEG_INFINITY,
        }
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = &Move> + '_ {
        self.history.iter().chain(self.active.iter())
    }

    fn tail(&self) -> Option<&Move> {
        self.active.back().or_else(|| self.history.back())
    }

    /// Position at `t`, holding before the first segment, through gaps and
    /// after the tail. `None` for a channel that never received a segment.
    fn position_at(&self, t: f64) -> Option<f64> {
        match self.iter().rev().find(|m| m.start_time <= t) {
            Some(m) => Some(m.position_at(t)),
            None => self.iter().next().map(|m| m.start_pos),
        }
    }

    /// Position approaching `t` from the left, ignoring a segment that
    /// starts exactly at `t`.
    fn position_before(&self, t: f64) -> Option<f64> {
        match self.iter().rev().find(|m| m.start_time < t) {
            Some(m) => Some(m.position_at(t)),
            None => self.iter().next().map(|m| m.start_pos),
        }
    }

    fn velocity_at(&self, t: f64) -> f64 {
        match self.iter().rev().find(|m| m.start_time <= t) {
            Some(m) if t < m.end_time() => m.velocity_at(t),
            _ => 0.0,
        }
    }
}

/// Per-channel queue of trapezoidal segments.
#[derive(Debug, Clone)]
pub struct TrapQueue {
    channels: Vec<Channel>,
    finalized: f64,
}

impl TrapQueue {
    /// Create a queue with `channels` independent channels.
    pub fn new(channels: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| Channel::new()).collect(),
            finalized: f64::NEG_INFINITY,
        }
    }

    /// Create a queue wrapped for sharing.
    pub fn shared(channels: usize) -> SharedQueue {
        Rc::new(RefCell::new(Self::new(channels)))
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel(&self, channel: usize) -> Result<&Channel, QueueError> {
        self.channels
            .get(channel)
            .ok_or(QueueError::UnknownChannel(channel))
    }

    fn check_append(&self, channel: usize, segment: &Move) -> Result<(), QueueError> {
        segment.validate()?;
        let ch = self.channel(channel)?;
        if let Some(tail) = ch.tail() {
            let tail_end = tail.end_time();
            if segment.start_time < tail_end - TIME_EPSILON {
                return Err(QueueError::OutOfOrder {
                    start_time: segment.start_time,
                    tail_end,
                });
            }
        }
        Ok(())
    }

    /// Append a segment to a channel.
    ///
    /// # Errors
    ///
    /// Returns a `QueueError` if the segment is malformed or starts before
    /// the channel's tail end-time. The queue is unchanged on error.
    pub fn append(&mut self, channel: usize, segment: Move) -> Result<(), QueueError> {
        if let Err(e) = self.check_append(channel, &segment) {
            warn!(channel, start_time = segment.start_time, error = %e, "segment rejected");
            return Err(e);
        }
        self.channels[channel].active.push_back(segment);
        Ok(())
    }

    /// Fan a toolhead move out to every channel it covers.
    ///
    /// Channel `i` receives the move scaled by `axes_r[i]`, starting at
    /// `start_pos[i]`. Either every channel accepts its segment or none do.
    ///
    /// # Errors
    ///
    /// Returns the first `QueueError` raised by any channel.
    pub fn append_toolhead_move(
        &mut self,
        print_time: f64,
        mv: &ToolheadMove,
    ) -> Result<(), QueueError> {
        let count = self
            .channels
            .len()
            .min(mv.start_pos.len())
            .min(mv.axes_r.len());
        let segments: Vec<Move> = (0..count)
            .filter_map(|i| mv.axis_segment(print_time, i))
            .collect();

        for (i, segment) in segments.iter().enumerate() {
            if let Err(e) = self.check_append(i, segment) {
                warn!(channel = i, print_time, error = %e, "toolhead move rejected");
                return Err(e);
            }
        }
        for (i, segment) in segments.into_iter().enumerate() {
            self.channels[i].active.push_back(segment);
        }
        Ok(())
    }

    /// Finalize segments ending by `before_time` and reclaim finalized
    /// history ending before `after_time`.
    ///
    /// The finalize boundary never retreats: an earlier `before_time` than
    /// a previous call is ignored. Segments overlapping `after_time` and the
    /// newest finalized segment of each channel are kept.
    pub fn finalize(&mut self, before_time: f64, after_time: f64) {
        if before_time > self.finalized {
            self.finalized = before_time;
        }
        let finalized = self.finalized;
        let mut reclaimed = 0usize;

        for ch in &mut self.channels {
            while let Some(front) = ch.active.front() {
                if front.end_time() > finalized + TIME_EPSILON {
                    break;
                }
                if let Some(m) = ch.active.pop_front() {
                    ch.history.push_back(m);
                }
            }
            while ch.history.len() > 1 {
                let end = match ch.history.front() {
                    Some(m) if m.end_time() < after_time => m.end_time(),
                    _ => break,
                };
                ch.history.pop_front();
                ch.reclaimed = ch.reclaimed.max(end);
                reclaimed += 1;
            }
        }

        debug!(finalized, reclaimed, "queue finalized");
    }

    /// Current finalize boundary.
    #[inline]
    pub fn finalized_time(&self) -> f64 {
        self.finalized
    }

    /// End time of the channel's newest segment, if any.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn tail_end(&self, channel: usize) -> Result<Option<f64>, QueueError> {
        Ok(self.channel(channel)?.tail().map(Move::end_time))
    }

    /// Iterate over a channel's retained segments in time order.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn segments(
        &self,
        channel: usize,
    ) -> Result<impl DoubleEndedIterator<Item = &Move> + '_, QueueError> {
        Ok(self.channel(channel)?.iter())
    }

    /// Number of segments not yet finalized on a channel.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn pending(&self, channel: usize) -> Result<usize, QueueError> {
        Ok(self.channel(channel)?.active.len())
    }

    /// Channel position at absolute time `t`.
    ///
    /// Before the first retained segment the position holds that segment's
    /// start; in gaps and after the tail it holds the previous end position.
    /// Returns `Ok(None)` for a channel that has never received a segment.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn position_at(&self, channel: usize, t: f64) -> Result<Option<f64>, QueueError> {
        Ok(self.channel(channel)?.position_at(t))
    }

    /// Channel position just before `t`.
    ///
    /// Differs from [`TrapQueue::position_at`] only where a segment starts
    /// away from the previous end position.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn position_before(&self, channel: usize, t: f64) -> Result<Option<f64>, QueueError> {
        Ok(self.channel(channel)?.position_before(t))
    }

    /// Channel velocity at absolute time `t` (zero outside segments).
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownChannel` for a channel outside the queue.
    pub fn velocity_at(&self, channel: usize, t: f64) -> Result<f64, QueueError> {
        Ok(self.channel(channel)?.velocity_at(t))
    }

    /// Sample a channel's position over `range` every `interval` seconds.
    ///
    /// The returned iterator is lazy, finite and can be cloned to restart.
    /// It always ends with a sample at `range.end`.
    ///
    /// # Errors
    ///
    /// Returns a `QueueError` for an unknown channel, a non-positive
    /// interval, a non-finite range end, or a range starting inside
    /// reclaimed history.
    pub fn pull(
        &self,
        channel: usize,
        range: Range<f64>,
        interval: f64,
    ) -> Result<Samples<'_>, QueueError> {
        let ch = self.channel(channel)?;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(QueueError::InvalidInterval(interval));
        }
        for (field, value) in [("range.start", range.start), ("range.end", range.end)] {
            if !value.is_finite() {
                return Err(QueueError::NonFinite(field));
            }
        }
        if range.start < ch.reclaimed {
            return Err(QueueError::RangeReclaimed {
                start: range.start,
                reclaimed: ch.reclaimed,
            });
        }
        Ok(Samples {
            channel: ch,
            start: range.start,
            end: range.end,
            interval,
            index: 0,
            done: range.end < range.start,
        })
    }
}

/// Lazy `(time, position)` samples of one channel.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    channel: &'a Channel,
    start: f64,
    end: f64,
    interval: f64,
    index: u64,
    done: bool,
}

impl Iterator for Samples<'_> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut t = self.start + self.index as f64 * self.interval;
        if t >= self.end - TIME_EPSILON {
            t = self.end;
            self.done = true;
        }
        self.index += 1;
        match self.channel.position_at(t) {
            Some(pos) => Some((t, pos)),
            None => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trapezoid(start_time: f64, start_pos: f64) -> Move {
        Move::new(start_time, start_pos, 1.0, 2.0, 1.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_append_in_order() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        q.append(0, trapezoid(4.0, 30.0)).unwrap();
        assert_eq!(q.pending(0).unwrap(), 2);
        assert_eq!(q.tail_end(0).unwrap(), Some(8.0));
    }

    #[test]
    fn test_out_of_order_leaves_queue_unchanged() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        let before = q.segments(0).unwrap().copied().collect::<Vec<_>>();

        let err = q.append(0, trapezoid(3.0, 30.0)).unwrap_err();
        assert!(matches!(err, QueueError::OutOfOrder { .. }));

        let after = q.segments(0).unwrap().copied().collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unknown_channel() {
        let mut q = TrapQueue::new(2);
        assert_eq!(
            q.append(2, trapezoid(0.0, 0.0)),
            Err(QueueError::UnknownChannel(2))
        );
    }

    #[test]
    fn test_position_holds_outside_segments() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(1.0, 10.0)).unwrap();
        q.append(0, trapezoid(7.0, 40.0)).unwrap();

        assert_eq!(q.position_at(0, 0.0).unwrap(), Some(10.0));
        // Gap between 5.0 and 7.0 holds the first segment's end
        assert!((q.position_at(0, 6.0).unwrap().unwrap() - 40.0).abs() < 1e-12);
        assert!((q.position_at(0, 100.0).unwrap().unwrap() - 70.0).abs() < 1e-12);
        assert_eq!(q.velocity_at(0, 6.0).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_channel_has_no_position() {
        let q = TrapQueue::new(1);
        assert_eq!(q.position_at(0, 1.0).unwrap(), None);
    }

    #[test]
    fn test_finalize_keeps_newest_history() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        q.append(0, trapezoid(4.0, 30.0)).unwrap();

        q.finalize(100.0, 100.0);
        assert_eq!(q.pending(0).unwrap(), 0);
        assert_eq!(q.segments(0).unwrap().count(), 1);
        assert!((q.position_at(0, 200.0).unwrap().unwrap() - 60.0).abs() < 1e-12);

        // Appending after the retained tail still works
        q.append(0, trapezoid(8.0, 60.0)).unwrap();
    }

    #[test]
    fn test_finalize_never_retreats() {
        let mut q = TrapQueue::new(1);
        q.finalize(10.0, 0.0);
        q.finalize(5.0, 0.0);
        assert_eq!(q.finalized_time(), 10.0);
    }

    #[test]
    fn test_finalize_protects_overlapping_segment() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        q.append(0, trapezoid(4.0, 30.0)).unwrap();
        q.append(0, trapezoid(8.0, 60.0)).unwrap();

        // Everything is finalized, but the segment covering t=6 survives
        q.finalize(20.0, 6.0);
        let starts: Vec<f64> = q.segments(0).unwrap().map(|m| m.start_time).collect();
        assert_eq!(starts, [4.0, 8.0]);
    }

    #[test]
    fn test_pull_samples() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();

        let samples: Vec<(f64, f64)> = q.pull(0, 0.0..4.0, 1.0).unwrap().collect();
        assert_eq!(samples.len(), 5);
        assert!((samples[1].1 - 5.0).abs() < 1e-12);
        assert!((samples[4].1 - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_pull_is_restartable() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();

        let samples = q.pull(0, 0.5..3.7, 0.25).unwrap();
        let first: Vec<_> = samples.clone().collect();
        let second: Vec<_> = samples.collect();
        assert_eq!(first, second);
        assert_eq!(first.last().map(|s| s.0), Some(3.7));
    }

    #[test]
    fn test_pull_rejects_reclaimed_range() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        q.append(0, trapezoid(4.0, 30.0)).unwrap();
        q.finalize(100.0, 100.0);

        assert!(matches!(
            q.pull(0, 0.0..8.0, 1.0),
            Err(QueueError::RangeReclaimed { .. })
        ));
        assert!(q.pull(0, 4.0..8.0, 1.0).is_ok());
    }

    #[test]
    fn test_pull_rejects_bad_interval() {
        let q = TrapQueue::new(1);
        assert!(matches!(
            q.pull(0, 0.0..1.0, 0.0),
            Err(QueueError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_pull_rejects_unbounded_range() {
        let mut q = TrapQueue::new(1);
        q.append(0, trapezoid(0.0, 0.0)).unwrap();
        assert!(matches!(
            q.pull(0, 0.0..f64::INFINITY, 1.0),
            Err(QueueError::NonFinite("range.end"))
        ));
        assert!(matches!(
            q.pull(0, f64::NAN..1.0, 1.0),
            Err(QueueError::NonFinite("range.start"))
        ));
    }

    #[test]
    fn test_toolhead_move_is_all_or_nothing() {
        let mut q = TrapQueue::new(2);
        // Channel 1 already runs until 8.0
        q.append(1, trapezoid(4.0, 0.0)).unwrap();

        let mv = ToolheadMove::between(&[0.0, 0.0], &[3.0, 4.0], 0.0, 1.0, 0.0, 5.0, 5.0, 0.0);
        assert!(matches!(
            q.append_toolhead_move(2.0, &mv),
            Err(QueueError::OutOfOrder { .. })
        ));
        assert_eq!(q.pending(0).unwrap(), 0);
        assert_eq!(q.pending(1).unwrap(), 1);

        q.append_toolhead_move(8.0, &mv).unwrap();
        assert_eq!(q.pending(0).unwrap(), 1);
        assert!((q.position_at(1, 9.0).unwrap().unwrap() - 4.0).abs() < 1e-12);
    }
}

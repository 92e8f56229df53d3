// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Gapless playback scheduling.
//!
//! Model audio arrives in chunks. Each chunk starts where the previous
//! one ends, or now if the queue has drained. Times are seconds on the
//! host's output clock.

use std::collections::BTreeSet;

/// Scheduled buffer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackHandle(u64);

/// Where a buffer was placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub handle: PlaybackHandle,
    /// Start time in seconds
    pub start: f64,
}

/// Tracks the playback cursor and buffers still sounding
#[derive(Debug, Clone, Default)]
pub struct PlaybackScheduler {
    cursor: f64,
    active: BTreeSet<PlaybackHandle>,
    next_handle: u64,
}

impl PlaybackScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a buffer of `duration` seconds given the output clock `now`
    pub fn schedule(&mut self, now: f64, duration: f64) -> ScheduledBuffer {
        let start = self.cursor.max(now);
        self.cursor = start + duration;
        let handle = PlaybackHandle(self.next_handle);
        self.next_handle += 1;
        self.active.insert(handle);
        ScheduledBuffer { handle, start }
    }

    /// Forget a buffer that finished; false if it was not active
    pub fn finished(&mut self, handle: PlaybackHandle) -> bool {
        self.active.remove(&handle)
    }

    /// Drop every buffer and rewind; returns the handles to stop
    pub fn interrupt(&mut self) -> Vec<PlaybackHandle> {
        self.cursor = 0.0;
        std::mem::take(&mut self.active).into_iter().collect()
    }

    /// Next start time
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Buffers scheduled and not yet finished
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Check whether anything is still sounding
    pub fn is_playing(&self) -> bool {
        !self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gapless_chain() {
        let mut scheduler = PlaybackScheduler::new();
        let a = scheduler.schedule(1.0, 0.5);
        let b = scheduler.schedule(1.1, 0.25);
        assert_eq!(a.start, 1.0);
        assert_eq!(b.start, 1.5);
        assert_eq!(scheduler.cursor(), 1.75);
    }

    #[test]
    fn test_drained_queue_starts_now() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.schedule(0.0, 0.5);
        let late = scheduler.schedule(3.0, 0.5);
        assert_eq!(late.start, 3.0);
    }

    #[test]
    fn test_interrupt_stops_everything() {
        let mut scheduler = PlaybackScheduler::new();
        let handles: Vec<_> = (0..3).map(|_| scheduler.schedule(0.0, 1.0).handle).collect();
        let stopped = scheduler.interrupt();
        assert_eq!(stopped, handles);
        assert_eq!(scheduler.cursor(), 0.0);
        assert!(!scheduler.is_playing());
        assert_eq!(scheduler.schedule(0.0, 1.0).start, 0.0);
    }

    #[test]
    fn test_finished_removes_once() {
        let mut scheduler = PlaybackScheduler::new();
        let handle = scheduler.schedule(0.0, 1.0).handle;
        assert!(scheduler.finished(handle));
        assert!(!scheduler.finished(handle));
        assert_eq!(scheduler.active_count(), 0);
    }
}

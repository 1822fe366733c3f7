#![forbid(unsafe_code)]

//! Cancellable one-shot timers for the single engine thread.
//!
//! [`Scheduler`] replaces ad-hoc timer tasks: scheduling returns a
//! [`TimerHandle`], and [`Scheduler::poll`] hands back the payloads whose
//! deadline has passed. Nothing runs on its own; the engine polls on every
//! tick.
//!
//! # Invariants
//!
//! 1. A payload is returned by `poll` at most once.
//! 2. Cancelling is idempotent: cancelling a fired, cancelled or unknown
//!    handle is a no-op that returns `false`.
//! 3. Handles are never reused within one scheduler.
//! 4. Due payloads come back ordered by deadline, ties in scheduling order.

use web_time::{Duration, Instant};

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    handle: TimerHandle,
    due: Instant,
    task: T,
}

/// One-shot timers carrying a payload of type `T`.
#[derive(Debug)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `task` to become due `delay` after `now`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            handle,
            due: now + delay,
            task,
        });
        handle
    }

    /// Cancel a timer. Returns `true` if it was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    /// Cancel an optional handle, clearing it.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) -> bool {
        slot.take().is_some_and(|h| self.cancel(h))
    }

    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Remove and return every payload due at or before `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<(TimerHandle, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|e| e.due <= now);
        self.entries = pending;
        due.sort_by_key(|e| (e.due, e.handle.0));
        due.into_iter().map(|e| (e.handle, e.task)).collect()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC_1: Duration = Duration::from_secs(1);

    #[test]
    fn fires_once_when_due() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        let h = s.schedule(t, SEC_1, "coast");
        assert!(s.poll(t).is_empty());
        assert_eq!(s.poll(t + SEC_1), vec![(h, "coast")]);
        assert!(s.poll(t + SEC_1 * 2).is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        let h = s.schedule(t, SEC_1, ());
        assert!(s.is_pending(h));
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(!s.is_pending(h));
        assert!(s.poll(t + SEC_1).is_empty());
    }

    #[test]
    fn cancelling_fired_timer_is_noop() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        let h = s.schedule(t, Duration::ZERO, 1);
        assert_eq!(s.poll(t).len(), 1);
        assert!(!s.cancel(h));
    }

    #[test]
    fn cancel_slot_clears() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        let mut slot = Some(s.schedule(t, SEC_1, 0));
        assert!(s.cancel_slot(&mut slot));
        assert!(slot.is_none());
        assert!(!s.cancel_slot(&mut slot));
    }

    #[test]
    fn due_order_is_deadline_then_fifo() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t, SEC_1 * 2, "late");
        s.schedule(t, SEC_1, "first");
        s.schedule(t, SEC_1, "second");
        let due: Vec<_> = s.poll(t + SEC_1 * 3).into_iter().map(|(_, x)| x).collect();
        assert_eq!(due, vec!["first", "second", "late"]);
        assert!(s.is_empty());
    }

    #[test]
    fn handles_are_unique() {
        let t = Instant::now();
        let mut s = Scheduler::new();
        let a = s.schedule(t, SEC_1, ());
        let b = s.schedule(t, SEC_1, ());
        assert_ne!(a, b);
        s.clear();
        assert_eq!(s.len(), 0);
    }
}

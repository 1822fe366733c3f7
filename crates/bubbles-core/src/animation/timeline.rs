#![forbid(unsafe_code)]

//! Timeline: labeled animation cues at fixed offsets.
//!
//! A [`Timeline`] sequences several [`Animation`]s at offsets from its
//! start. The close sequence of a bubble is one timeline: each phase
//! (flatten, cross-fade to the close icon, detach) is a labeled event, and
//! the engine reacts to the labels as they start.
//!
//! # Usage
//!
//! ```
//! use web_time::Duration;
//! use bubbles_core::animation::{Timeline, Tween};
//!
//! let mut tl = Timeline::new()
//!     .add_labeled("flatten", Duration::ZERO, Tween::progress(Duration::from_millis(50)))
//!     .add_labeled("cross_fade", Duration::from_millis(100), Tween::progress(Duration::from_millis(400)))
//!     .set_duration(Duration::from_millis(700));
//!
//! tl.play();
//! let started = tl.advance(Duration::from_millis(16));
//! assert_eq!(started, vec!["flatten"]);
//! ```
//!
//! # Invariants
//!
//! 1. Events are always sorted by offset (maintained on insertion).
//! 2. Each event's label is reported by [`Timeline::advance`] exactly once
//!    per playback, on the advance that reaches its offset.
//! 3. `advance` only moves a `Playing` timeline.
//!
//! # Failure Modes
//!
//! - Zero duration: clamped to 1ns to avoid division by zero.
//! - Empty timeline: progress is always 1.0.

use web_time::Duration;

use super::Animation;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Playback state of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Finished,
}

struct TimelineEvent {
    offset: Duration,
    animation: Box<dyn Animation>,
    label: Option<String>,
    started: bool,
}

impl std::fmt::Debug for TimelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEvent")
            .field("offset", &self.offset)
            .field("label", &self.label)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// Animations scheduled at offsets, with labeled start cues.
pub struct Timeline {
    events: Vec<TimelineEvent>,
    total_duration: Duration,
    duration_explicit: bool,
    state: PlaybackState,
    current_time: Duration,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("event_count", &self.events.len())
            .field("total_duration", &self.total_duration)
            .field("state", &self.state)
            .field("current_time", &self.current_time)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            total_duration: Duration::from_nanos(1),
            duration_explicit: false,
            state: PlaybackState::Idle,
            current_time: Duration::ZERO,
        }
    }

    /// Add an unlabeled event (builder pattern).
    #[must_use]
    pub fn add(mut self, offset: Duration, animation: impl Animation + 'static) -> Self {
        self.push_event(offset, Box::new(animation), None);
        self
    }

    /// Add a labeled event (builder pattern).
    #[must_use]
    pub fn add_labeled(
        mut self,
        label: &str,
        offset: Duration,
        animation: impl Animation + 'static,
    ) -> Self {
        self.push_event(offset, Box::new(animation), Some(label.to_string()));
        self
    }

    /// Set the total duration explicitly (builder pattern).
    ///
    /// If never called, duration is inferred as `max(event.offset)`.
    #[must_use]
    pub fn set_duration(mut self, d: Duration) -> Self {
        self.total_duration = if d.is_zero() {
            Duration::from_nanos(1)
        } else {
            d
        };
        self.duration_explicit = true;
        self
    }

    fn push_event(&mut self, offset: Duration, animation: Box<dyn Animation>, label: Option<String>) {
        let event = TimelineEvent {
            offset,
            animation,
            label,
            started: false,
        };
        let pos = self.events.partition_point(|e| e.offset <= offset);
        self.events.insert(pos, event);

        if !self.duration_explicit {
            self.total_duration = self
                .events
                .last()
                .map_or(Duration::from_nanos(1), |e| e.offset.max(Duration::from_nanos(1)));
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

impl Timeline {
    /// Start or restart playback from the beginning.
    pub fn play(&mut self) {
        self.rewind();
        self.state = PlaybackState::Playing;
    }

    /// Stop playback and reset to idle.
    pub fn stop(&mut self) {
        self.rewind();
        self.state = PlaybackState::Idle;
    }

    fn rewind(&mut self) {
        self.current_time = Duration::ZERO;
        for event in &mut self.events {
            event.animation.reset();
            event.started = false;
        }
    }

    /// Advance by `dt` and return the labels of events that started.
    pub fn advance(&mut self, dt: Duration) -> Vec<&str> {
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }

        let prev = self.current_time;
        let new_time = prev.saturating_add(dt).min(self.total_duration);

        let mut newly_started = Vec::new();
        for (i, event) in self.events.iter_mut().enumerate() {
            if new_time < event.offset {
                continue;
            }
            if !event.started {
                event.started = true;
                event.animation.tick(new_time.saturating_sub(event.offset));
                newly_started.push(i);
            } else if !event.animation.is_complete() {
                event.animation.tick(new_time.saturating_sub(prev.max(event.offset)));
            }
        }
        self.current_time = new_time;
        if self.current_time >= self.total_duration {
            self.state = PlaybackState::Finished;
        }

        newly_started
            .into_iter()
            .filter_map(|i| self.events[i].label.as_deref())
            .collect()
    }

    /// Current progress in `[0.0, 1.0]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.events.is_empty() {
            return 1.0;
        }
        let t = self.current_time.as_secs_f64() / self.total_duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.total_duration
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> Duration {
        self.current_time
    }

    #[inline]
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Value of a labeled event's animation, or `None` if unknown.
    #[must_use]
    pub fn event_value(&self, label: &str) -> Option<f32> {
        self.events
            .iter()
            .find(|e| e.label.as_deref() == Some(label))
            .map(|e| e.animation.value())
    }
}

impl Animation for Timeline {
    fn tick(&mut self, dt: Duration) {
        let _ = self.advance(dt);
    }

    fn is_complete(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    fn value(&self) -> f32 {
        self.progress()
    }

    fn reset(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

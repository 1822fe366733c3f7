#![forbid(unsafe_code)]

//! Gesture recognition: turns a raw touch stream into semantic events.
//!
//! [`GestureRecognizer`] classifies one finger's touch sequence into a tap,
//! a long press, or a drag (optionally ending in a fling).
//!
//! # State Machine
//!
//! - **Drag detector**: a sequence becomes a drag once the finger leaves the
//!   touch slop (Euclidean distance from the down point). Emits
//!   `DragStart` / `DragMove` / `DragEnd`.
//! - **Long press detector**: fires from [`GestureRecognizer::check_long_press`]
//!   once the finger has been down, without dragging, for the threshold.
//! - **Fling detector**: on release of a drag, the raw velocity over the
//!   last `velocity_window` of samples is compared against
//!   `min_fling_velocity` per axis.
//!
//! # Invariants
//!
//! 1. `Tap` and `DragStart` never both emit for the same sequence.
//! 2. A long press never fires once a drag started, and a sequence that
//!    long-pressed does not also tap.
//! 3. `Fling` is emitted right before `DragEnd`, never on its own.
//! 4. After `reset()` the recognizer is idle.
//!
//! # Failure Modes
//!
//! - `Move` or `Up` without a preceding `Down` is ignored.
//! - `Cancel` ends a drag with `DragEnd` but never taps or flings.
//! - Two samples with the same timestamp give a zero raw velocity.

use std::collections::VecDeque;

use web_time::Instant;

use crate::config::GestureConfig;
use crate::event::{TouchEvent, TouchPhase};
use crate::geometry::{Point, Velocity};
use crate::semantic_event::SemanticEvent;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DragTracker {
    origin: Point,
    last_pos: Point,
    started: bool,
}

// ---------------------------------------------------------------------------
// GestureRecognizer
// ---------------------------------------------------------------------------

/// Stateful touch gesture recognizer for one bubble.
pub struct GestureRecognizer {
    config: GestureConfig,
    down_time: Option<Instant>,
    drag: Option<DragTracker>,
    long_press_armed: bool,
    long_press_fired: bool,
    samples: VecDeque<(Point, Instant)>,
    last_velocity: Velocity,
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("dragging", &self.is_dragging())
            .field("samples", &self.samples.len())
            .finish()
    }
}

impl GestureRecognizer {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            down_time: None,
            drag: None,
            long_press_armed: false,
            long_press_fired: false,
            samples: VecDeque::with_capacity(16),
            last_velocity: Velocity::ZERO,
        }
    }

    /// Process one touch sample, returning any semantic events produced.
    pub fn process(&mut self, event: &TouchEvent) -> Vec<SemanticEvent> {
        let mut out = Vec::with_capacity(2);
        match event.phase {
            TouchPhase::Down => self.on_down(event.pos, event.time),
            TouchPhase::Move => self.on_move(event.pos, event.time, &mut out),
            TouchPhase::Up | TouchPhase::Cancel => {
                self.on_up(event.pos, event.time, event.phase == TouchPhase::Cancel, &mut out);
            }
        }
        out
    }

    /// Check for a long press. Call periodically (e.g. on tick).
    pub fn check_long_press(&mut self, now: Instant) -> Option<SemanticEvent> {
        if !self.long_press_armed || self.long_press_fired || self.is_dragging() {
            return None;
        }
        let down_time = self.down_time?;
        let origin = self.drag.as_ref()?.origin;
        let elapsed = now.saturating_duration_since(down_time);
        if elapsed >= self.config.long_press() {
            self.long_press_fired = true;
            return Some(SemanticEvent::LongPress {
                pos: origin,
                duration: elapsed,
            });
        }
        None
    }

    /// Whether a drag is in progress.
    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.as_ref().is_some_and(|d| d.started)
    }

    /// Whether a finger is currently down.
    #[inline]
    #[must_use]
    pub fn is_down(&self) -> bool {
        self.down_time.is_some()
    }

    /// Raw velocity measured at the last release.
    #[inline]
    #[must_use]
    pub fn last_velocity(&self) -> Velocity {
        self.last_velocity
    }

    /// Return to idle.
    pub fn reset(&mut self) {
        self.down_time = None;
        self.drag = None;
        self.long_press_armed = false;
        self.long_press_fired = false;
        self.samples.clear();
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Internal event handlers
// ---------------------------------------------------------------------------

impl GestureRecognizer {
    fn on_down(&mut self, pos: Point, now: Instant) {
        self.reset();
        self.down_time = Some(now);
        self.drag = Some(DragTracker {
            origin: pos,
            last_pos: pos,
            started: false,
        });
        self.long_press_armed = true;
        self.record(pos, now);
    }

    fn on_move(&mut self, pos: Point, now: Instant, out: &mut Vec<SemanticEvent>) {
        if self.down_time.is_none() {
            return;
        }
        self.record(pos, now);

        let Some(ref mut drag) = self.drag else {
            return;
        };

        if !drag.started && drag.origin.distance(pos) > self.config.touch_slop {
            drag.started = true;
            self.long_press_armed = false;
            out.push(SemanticEvent::DragStart {
                origin: drag.origin,
                pos,
            });
        }

        if drag.started {
            out.push(SemanticEvent::DragMove {
                origin: drag.origin,
                current: pos,
                delta: pos.delta(drag.last_pos),
            });
        }
        drag.last_pos = pos;
    }

    fn on_up(&mut self, pos: Point, now: Instant, cancelled: bool, out: &mut Vec<SemanticEvent>) {
        if self.down_time.is_none() {
            return;
        }
        self.record(pos, now);
        self.last_velocity = self.raw_velocity();

        if let Some(drag) = self.drag.take()
            && drag.started
        {
            if !cancelled && self.last_velocity.max_abs() >= self.config.min_fling_velocity {
                out.push(SemanticEvent::Fling {
                    velocity: self.last_velocity,
                });
            }
            out.push(SemanticEvent::DragEnd {
                origin: drag.origin,
                end: pos,
            });
        } else if !cancelled && !self.long_press_fired {
            out.push(SemanticEvent::Tap { pos });
        }

        self.reset();
    }

    fn record(&mut self, pos: Point, now: Instant) {
        self.samples.push_back((pos, now));
        let window = self.config.velocity_window();
        while self.samples.len() > 2
            && self
                .samples
                .front()
                .is_some_and(|&(_, t)| now.saturating_duration_since(t) > window)
        {
            self.samples.pop_front();
        }
    }

    /// Velocity between the oldest and newest sample in the window.
    fn raw_velocity(&self) -> Velocity {
        let (Some(&(p0, t0)), Some(&(p1, t1))) = (self.samples.front(), self.samples.back()) else {
            return Velocity::ZERO;
        };
        let dt = t1.saturating_duration_since(t0).as_secs_f64();
        if dt <= 0.0 {
            return Velocity::ZERO;
        }
        let (dx, dy) = p1.delta(p0);
        Velocity::new(dx / dt, dy / dt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

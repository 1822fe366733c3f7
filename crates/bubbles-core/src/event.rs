#![forbid(unsafe_code)]

//! Canonical touch input types.
//!
//! The host translates its platform touch stream into [`TouchEvent`]s and
//! hands them to the engine together with the bubble they landed on.
//! Coordinates are raw screen coordinates (not relative to the bubble).
//!
//! # Design Notes
//!
//! - Only a single pointer is tracked per bubble; multi-touch is the host's
//!   problem.
//! - Every event carries its own timestamp so that gesture recognition is
//!   deterministic and replayable.

use web_time::Instant;

use crate::geometry::Point;

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// Finger went down.
    Down,
    /// Finger moved while down.
    Move,
    /// Finger lifted.
    Up,
    /// The platform aborted the gesture (treated like `Up`).
    Cancel,
}

impl TouchPhase {
    /// Returns true for phases that end a touch sequence.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// A single raw touch sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Raw screen position.
    pub pos: Point,
    /// When the sample was taken.
    pub time: Instant,
}

impl TouchEvent {
    #[must_use]
    pub const fn new(phase: TouchPhase, pos: Point, time: Instant) -> Self {
        Self { phase, pos, time }
    }

    #[must_use]
    pub fn down(x: f64, y: f64, time: Instant) -> Self {
        Self::new(TouchPhase::Down, Point::new(x, y), time)
    }

    #[must_use]
    pub fn moved(x: f64, y: f64, time: Instant) -> Self {
        Self::new(TouchPhase::Move, Point::new(x, y), time)
    }

    #[must_use]
    pub fn up(x: f64, y: f64, time: Instant) -> Self {
        Self::new(TouchPhase::Up, Point::new(x, y), time)
    }

    #[must_use]
    pub fn cancel(x: f64, y: f64, time: Instant) -> Self {
        Self::new(TouchPhase::Cancel, Point::new(x, y), time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(TouchPhase::Up.is_terminal());
        assert!(TouchPhase::Cancel.is_terminal());
        assert!(!TouchPhase::Down.is_terminal());
        assert!(!TouchPhase::Move.is_terminal());
    }

    #[test]
    fn constructors_set_phase() {
        let t = Instant::now();
        assert_eq!(TouchEvent::down(1.0, 2.0, t).phase, TouchPhase::Down);
        assert_eq!(TouchEvent::moved(1.0, 2.0, t).phase, TouchPhase::Move);
        assert_eq!(TouchEvent::up(1.0, 2.0, t).phase, TouchPhase::Up);
        assert_eq!(TouchEvent::cancel(1.0, 2.0, t).pos, Point::new(1.0, 2.0));
    }
}

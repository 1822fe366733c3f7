#![forbid(unsafe_code)]

//! High-level gestures derived from a raw touch stream.
//!
//! [`SemanticEvent`] represents what the user *meant*: a tap, a long press,
//! a drag, or a fling. The [`GestureRecognizer`](crate::gesture::GestureRecognizer)
//! produces them from [`TouchEvent`](crate::event::TouchEvent)s.
//!
//! ## Invariants
//! 1. Every drag sequence is well-formed: `DragStart` → zero or more
//!    `DragMove` → `DragEnd`.
//! 2. `Tap` and `DragStart` never both occur for the same touch sequence.
//! 3. `Fling` is only emitted immediately before the `DragEnd` of the same
//!    sequence.

use web_time::Duration;

use crate::geometry::{Point, Velocity};

/// A recognized gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticEvent {
    /// Finger went down and came up without leaving the touch slop.
    Tap { pos: Point },

    /// Finger held still beyond the long-press threshold.
    LongPress { pos: Point, duration: Duration },

    /// Finger left the touch slop.
    DragStart { origin: Point, pos: Point },

    /// Ongoing drag movement.
    DragMove {
        origin: Point,
        current: Point,
        /// Movement since the previous sample.
        delta: (f64, f64),
    },

    /// Finger lifted after a drag.
    DragEnd { origin: Point, end: Point },

    /// The drag ended fast enough to count as a fling.
    Fling { velocity: Velocity },
}

impl SemanticEvent {
    /// Returns true for drag lifecycle events.
    #[must_use]
    pub fn is_drag(&self) -> bool {
        matches!(
            self,
            Self::DragStart { .. } | Self::DragMove { .. } | Self::DragEnd { .. }
        )
    }

    /// Screen position associated with the event, if any.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Tap { pos } | Self::LongPress { pos, .. } | Self::DragStart { pos, .. } => {
                Some(*pos)
            }
            Self::DragMove { current, .. } => Some(*current),
            Self::DragEnd { end, .. } => Some(*end),
            Self::Fling { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_classification() {
        let p = Point::new(1.0, 2.0);
        assert!(SemanticEvent::DragStart { origin: p, pos: p }.is_drag());
        assert!(SemanticEvent::DragEnd { origin: p, end: p }.is_drag());
        assert!(!SemanticEvent::Tap { pos: p }.is_drag());
        assert!(
            !SemanticEvent::Fling {
                velocity: Velocity::ZERO
            }
            .is_drag()
        );
    }

    #[test]
    fn positions() {
        let p = Point::new(3.0, 4.0);
        let q = Point::new(5.0, 6.0);
        assert_eq!(SemanticEvent::Tap { pos: p }.position(), Some(p));
        assert_eq!(
            SemanticEvent::DragMove {
                origin: p,
                current: q,
                delta: (2.0, 2.0)
            }
            .position(),
            Some(q)
        );
        assert_eq!(
            SemanticEvent::Fling {
                velocity: Velocity::new(1.0, 0.0)
            }
            .position(),
            None
        );
    }
}

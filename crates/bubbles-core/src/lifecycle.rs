#![forbid(unsafe_code)]

//! Add and remove sequences.
//!
//! Adding a bubble first nudges the existing ones down by the stacking gap
//! ([`PendingReveal`]); only when the nudge finishes is the new bubble
//! revealed. Removing a bubble plays a [`Closing`] sequence before the
//! window is detached.
//!
//! # Close sequences
//!
//! | Kind       | Used when                         | Ends when                 |
//! |------------|-----------------------------------|---------------------------|
//! | `Collapse` | released on the remove target     | its timeline finishes     |
//! | `Shrink`   | removed by the host               | the scale spring rests at 0 |
//!
//! The collapse timeline carries two labeled cues: `flatten` drops the
//! shadow, `cross_fade` swaps the content for the close icon. The tail of
//! the timeline is the post delay before detaching.

use web_time::Duration;

use crate::animation::{Animation, PlaybackState, Timeline, Tween, ease_out};
use crate::bubble::BubbleKey;
use crate::config::TimingConfig;

pub const FLATTEN: &str = "flatten";
pub const CROSS_FADE: &str = "cross_fade";

// ---------------------------------------------------------------------------
// Reveal
// ---------------------------------------------------------------------------

/// A new bubble waiting for the stacking nudge to finish.
#[derive(Debug, Clone)]
pub struct PendingReveal {
    key: BubbleKey,
    nudge: Tween,
    gap: f64,
    bases: Vec<(BubbleKey, f64)>,
}

impl PendingReveal {
    /// `bases` holds each nudged bubble with its y before the nudge.
    #[must_use]
    pub fn new(key: BubbleKey, bases: Vec<(BubbleKey, f64)>, gap: f64, duration: Duration) -> Self {
        Self {
            key,
            nudge: Tween::progress(duration).easing(ease_out),
            gap,
            bases,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &BubbleKey {
        &self.key
    }

    /// Advance the nudge. Returns `true` once it has finished.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.nudge.tick(dt);
        self.nudge.is_complete()
    }

    /// Jump to the end of the nudge.
    pub fn finish(&mut self) {
        self.nudge.tick(self.nudge.duration());
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.nudge.is_complete()
    }

    /// Current y of every nudged bubble.
    pub fn offsets(&self) -> impl Iterator<Item = (&BubbleKey, f64)> + '_ {
        let shift = self.gap * self.nudge.current();
        self.bases.iter().map(move |(k, y)| (k, y + shift))
    }

    /// Stop nudging `key`, e.g. because it started closing.
    pub fn forget(&mut self, key: &BubbleKey) {
        self.bases.retain(|(k, _)| k != key);
    }
}

// ---------------------------------------------------------------------------
// Closing
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum CloseKind {
    Collapse(Timeline),
    Shrink,
}

/// Visual state produced by one closing step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CloseFrame {
    /// Shadow elevation, while collapsing.
    pub elevation: Option<f32>,
    /// Close icon cross-fade progress, while collapsing.
    pub close_icon: Option<f32>,
    /// The window can be detached.
    pub finished: bool,
}

/// A bubble on its way out.
#[derive(Debug)]
pub struct Closing {
    key: BubbleKey,
    kind: CloseKind,
    notify: bool,
}

impl Closing {
    /// Flatten, cross-fade to the close icon, wait, detach.
    #[must_use]
    pub fn collapse(key: BubbleKey, timing: &TimingConfig, notify: bool) -> Self {
        let mut timeline = Timeline::new()
            .add_labeled(
                FLATTEN,
                Duration::ZERO,
                Tween::progress(Duration::from_millis(timing.close_flatten_ms)),
            )
            .add_labeled(
                CROSS_FADE,
                Duration::from_millis(timing.close_reveal_delay_ms),
                Tween::progress(Duration::from_millis(timing.close_reveal_ms)).easing(ease_out),
            )
            .set_duration(timing.close_sequence());
        timeline.play();
        Self {
            key,
            kind: CloseKind::Collapse(timeline),
            notify,
        }
    }

    /// Scale down to nothing, then detach.
    #[must_use]
    pub fn shrink(key: BubbleKey, notify: bool) -> Self {
        Self {
            key,
            kind: CloseKind::Shrink,
            notify,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &BubbleKey {
        &self.key
    }

    /// Whether the host hears about this removal.
    #[inline]
    #[must_use]
    pub fn notify(&self) -> bool {
        self.notify
    }

    #[must_use]
    pub fn is_collapse(&self) -> bool {
        matches!(self.kind, CloseKind::Collapse(_))
    }

    /// Advance by `dt`. `shrunk` reports whether the bubble's scale spring
    /// has come to rest at zero; only shrink sequences look at it.
    pub fn advance(&mut self, dt: Duration, shrunk: bool) -> CloseFrame {
        match &mut self.kind {
            CloseKind::Shrink => CloseFrame {
                finished: shrunk,
                ..CloseFrame::default()
            },
            CloseKind::Collapse(timeline) => {
                for cue in timeline.advance(dt) {
                    tracing::trace!(key = %self.key, cue, "close cue");
                }
                CloseFrame {
                    elevation: timeline.event_value(FLATTEN).map(|v| 1.0 - v),
                    close_icon: timeline.event_value(CROSS_FADE),
                    finished: timeline.state() == PlaybackState::Finished,
                }
            }
        }
    }
}

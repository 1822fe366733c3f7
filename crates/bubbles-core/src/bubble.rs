#![forbid(unsafe_code)]

//! Bubble identity, flags and per-bubble motion state.
//!
//! A [`Bubble`] owns its three springs (x, y and scale), its content and
//! its [`BubbleController`]. Everything that spans bubbles (ordering,
//! mastership, the chain) lives in the registry and the engine.

use std::fmt;

use bitflags::bitflags;

use crate::animation::{Spring, SpringProfile, SpringStep};
use crate::controller::BubbleController;
use crate::geometry::Point;
use crate::scheduler::TimerHandle;
use crate::surface::WindowHandle;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Caller-chosen bubble identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleKey(String);

impl BubbleKey {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BubbleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BubbleKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for BubbleKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What listeners receive: the key and the window showing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BubbleHandle {
    pub key: BubbleKey,
    pub window: WindowHandle,
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Per-bubble status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BubbleFlags: u16 {
        /// No flags.
        const NONE           = 0;
        /// Leads the chain and receives touch while linked.
        const MASTER         = 1 << 0;
        /// Part of a linked cluster.
        const LINKED         = 1 << 1;
        /// Past the visible limit: hidden and motionless.
        const QUEUED         = 1 << 2;
        /// Being destroyed; swallows touch until detached.
        const DESTROYED      = 1 << 3;
        /// Reveal animation started; accepts touch.
        const REVEALED       = 1 << 4;
        /// Dragged by the user at least once. Disables coasting for good.
        const MANUALLY_MOVED = 1 << 5;
        /// A drag is in progress.
        const DRAGGING       = 1 << 6;
        /// Drifting past the wall after inactivity.
        const COASTING       = 1 << 7;
    }
}

impl Default for BubbleFlags {
    fn default() -> Self {
        Self::NONE
    }
}

/// Snapshot of a bubble's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleState {
    pub key: BubbleKey,
    pub window: WindowHandle,
    pub position: Point,
    pub scale: f64,
    pub flags: BubbleFlags,
    pub stack_index: usize,
}

impl BubbleState {
    #[inline]
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.flags.contains(BubbleFlags::MASTER)
    }

    #[inline]
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.flags.contains(BubbleFlags::QUEUED)
    }

    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(BubbleFlags::DESTROYED)
    }
}

// ---------------------------------------------------------------------------
// Springs
// ---------------------------------------------------------------------------

/// The spring trio driving one bubble.
#[derive(Debug, Clone)]
pub struct BubbleSprings {
    pub x: Spring,
    pub y: Spring,
    pub scale: Spring,
}

impl BubbleSprings {
    /// Springs resting at `pos`, scaled down to nothing until revealed.
    #[must_use]
    pub fn at(pos: Point) -> Self {
        Self {
            x: Spring::resting(pos.x).with_profile(SpringProfile::Follow),
            y: Spring::resting(pos.y).with_profile(SpringProfile::Follow),
            scale: Spring::resting(0.0).with_profile(SpringProfile::Scale),
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x.value(), self.y.value())
    }

    #[must_use]
    pub fn target(&self) -> Point {
        Point::new(self.x.target(), self.y.target())
    }

    pub fn set_profile(&mut self, profile: SpringProfile) {
        self.x.set_profile(profile);
        self.y.set_profile(profile);
    }

    pub fn set_target(&mut self, target: Point) {
        self.x.set_target(target.x);
        self.y.set_target(target.y);
    }

    /// Jump both axes to `pos` and rest there.
    pub fn set_position(&mut self, pos: Point) -> SpringStep {
        self.x
            .set_current_value(pos.x, false)
            .merge(self.y.set_current_value(pos.y, false))
    }

    /// Jump both axes onto their targets.
    pub fn rest(&mut self) -> SpringStep {
        self.x.snap_to_target().merge(self.y.snap_to_target())
    }

    /// Advance the position pair.
    pub fn advance_position(&mut self, dt: web_time::Duration) -> SpringStep {
        self.x.advance(dt).merge(self.y.advance(dt))
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        !self.x.is_at_rest() || !self.y.is_at_rest()
    }

    pub fn destroy(&mut self) {
        self.x.destroy();
        self.y.destroy();
    }
}

// ---------------------------------------------------------------------------
// Bubble
// ---------------------------------------------------------------------------

/// One bubble: identity, window, content and motion.
#[derive(Debug)]
pub struct Bubble<C> {
    key: BubbleKey,
    window: WindowHandle,
    content: C,
    pub(crate) springs: BubbleSprings,
    pub(crate) controller: BubbleController,
    pub(crate) flags: BubbleFlags,
    pub(crate) stack_index: usize,
    /// Position to return to when the cluster unlinks.
    pub(crate) last_unlinked: Point,
    pub(crate) coast_timer: Option<TimerHandle>,
}

impl<C> Bubble<C> {
    #[must_use]
    pub fn new(
        key: BubbleKey,
        window: WindowHandle,
        content: C,
        pos: Point,
        controller: BubbleController,
    ) -> Self {
        Self {
            key,
            window,
            content,
            springs: BubbleSprings::at(pos),
            controller,
            flags: BubbleFlags::NONE,
            stack_index: 0,
            last_unlinked: pos,
            coast_timer: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &BubbleKey {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    #[must_use]
    pub fn handle(&self) -> BubbleHandle {
        BubbleHandle {
            key: self.key.clone(),
            window: self.window,
        }
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &C {
        &self.content
    }

    /// Replace the content, returning the previous one.
    pub fn replace_content(&mut self, content: C) -> C {
        std::mem::replace(&mut self.content, content)
    }

    pub(crate) fn into_content(self) -> C {
        self.content
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        self.springs.position()
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.springs.scale.value()
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> BubbleFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn stack_index(&self) -> usize {
        self.stack_index
    }

    #[inline]
    #[must_use]
    pub fn last_unlinked(&self) -> Point {
        self.last_unlinked
    }

    #[inline]
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.flags.contains(BubbleFlags::MASTER)
    }

    #[inline]
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.flags.contains(BubbleFlags::QUEUED)
    }

    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(BubbleFlags::DESTROYED)
    }

    /// Whether the bubble currently takes touch input, given the cluster's
    /// link state.
    #[must_use]
    pub fn accepts_touch(&self, linked: bool) -> bool {
        self.flags.contains(BubbleFlags::REVEALED)
            && !self.flags.intersects(BubbleFlags::QUEUED | BubbleFlags::DESTROYED)
            && (!linked || self.is_master())
    }

    #[must_use]
    pub fn state(&self) -> BubbleState {
        BubbleState {
            key: self.key.clone(),
            window: self.window,
            position: self.position(),
            scale: self.scale(),
            flags: self.flags,
            stack_index: self.stack_index,
        }
    }
}

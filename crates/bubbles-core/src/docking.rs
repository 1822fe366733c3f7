#![forbid(unsafe_code)]

//! Remove target and resting-position policy.
//!
//! [`RemoveTarget`] is the drop zone near the bottom of the screen.
//! [`DockingPolicy`] decides when a dragged bubble is captured by it, where
//! a released bubble comes to rest against a wall, and how a drifting
//! master is pulled back inside the screen.
//!
//! # Invariants
//!
//! 1. The lock flag only changes through [`DockingPolicy::update_lock`],
//!    and every change is reported exactly once as a [`DockTransition`].
//! 2. Wall targets always lie on [`ScreenBounds`]: x is either `left` or
//!    `right`, y is inside `[top, bottom]`.
//! 3. Magnetism is measured between centers, never between corners.

use web_time::Duration;

use crate::animation::{Spring, SpringProfile, SpringStep};
use crate::config::DockingConfig;
use crate::geometry::{Point, ScreenBounds, ScreenSize};
use crate::surface::WindowHandle;

// ---------------------------------------------------------------------------
// RemoveTarget
// ---------------------------------------------------------------------------

/// The drop zone that destroys bubbles released onto it.
#[derive(Debug, Clone)]
pub struct RemoveTarget {
    center: Point,
    size: f64,
    idle_scale: f64,
    scale: Spring,
    handle: Option<WindowHandle>,
}

impl RemoveTarget {
    /// Place the target on `screen`: horizontally centered, one sixth of
    /// the height above the bottom edge.
    #[must_use]
    pub fn new(screen: ScreenSize, config: &DockingConfig) -> Self {
        Self {
            center: Point::new(screen.width / 2.0, screen.height - screen.height / 6.0),
            size: config.remove_target_size,
            idle_scale: config.remove_target_idle_scale,
            scale: Spring::resting(0.0).with_profile(SpringProfile::RemoveTargetScale),
            handle: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        self.center
    }

    /// Top-left corner of the target's own window.
    #[must_use]
    pub fn window_origin(&self) -> Point {
        self.center.offset(-self.size / 2.0, -self.size / 2.0)
    }

    /// Top-left corner that centers a bubble of `bubble_size` on the target.
    #[must_use]
    pub fn lock_coordinate(&self, bubble_size: f64) -> Point {
        self.center.offset(-bubble_size / 2.0, -bubble_size / 2.0)
    }

    #[must_use]
    pub fn handle(&self) -> Option<WindowHandle> {
        self.handle
    }

    pub fn set_handle(&mut self, handle: Option<WindowHandle>) {
        self.handle = handle;
    }

    /// Current visual scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale.value()
    }

    /// Scale the target is heading for.
    #[must_use]
    pub fn target_scale(&self) -> f64 {
        self.scale.target()
    }

    /// Whether the target is shown or on its way in.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.scale.target() > 0.0
    }

    /// Whether the target is grown under a captured bubble.
    #[must_use]
    pub fn is_grown(&self) -> bool {
        self.scale.target() >= 1.0
    }

    /// Show at idle scale.
    pub fn reveal(&mut self) {
        if !self.is_shown() {
            self.scale.set_target(self.idle_scale);
        }
    }

    /// Scale out to nothing.
    pub fn hide(&mut self) {
        self.scale.set_target(0.0);
    }

    /// Grow to full size under a captured bubble.
    pub fn grow(&mut self) {
        self.scale.set_target(1.0);
    }

    /// Return from grown to idle scale.
    pub fn shrink(&mut self) {
        if self.is_shown() {
            self.scale.set_target(self.idle_scale);
        }
    }

    pub fn advance(&mut self, dt: Duration) -> SpringStep {
        self.scale.advance(dt)
    }

    /// Stop animating and forget the window.
    pub fn destroy(&mut self) {
        self.scale.destroy();
        self.handle = None;
    }
}

// ---------------------------------------------------------------------------
// DockingPolicy
// ---------------------------------------------------------------------------

/// A change of the lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockTransition {
    /// No change.
    None,
    /// The bubble was captured by the remove target.
    Locked,
    /// The bubble escaped the remove target.
    Unlocked,
}

/// Per-axis correction produced by [`DockingPolicy::clamp_to_screen`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClampCorrection {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl ClampCorrection {
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.x.is_none() && self.y.is_none()
    }
}

/// Magnetism, wall snapping and screen clamping.
#[derive(Debug, Clone)]
pub struct DockingPolicy {
    magnetism_radius: f64,
    snap_tolerance: f64,
    wall_displace: f64,
    top_inset: f64,
    bottom_fraction: f64,
    locked: bool,
}

impl DockingPolicy {
    #[must_use]
    pub fn new(config: &DockingConfig) -> Self {
        Self {
            magnetism_radius: config.magnetism_radius,
            snap_tolerance: config.snap_tolerance,
            wall_displace: config.wall_displace,
            top_inset: config.top_inset,
            bottom_fraction: config.bottom_fraction,
            locked: false,
        }
    }

    /// Whether `bubble_center` is within the magnetism radius of
    /// `target_center`.
    #[must_use]
    pub fn is_near_target(&self, bubble_center: Point, target_center: Point) -> bool {
        bubble_center.distance(target_center) <= self.magnetism_radius
    }

    /// Re-evaluate the lock for a bubble centered at `bubble_center`.
    pub fn update_lock(&mut self, bubble_center: Point, target_center: Point) -> DockTransition {
        let near = self.is_near_target(bubble_center, target_center);
        match (self.locked, near) {
            (false, true) => {
                self.locked = true;
                DockTransition::Locked
            }
            (true, false) => {
                self.locked = false;
                DockTransition::Unlocked
            }
            _ => DockTransition::None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Drop the lock without reporting a transition.
    pub fn reset(&mut self) {
        self.locked = false;
    }

    /// If `pos` is within the snap tolerance of `lock`, the exact lock
    /// coordinate to jump to.
    #[must_use]
    pub fn snap_if_at_target(&self, pos: Point, lock: Point) -> Option<Point> {
        (pos.distance(lock) <= self.snap_tolerance).then_some(lock)
    }

    /// Resting limits for a bubble of `bubble_size` on `screen`.
    #[must_use]
    pub fn bounds(&self, screen: ScreenSize, bubble_size: f64) -> ScreenBounds {
        ScreenBounds::new(
            screen,
            bubble_size,
            self.wall_displace,
            self.top_inset,
            self.bottom_fraction,
        )
    }

    /// Resting position after a release without a fling: the nearer side
    /// wall, with y clamped into the vertical limits.
    #[must_use]
    pub fn stick_to_wall(&self, pos: Point, screen: ScreenSize, bubble_size: f64) -> Point {
        let bounds = self.bounds(screen, bubble_size);
        let x = if pos.x > screen.mid_x() {
            bounds.right
        } else {
            bounds.left
        };
        let y = bounds.clamp_y(pos.y).unwrap_or(pos.y);
        Point::new(x, y)
    }

    /// Continuous bound check for a free-moving bubble.
    ///
    /// An axis is corrected when the bubble comes within one bubble size
    /// of the matching screen edge.
    #[must_use]
    pub fn clamp_to_screen(&self, pos: Point, screen: ScreenSize, bubble_size: f64) -> ClampCorrection {
        let bounds = self.bounds(screen, bubble_size);
        let x = if pos.x + bubble_size >= screen.width {
            Some(bounds.right)
        } else if pos.x - bubble_size <= 0.0 {
            Some(bounds.left)
        } else {
            None
        };
        let y = if pos.y + bubble_size >= screen.height {
            Some(bounds.bottom)
        } else if pos.y - bubble_size <= 0.0 {
            Some(bounds.top)
        } else {
            None
        };
        ClampCorrection { x, y }
    }

    /// Coasting target: a quarter bubble further past the nearer wall.
    #[must_use]
    pub fn coast_target(&self, pos: Point, screen: ScreenSize, bubble_size: f64) -> Point {
        let bounds = self.bounds(screen, bubble_size);
        let x = if pos.x > screen.mid_x() {
            bounds.right + bubble_size / 4.0
        } else {
            bounds.left - bubble_size / 4.0
        };
        Point::new(x, pos.y)
    }
}

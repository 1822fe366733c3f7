#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! All coordinates are in physical pixels of the host surface, origin at the
//! top-left corner. Bubble positions refer to the top-left corner of the
//! bubble's window; use [`Point::offset`] with half the bubble size to get
//! its center.

/// A position on the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Translate by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Component-wise difference `self - other`.
    #[inline]
    #[must_use]
    pub fn delta(self, other: Self) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A 2D velocity in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Largest absolute component.
    #[inline]
    #[must_use]
    pub fn max_abs(self) -> f64 {
        self.x.abs().max(self.y.abs())
    }
}

/// Dimensions of the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero, negative or not finite.
    #[must_use]
    pub fn is_degenerate(self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Horizontal midpoint.
    #[inline]
    #[must_use]
    pub fn mid_x(self) -> f64 {
        self.width / 2.0
    }
}

/// Resting limits for a bubble of a given size.
///
/// Bubbles rest partially off-screen at the side walls: `displace` is the
/// fraction of the bubble that stays visible when docked to a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl ScreenBounds {
    /// Compute bounds for `bubble_size` on `screen`.
    ///
    /// `top` is an absolute inset, `bottom_fraction` a fraction of the
    /// screen height.
    #[must_use]
    pub fn new(
        screen: ScreenSize,
        bubble_size: f64,
        displace: f64,
        top: f64,
        bottom_fraction: f64,
    ) -> Self {
        Self {
            left: -(bubble_size * (1.0 - displace)),
            right: screen.width - bubble_size * displace,
            top,
            bottom: screen.height * bottom_fraction,
        }
    }

    /// Clamp `y` into `[top, bottom]`, returning `None` when already inside.
    #[must_use]
    pub fn clamp_y(&self, y: f64) -> Option<f64> {
        if y < self.top {
            Some(self.top)
        } else if y > self.bottom {
            Some(self.bottom)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn delta_and_offset_are_inverse() {
        let a = Point::new(10.0, -4.0);
        let b = a.offset(2.5, 7.0);
        assert_eq!(b.delta(a), (2.5, 7.0));
    }

    #[test]
    fn degenerate_screens() {
        assert!(ScreenSize::new(0.0, 100.0).is_degenerate());
        assert!(ScreenSize::new(100.0, 0.0).is_degenerate());
        assert!(ScreenSize::new(f64::NAN, 100.0).is_degenerate());
        assert!(!ScreenSize::new(1080.0, 1920.0).is_degenerate());
    }

    #[test]
    fn bounds_displace_bubble_off_screen() {
        let bounds = ScreenBounds::new(ScreenSize::new(1000.0, 2000.0), 100.0, 0.7, 25.0, 0.85);
        assert!((bounds.left - -30.0).abs() < 1e-9);
        assert!((bounds.right - 930.0).abs() < 1e-9);
        assert!((bounds.top - 25.0).abs() < 1e-9);
        assert!((bounds.bottom - 1700.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_y_only_when_outside() {
        let bounds = ScreenBounds::new(ScreenSize::new(1000.0, 2000.0), 100.0, 0.7, 25.0, 0.85);
        assert_eq!(bounds.clamp_y(10.0), Some(25.0));
        assert_eq!(bounds.clamp_y(1800.0), Some(1700.0));
        assert_eq!(bounds.clamp_y(500.0), None);
    }
}

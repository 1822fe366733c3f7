#![forbid(unsafe_code)]

//! Host collaborators: the overlay window surface and the content renderer.
//!
//! The engine never draws. It asks a [`WindowSurface`] to create, move and
//! destroy small overlay windows, and hands bubble content to an optional
//! [`ContentRenderer`].
//!
//! # Failure Modes
//!
//! - `move_window` may report [`SurfaceError::AlreadyRemoved`] when the host
//!   tore a window down while an animation was still in flight. The engine
//!   treats this as an expected race: it is logged at debug level and
//!   dropped.
//! - Any other move failure is logged at warn level and dropped.
//! - `create_window` failures propagate to the caller.

use std::fmt;

use crate::geometry::{Point, ScreenSize};

/// Opaque host window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Failures reported by the window surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The window no longer exists on the host.
    AlreadyRemoved(WindowHandle),
    /// The host could not perform the operation.
    Unavailable(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRemoved(handle) => write!(f, "{handle} was already removed"),
            Self::Unavailable(reason) => write!(f, "surface unavailable: {reason}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// The overlay window host.
///
/// The visual hooks have no-op defaults so a host can start with plain
/// window placement.
pub trait WindowSurface {
    /// Create a window with its top-left corner at `(x, y)`.
    fn create_window(&mut self, x: f64, y: f64) -> Result<WindowHandle, SurfaceError>;

    /// Move a window's top-left corner to `(x, y)`.
    fn move_window(&mut self, handle: WindowHandle, x: f64, y: f64) -> Result<(), SurfaceError>;

    /// Remove a window.
    fn destroy_window(&mut self, handle: WindowHandle) -> Result<(), SurfaceError>;

    /// Current screen dimensions.
    fn screen_dimensions(&self) -> ScreenSize;

    /// Scale a window's content about its center.
    fn set_scale(&mut self, _handle: WindowHandle, _scale: f64) {}

    /// Show or hide a window without destroying it.
    fn set_visible(&mut self, _handle: WindowHandle, _visible: bool) {}

    /// Shadow elevation in `[0, 1]`.
    fn set_elevation(&mut self, _handle: WindowHandle, _elevation: f32) {}

    /// Cross-fade from the content to the close icon; `progress` in `[0, 1]`.
    fn show_close_icon(&mut self, _handle: WindowHandle, _progress: f32) {}
}

/// Draws a bubble's content into its window.
pub trait ContentRenderer<C> {
    /// Render `content` into `handle`. Called on add and on in-place update.
    fn render(&mut self, handle: WindowHandle, content: &C);
}

/// Move a window, swallowing failures.
///
/// Returns `true` when the move succeeded.
pub(crate) fn move_quietly<S: WindowSurface + ?Sized>(
    surface: &mut S,
    handle: WindowHandle,
    pos: Point,
) -> bool {
    match surface.move_window(handle, pos.x, pos.y) {
        Ok(()) => true,
        Err(SurfaceError::AlreadyRemoved(h)) => {
            tracing::debug!(handle = %h, "move on removed window ignored");
            false
        }
        Err(e) => {
            tracing::warn!(handle = %handle, error = %e, "window move failed");
            false
        }
    }
}

/// Destroy a window, swallowing failures.
pub(crate) fn destroy_quietly<S: WindowSurface + ?Sized>(surface: &mut S, handle: WindowHandle) {
    match surface.destroy_window(handle) {
        Ok(()) => {}
        Err(SurfaceError::AlreadyRemoved(h)) => {
            tracing::debug!(handle = %h, "window already removed");
        }
        Err(e) => {
            tracing::warn!(handle = %handle, error = %e, "window destroy failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gone;

    impl WindowSurface for Gone {
        fn create_window(&mut self, _x: f64, _y: f64) -> Result<WindowHandle, SurfaceError> {
            Err(SurfaceError::Unavailable("no overlay permission".into()))
        }

        fn move_window(&mut self, handle: WindowHandle, _x: f64, _y: f64) -> Result<(), SurfaceError> {
            Err(SurfaceError::AlreadyRemoved(handle))
        }

        fn destroy_window(&mut self, handle: WindowHandle) -> Result<(), SurfaceError> {
            Err(SurfaceError::AlreadyRemoved(handle))
        }

        fn screen_dimensions(&self) -> ScreenSize {
            ScreenSize::new(100.0, 100.0)
        }
    }

    #[test]
    fn removed_window_races_are_swallowed() {
        let mut surface = Gone;
        assert!(!move_quietly(&mut surface, WindowHandle(1), Point::ZERO));
        destroy_quietly(&mut surface, WindowHandle(1));
    }

    #[test]
    fn default_hooks_are_noops() {
        let mut surface = Gone;
        surface.set_scale(WindowHandle(1), 0.5);
        surface.set_visible(WindowHandle(1), false);
        surface.set_elevation(WindowHandle(1), 0.0);
        surface.show_close_icon(WindowHandle(1), 1.0);
    }

    #[test]
    fn display() {
        assert_eq!(WindowHandle(3).to_string(), "window#3");
        assert_eq!(
            SurfaceError::AlreadyRemoved(WindowHandle(3)).to_string(),
            "window#3 was already removed"
        );
        assert!(Gone.create_window(0.0, 0.0).is_err());
    }
}

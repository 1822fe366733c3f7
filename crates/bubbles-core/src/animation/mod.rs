#![forbid(unsafe_code)]

//! Animation primitives driving bubble motion.
//!
//! - [`spring`]: damped harmonic oscillator used for every position and
//!   scale value, plus the named [`SpringProfile`]s.
//! - [`chain`]: master/slave coupling that lets a linked cluster trail its
//!   master bubble.
//! - [`tween`]: fixed-duration eased interpolation (stack nudges).
//! - [`timeline`]: labeled cues at offsets (close sequence phases).
//!
//! All primitives are advanced explicitly with a `Duration`; nothing here
//! reads the clock.

pub mod chain;
pub mod spring;
pub mod timeline;
pub mod tween;

use web_time::Duration;

pub use chain::{ChainSprings, SpringChain};
pub use spring::{Spring, SpringProfile, SpringStep};
pub use timeline::{PlaybackState, Timeline};
pub use tween::{EasingFn, Tween, ease_in, ease_in_out, ease_out, linear};

/// A time-driven animation.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has finished.
    fn is_complete(&self) -> bool;

    /// Current output value.
    fn value(&self) -> f32;

    /// Return to the initial state.
    fn reset(&mut self);
}

#![forbid(unsafe_code)]

//! Fixed-duration eased interpolation.
//!
//! A [`Tween`] moves from `from` to `to` over a fixed duration. Unlike a
//! spring it always finishes on time, which is what the stacking nudge and
//! the close sequence phases need.
//!
//! # Invariants
//!
//! 1. `value()` (progress) is in `[0.0, 1.0]` and reaches `1.0` exactly when
//!    the duration has elapsed.
//! 2. `current()` equals `from` before the first tick and `to` once complete.
//! 3. A zero duration is clamped to 1ns and completes on the first tick.

use web_time::Duration;

use super::Animation;

/// Easing curve: maps linear progress in `[0, 1]` to eased progress.
pub type EasingFn = fn(f32) -> f32;

#[must_use]
pub fn linear(t: f32) -> f32 {
    t
}

#[must_use]
pub fn ease_in(t: f32) -> f32 {
    t * t
}

#[must_use]
pub fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

#[must_use]
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Eased interpolation between two values.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
    easing: EasingFn,
}

impl Tween {
    #[must_use]
    pub fn new(from: f64, to: f64, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            elapsed: Duration::ZERO,
            easing: linear,
        }
    }

    /// Progress-only tween from 0 to 1.
    #[must_use]
    pub fn progress(duration: Duration) -> Self {
        Self::new(0.0, 1.0, duration)
    }

    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Interpolated value between `from` and `to`.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.from + (self.to - self.from) * f64::from(self.value())
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn raw_progress(&self) -> f32 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        if self.is_complete() {
            return 1.0;
        }
        (self.easing)(self.raw_progress()).clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

#![forbid(unsafe_code)]

//! Damped harmonic oscillator (spring) driving bubble position and scale.
//!
//! Every moving value in the engine (a bubble's x, y and scale, the remove
//! target's scale) is a [`Spring`]:
//!
//!   F = -stiffness × (value - target) - damping × velocity
//!
//! # Parameters
//!
//! - **stiffness** (k): restoring force. Zero is legal and turns the spring
//!   into a pure momentum carrier (see [`SpringProfile::NoTension`]).
//! - **damping** (c): velocity drag.
//! - **rest_threshold** / **velocity_threshold**: how close to the target,
//!   and how slow, the spring must be to count as settled.
//! - **rest_debounce**: number of consecutive advances that must satisfy the
//!   rest condition before the spring reports rest.
//!
//! # Integration
//!
//! Semi-implicit Euler, with large `dt` subdivided into steps of at most
//! 4 ms.
//!
//! # Invariants
//!
//! 1. [`SpringStep::came_to_rest`] is true exactly once per rest transition.
//! 2. On rest the value snaps exactly onto the target. A zero-stiffness
//!    spring has no target to seek, so it adopts its resting value as the
//!    target instead.
//! 3. A destroyed spring never reports updates and ignores all setters.
//! 4. A spring at rest stays at rest until its target, velocity or value is
//!    changed.
//!
//! # Failure Modes
//!
//! - Zero damping with non-zero stiffness oscillates forever and never
//!   comes to rest. Not an error, just a poor profile choice.

use web_time::Duration;


/// Maximum dt per integration step (4ms).
const MAX_STEP_SECS: f64 = 0.004;

/// Default rest threshold in value units (pixels for positions).
const DEFAULT_REST_THRESHOLD: f64 = 0.001;

/// Default velocity threshold in value units per second.
const DEFAULT_VELOCITY_THRESHOLD: f64 = 0.005;

/// Default number of consecutive settled advances required for rest.
const DEFAULT_REST_DEBOUNCE: u32 = 2;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Named stiffness/damping pairs.
///
/// Values are derived from origami-style tension/friction pairs with
/// [`SpringProfile::from_origami`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpringProfile {
    /// Light tension so the bubble follows the finger with momentum.
    Drag,
    /// No restoring force: carries fling momentum until friction stops it.
    NoTension,
    /// Moderate stiffness for wall snapping.
    Fling,
    /// Stiffest, most damped: magnetic lock onto the remove target.
    Snap,
    /// Slow transition for joining or leaving the linked cluster.
    Fly,
    /// Slaves trailing the master.
    Follow,
    /// Bubble scale (reveal, touch feedback, shrink).
    Scale,
    /// Remove target scale.
    RemoveTargetScale,
}

impl SpringProfile {
    /// Origami tension/friction pair for this profile.
    #[must_use]
    pub const fn origami(self) -> (f64, f64) {
        match self {
            Self::Drag => (5.0, 1.8),
            Self::NoTension => (0.0, 1.8),
            Self::Fling => (50.0, 5.0),
            Self::Snap => (100.0, 7.0),
            Self::Fly => (20.0, 5.0),
            Self::Follow | Self::Scale => (40.0, 7.0),
            Self::RemoveTargetScale => (100.0, 9.0),
        }
    }

    /// Convert an origami tension/friction pair into `(stiffness, damping)`.
    ///
    /// A zero input maps to zero so that a tension of 0 really has no
    /// restoring force.
    #[must_use]
    pub fn from_origami(tension: f64, friction: f64) -> (f64, f64) {
        let stiffness = if tension == 0.0 {
            0.0
        } else {
            (tension - 30.0) * 3.62 + 194.0
        };
        let damping = if friction == 0.0 {
            0.0
        } else {
            (friction - 8.0) * 3.0 + 25.0
        };
        (stiffness, damping)
    }

    #[must_use]
    pub fn stiffness(self) -> f64 {
        let (t, f) = self.origami();
        Self::from_origami(t, f).0
    }

    #[must_use]
    pub fn damping(self) -> f64 {
        let (t, f) = self.origami();
        Self::from_origami(t, f).1
    }
}

// ---------------------------------------------------------------------------
// Spring
// ---------------------------------------------------------------------------

/// Result of advancing a spring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpringStep {
    /// The value changed.
    pub updated: bool,
    /// The spring transitioned into rest during this advance.
    pub came_to_rest: bool,
}

impl SpringStep {
    /// Combine two steps (e.g. the x and y springs of one bubble).
    #[inline]
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            updated: self.updated || other.updated,
            came_to_rest: self.came_to_rest || other.came_to_rest,
        }
    }
}

/// A damped harmonic oscillator.
///
/// # Example
///
/// ```
/// use web_time::Duration;
/// use bubbles_core::animation::{Spring, SpringProfile};
///
/// let mut spring = Spring::new(0.0, 100.0).with_profile(SpringProfile::Fling);
/// for _ in 0..240 {
///     spring.advance(Duration::from_millis(16));
/// }
/// assert!(spring.is_at_rest());
/// assert_eq!(spring.value(), 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Spring {
    value: f64,
    velocity: f64,
    target: f64,
    stiffness: f64,
    damping: f64,
    rest_threshold: f64,
    velocity_threshold: f64,
    rest_debounce: u32,
    settled_ticks: u32,
    at_rest: bool,
    destroyed: bool,
}

impl Spring {
    /// Create a spring at `initial` heading for `target`, using the
    /// [`SpringProfile::Follow`] profile.
    #[must_use]
    pub fn new(initial: f64, target: f64) -> Self {
        let profile = SpringProfile::Follow;
        Self {
            value: initial,
            velocity: 0.0,
            target,
            stiffness: profile.stiffness(),
            damping: profile.damping(),
            rest_threshold: DEFAULT_REST_THRESHOLD,
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            rest_debounce: DEFAULT_REST_DEBOUNCE,
            settled_ticks: 0,
            at_rest: (initial - target).abs() <= DEFAULT_REST_THRESHOLD,
            destroyed: false,
        }
    }

    /// A spring resting at `value`.
    #[must_use]
    pub fn resting(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Apply a named profile (builder pattern).
    #[must_use]
    pub fn with_profile(mut self, profile: SpringProfile) -> Self {
        self.set_profile(profile);
        self
    }

    /// Set stiffness (builder pattern). Negative values clamp to zero.
    #[must_use]
    pub fn with_stiffness(mut self, k: f64) -> Self {
        self.stiffness = k.max(0.0);
        self
    }

    /// Set damping (builder pattern). Negative values clamp to zero.
    #[must_use]
    pub fn with_damping(mut self, c: f64) -> Self {
        self.damping = c.max(0.0);
        self
    }

    #[must_use]
    pub fn with_rest_threshold(mut self, threshold: f64) -> Self {
        self.rest_threshold = threshold.abs();
        self
    }

    #[must_use]
    pub fn with_velocity_threshold(mut self, threshold: f64) -> Self {
        self.velocity_threshold = threshold.abs();
        self
    }

    /// Consecutive settled advances required before rest (minimum 1).
    #[must_use]
    pub fn with_rest_debounce(mut self, ticks: u32) -> Self {
        self.rest_debounce = ticks.max(1);
        self
    }

    // -- accessors ---------------------------------------------------------

    /// Current value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    #[inline]
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    #[inline]
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // -- mutation ----------------------------------------------------------

    /// Swap stiffness and damping for a named profile. Does not wake the
    /// spring.
    pub fn set_profile(&mut self, profile: SpringProfile) {
        if self.destroyed {
            return;
        }
        self.stiffness = profile.stiffness();
        self.damping = profile.damping();
    }

    /// Change the target. Wakes the spring unless it already sits on the
    /// new target.
    pub fn set_target(&mut self, target: f64) {
        if self.destroyed {
            return;
        }
        self.target = target;
        if self.at_rest && (self.value - target).abs() <= self.rest_threshold {
            self.value = target;
            return;
        }
        self.wake();
    }

    /// Overwrite the velocity. Wakes the spring when non-zero.
    pub fn set_velocity(&mut self, velocity: f64) {
        if self.destroyed {
            return;
        }
        self.velocity = velocity;
        if velocity != 0.0 {
            self.wake();
        }
    }

    /// Add to the velocity. Wakes the spring.
    pub fn impulse(&mut self, velocity_delta: f64) {
        if self.destroyed {
            return;
        }
        self.velocity += velocity_delta;
        self.wake();
    }

    /// Jump to `value` and rest there.
    ///
    /// The target follows the value and velocity is cleared. The returned
    /// step reports `updated` when the value changed, unless
    /// `skip_listeners` is set.
    pub fn set_current_value(&mut self, value: f64, skip_listeners: bool) -> SpringStep {
        if self.destroyed {
            return SpringStep::default();
        }
        let changed = self.value != value;
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
        self.at_rest = true;
        self.settled_ticks = 0;
        SpringStep {
            updated: changed && !skip_listeners,
            came_to_rest: false,
        }
    }

    /// Settle immediately: the target becomes the current value.
    pub fn set_at_rest(&mut self) {
        if self.destroyed {
            return;
        }
        self.target = self.value;
        self.velocity = 0.0;
        self.at_rest = true;
        self.settled_ticks = 0;
    }

    /// Jump onto the target and rest there.
    pub fn snap_to_target(&mut self) -> SpringStep {
        let target = self.target;
        self.set_current_value(target, false)
    }

    /// Detach from the simulation. Idempotent.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.at_rest = true;
        self.velocity = 0.0;
    }

    fn wake(&mut self) {
        self.at_rest = false;
        self.settled_ticks = 0;
    }

    /// Compute the critical damping coefficient for the current stiffness.
    #[must_use]
    pub fn critical_damping(&self) -> f64 {
        2.0 * self.stiffness.sqrt()
    }

    fn step(&mut self, dt: f64) {
        let displacement = self.value - self.target;
        let acceleration = -self.stiffness * displacement - self.damping * self.velocity;
        self.velocity += acceleration * dt;
        self.value += self.velocity * dt;
    }

    fn is_settled(&self) -> bool {
        let near = self.stiffness == 0.0 || (self.value - self.target).abs() <= self.rest_threshold;
        near && self.velocity.abs() <= self.velocity_threshold
    }

    /// Advance by `dt`, subdividing for stability.
    pub fn advance(&mut self, dt: Duration) -> SpringStep {
        if self.destroyed || self.at_rest {
            return SpringStep::default();
        }
        let total_secs = dt.as_secs_f64();
        if total_secs <= 0.0 {
            return SpringStep::default();
        }

        let before = self.value;
        let mut remaining = total_secs;
        while remaining > 0.0 {
            let step_dt = remaining.min(MAX_STEP_SECS);
            self.step(step_dt);
            remaining -= step_dt;
        }

        let mut step = SpringStep::default();
        if self.is_settled() {
            self.settled_ticks += 1;
            if self.settled_ticks >= self.rest_debounce {
                if self.stiffness == 0.0 {
                    self.target = self.value;
                } else {
                    self.value = self.target;
                }
                self.velocity = 0.0;
                self.at_rest = true;
                self.settled_ticks = 0;
                step.came_to_rest = true;
            }
        } else {
            self.settled_ticks = 0;
        }
        step.updated = self.value != before;
        step
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_16: Duration = Duration::from_millis(16);

    fn simulate(spring: &mut Spring, frames: usize) -> (usize, usize) {
        let mut updates = 0;
        let mut rests = 0;
        for _ in 0..frames {
            let step = spring.advance(MS_16);
            updates += usize::from(step.updated);
            rests += usize::from(step.came_to_rest);
        }
        (updates, rests)
    }

    #[test]
    fn origami_conversion_matches_known_pairs() {
        assert!((SpringProfile::Fling.stiffness() - 266.4).abs() < 1e-9);
        assert!((SpringProfile::Fling.damping() - 16.0).abs() < 1e-9);
        assert!((SpringProfile::Fly.stiffness() - 157.8).abs() < 1e-9);
        assert!((SpringProfile::Drag.stiffness() - 103.5).abs() < 1e-9);
        assert!((SpringProfile::Drag.damping() - 6.4).abs() < 1e-9);
        assert!((SpringProfile::Snap.stiffness() - 447.4).abs() < 1e-9);
        assert!((SpringProfile::Snap.damping() - 22.0).abs() < 1e-9);
        assert_eq!(SpringProfile::NoTension.stiffness(), 0.0);
        assert!((SpringProfile::RemoveTargetScale.damping() - 28.0).abs() < 1e-9);
    }

    #[test]
    fn profile_ordering() {
        use SpringProfile::*;
        for p in [Fling, Fly, Drag] {
            assert!(Snap.stiffness() > p.stiffness(), "{p:?}");
            assert!(Snap.damping() > p.damping(), "{p:?}");
        }
        assert!(Fly.stiffness() < Fling.stiffness());
        assert!(Fly.stiffness() < Snap.stiffness());
        assert!(Drag.damping() <= Fling.damping());
    }

    #[test]
    fn spring_reaches_target_exactly() {
        let mut spring = Spring::new(0.0, 100.0).with_profile(SpringProfile::Fling);
        let (_, rests) = simulate(&mut spring, 400);
        assert!(spring.is_at_rest());
        assert_eq!(spring.value(), 100.0);
        assert_eq!(rests, 1);
    }

    #[test]
    fn rest_reported_once_per_transition() {
        let mut spring = Spring::new(0.0, 10.0).with_profile(SpringProfile::Snap);
        let (_, rests) = simulate(&mut spring, 300);
        assert_eq!(rests, 1);

        spring.set_target(50.0);
        assert!(!spring.is_at_rest());
        let (_, rests) = simulate(&mut spring, 300);
        assert_eq!(rests, 1);
        assert_eq!(spring.value(), 50.0);
    }

    #[test]
    fn debounce_delays_rest() {
        let mut spring = Spring::new(0.0, 0.0).with_rest_debounce(3);
        spring.set_velocity(0.001);
        assert!(!spring.advance(MS_16).came_to_rest);
        assert!(!spring.advance(MS_16).came_to_rest);
        assert!(spring.advance(MS_16).came_to_rest);
    }

    #[test]
    fn no_tension_coasts_and_adopts_value() {
        let mut spring = Spring::resting(0.0).with_profile(SpringProfile::NoTension);
        spring.set_velocity(640.0);
        simulate(&mut spring, 1000);
        assert!(spring.is_at_rest());
        // Momentum carries roughly v / damping.
        assert!((spring.value() - 100.0).abs() < 5.0, "value: {}", spring.value());
        assert_eq!(spring.target(), spring.value());
    }

    #[test]
    fn set_current_value_rests_immediately() {
        let mut spring = Spring::new(0.0, 100.0);
        let step = spring.set_current_value(42.0, false);
        assert!(step.updated);
        assert!(spring.is_at_rest());
        assert_eq!(spring.target(), 42.0);
        assert_eq!(spring.velocity(), 0.0);

        let step = spring.set_current_value(43.0, true);
        assert!(!step.updated);
        assert_eq!(spring.value(), 43.0);
    }

    #[test]
    fn set_target_same_value_stays_at_rest() {
        let mut spring = Spring::resting(5.0);
        spring.set_target(5.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn destroyed_spring_is_inert() {
        let mut spring = Spring::new(0.0, 100.0);
        spring.destroy();
        spring.destroy();
        spring.set_target(10.0);
        spring.set_velocity(5.0);
        assert_eq!(spring.advance(MS_16), SpringStep::default());
        assert_eq!(spring.value(), 0.0);
        assert!(spring.is_destroyed());
    }

    #[test]
    fn zero_dt_noop() {
        let mut spring = Spring::new(0.0, 1.0);
        assert_eq!(spring.advance(Duration::ZERO), SpringStep::default());
        assert_eq!(spring.value(), 0.0);
    }

    #[test]
    fn large_dt_subdivided() {
        let mut spring = Spring::new(0.0, 1.0).with_profile(SpringProfile::Snap);
        spring.advance(Duration::from_secs(5));
        assert!((spring.value() - 1.0).abs() < 0.01, "value: {}", spring.value());
    }

    #[test]
    fn updates_reported_while_moving() {
        let mut spring = Spring::new(0.0, 100.0).with_profile(SpringProfile::Fly);
        let (updates, _) = simulate(&mut spring, 10);
        assert_eq!(updates, 10);
    }

    #[test]
    fn impulse_adds_to_velocity_and_wakes() {
        let mut spring = Spring::resting(10.0).with_profile(SpringProfile::Snap);
        spring.impulse(300.0);
        spring.impulse(-100.0);
        assert_eq!(spring.velocity(), 200.0);
        assert!(!spring.is_at_rest());
        assert!(spring.advance(MS_16).updated);
        assert!(spring.value() > 10.0);

        simulate(&mut spring, 400);
        assert!(spring.is_at_rest());
        assert_eq!(spring.value(), 10.0);
    }

    #[test]
    fn impulse_on_destroyed_spring_is_ignored() {
        let mut spring = Spring::resting(0.0);
        spring.destroy();
        spring.impulse(50.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn merge_ors_flags() {
        let a = SpringStep {
            updated: true,
            came_to_rest: false,
        };
        let b = SpringStep {
            updated: false,
            came_to_rest: true,
        };
        assert_eq!(
            a.merge(b),
            SpringStep {
                updated: true,
                came_to_rest: true
            }
        );
    }
}

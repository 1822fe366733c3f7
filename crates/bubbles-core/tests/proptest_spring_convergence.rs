//! Property-based tests for damped springs.
//!
//! 1. Any damped spring comes to rest exactly on its target
//! 2. Values stay finite for every frame length the engine may see
//! 3. Retargeting mid-flight still converges to the last target
//! 4. A zero-tension spring rests wherever its velocity runs out

use bubbles_core::animation::{Spring, SpringProfile};
use proptest::prelude::*;
use web_time::Duration;

const FRAME: Duration = Duration::from_millis(16);
const MAX_FRAMES: usize = 5000;

fn run_to_rest(spring: &mut Spring) -> usize {
    let mut frames = 0;
    while !spring.is_at_rest() && frames < MAX_FRAMES {
        spring.advance(FRAME);
        frames += 1;
    }
    frames
}

fn profile_strategy() -> impl Strategy<Value = SpringProfile> {
    prop_oneof![
        Just(SpringProfile::Drag),
        Just(SpringProfile::Fling),
        Just(SpringProfile::Snap),
        Just(SpringProfile::Fly),
        Just(SpringProfile::Follow),
        Just(SpringProfile::Scale),
        Just(SpringProfile::RemoveTargetScale),
    ]
}

// ── 1. Convergence ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn damped_spring_rests_on_target(
        from in -2000.0f64..2000.0,
        to in -2000.0f64..2000.0,
        stiffness in 20.0f64..500.0,
        damping in 5.0f64..40.0,
    ) {
        let mut spring = Spring::new(from, to)
            .with_stiffness(stiffness)
            .with_damping(damping);
        let frames = run_to_rest(&mut spring);
        prop_assert!(frames < MAX_FRAMES, "no rest after {frames} frames");
        prop_assert_eq!(spring.value(), to);
        prop_assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn named_profiles_converge(
        profile in profile_strategy(),
        from in -1000.0f64..1000.0,
        to in -1000.0f64..1000.0,
    ) {
        let mut spring = Spring::new(from, to).with_profile(profile);
        let frames = run_to_rest(&mut spring);
        prop_assert!(frames < MAX_FRAMES, "{profile:?} never rested");
        prop_assert_eq!(spring.value(), to);
    }
}

// ── 2. Stability ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn long_frames_stay_finite(
        profile in profile_strategy(),
        to in -1000.0f64..1000.0,
        frame_ms in 1u64..250,
    ) {
        let mut spring = Spring::new(0.0, to).with_profile(profile);
        for _ in 0..200 {
            spring.advance(Duration::from_millis(frame_ms));
            prop_assert!(spring.value().is_finite());
            prop_assert!(spring.velocity().is_finite());
        }
    }
}

// ── 3. Retargeting ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn retargeting_converges_to_last_target(
        targets in prop::collection::vec(-1500.0f64..1500.0, 1..8),
        frames_between in 1usize..30,
    ) {
        let mut spring = Spring::resting(0.0).with_profile(SpringProfile::Fling);
        for t in &targets {
            spring.set_target(*t);
            for _ in 0..frames_between {
                spring.advance(FRAME);
            }
        }
        run_to_rest(&mut spring);
        prop_assert!(spring.is_at_rest());
        prop_assert_eq!(spring.value(), *targets.last().unwrap());
    }
}

// ── 4. Zero tension ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_tension_rests_where_it_stops(
        start in -500.0f64..500.0,
        velocity in -20000.0f64..20000.0,
    ) {
        let mut spring = Spring::resting(start).with_profile(SpringProfile::NoTension);
        spring.set_velocity(velocity);
        run_to_rest(&mut spring);
        prop_assert!(spring.is_at_rest());
        prop_assert_eq!(spring.target(), spring.value());
        if velocity > 1.0 {
            prop_assert!(spring.value() > start);
        } else if velocity < -1.0 {
            prop_assert!(spring.value() < start);
        }
    }
}

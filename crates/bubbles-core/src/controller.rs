#![forbid(unsafe_code)]

//! Per-bubble interaction state machine.
//!
//! [`BubbleController`] turns one bubble's touch stream into spring moves
//! and [`Outcome`]s for the engine. It owns the gesture recognizer and the
//! movement tracker; the springs, the docking policy and the remove target
//! are lent to it for the duration of one event through [`TouchContext`].
//!
//! # State Machine
//!
//! ```text
//! Idle --down--> TouchDown --slop--> Free <--radius--> NearTarget
//!                    |                 |                   |
//!                   up                up                  up
//!                    v                 v                   v
//!                  Idle     Released -> Idle           Destroyed
//! ```
//!
//! # Invariants
//!
//! 1. `Destroyed` is terminal: every later event is swallowed.
//! 2. While `Free` the bubble tracks the finger through
//!    `set_current_value`, never through a spring target.
//! 3. While `NearTarget` both axes use the snap profile toward the lock
//!    coordinate.
//! 4. A tap never moves the bubble.

use web_time::Instant;

use crate::animation::SpringProfile;
use crate::bubble::BubbleSprings;
use crate::config::GestureConfig;
use crate::docking::{DockTransition, DockingPolicy, RemoveTarget};
use crate::event::{TouchEvent, TouchPhase};
use crate::geometry::{Point, ScreenSize};
use crate::gesture::GestureRecognizer;
use crate::movement::{MovementTracker, TouchSample, interpolate_x_velocity};
use crate::semantic_event::SemanticEvent;

/// Where a bubble is in its touch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    TouchDown,
    Free,
    NearTarget,
    /// Transient while a release is handled.
    Released,
    /// Terminal.
    Destroyed,
}

/// What a touch event meant for the cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Clicked,
    LongPressed,
    DragStarted,
    LockedToTarget,
    ReleasedFromTarget,
    /// Released on the remove target.
    Destroy,
    /// Released on the remove target after the close-all delay.
    CloseAll,
    /// A drag ended away from the remove target.
    Released { flung: bool },
}

/// Everything a controller borrows while handling one event.
#[derive(Debug)]
pub struct TouchContext<'a> {
    pub screen: ScreenSize,
    pub bubble_size: f64,
    pub touch_down_scale: f64,
    pub horizontal_fling_factor: f64,
    pub close_all_armed: bool,
    pub docking: &'a mut DockingPolicy,
    pub remove_target: &'a mut RemoveTarget,
}

/// Interaction state machine for one bubble.
#[derive(Debug)]
pub struct BubbleController {
    state: InteractionState,
    gesture: GestureRecognizer,
    movement: MovementTracker,
    /// Window position at touch down.
    origin: Point,
}

impl BubbleController {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        let history = config.history_len;
        Self {
            state: InteractionState::Idle,
            gesture: GestureRecognizer::new(config),
            movement: MovementTracker::new(history),
            origin: Point::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Window position recorded at the last touch down.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Point {
        self.origin
    }

    #[must_use]
    pub fn is_touching(&self) -> bool {
        matches!(
            self.state,
            InteractionState::TouchDown | InteractionState::Free | InteractionState::NearTarget
        )
    }

    /// Enter the terminal state. Idempotent.
    pub fn mark_destroyed(&mut self) {
        self.state = InteractionState::Destroyed;
        self.gesture.reset();
    }

    /// Report a long press once the finger has been held long enough.
    pub fn check_long_press(&mut self, now: Instant) -> Option<Outcome> {
        if self.state != InteractionState::TouchDown {
            return None;
        }
        self.gesture
            .check_long_press(now)
            .map(|_| Outcome::LongPressed)
    }

    /// Handle one touch event.
    pub fn handle_touch(
        &mut self,
        event: &TouchEvent,
        springs: &mut BubbleSprings,
        ctx: &mut TouchContext<'_>,
    ) -> Vec<Outcome> {
        if self.state == InteractionState::Destroyed {
            return Vec::new();
        }
        let sample = TouchSample::new(event.pos, event.time);
        let mut out = Vec::new();
        match event.phase {
            TouchPhase::Down => {
                self.state = InteractionState::TouchDown;
                self.origin = springs.position();
                self.movement.on_down(sample);
                self.gesture.process(event);
                springs.scale.set_target(ctx.touch_down_scale);
            }
            TouchPhase::Move => {
                if !self.is_touching() {
                    return out;
                }
                self.movement.add_movement(sample);
                for semantic in self.gesture.process(event) {
                    self.on_move_event(semantic, springs, ctx, &mut out);
                }
            }
            TouchPhase::Up | TouchPhase::Cancel => {
                if !self.is_touching() {
                    return out;
                }
                self.movement.on_up(sample);
                let semantics = self.gesture.process(event);
                self.on_release(event, &semantics, springs, ctx, &mut out);
            }
        }
        out
    }

    fn on_move_event(
        &mut self,
        semantic: SemanticEvent,
        springs: &mut BubbleSprings,
        ctx: &mut TouchContext<'_>,
        out: &mut Vec<Outcome>,
    ) {
        match semantic {
            SemanticEvent::DragStart { .. } => {
                self.state = InteractionState::Free;
                ctx.remove_target.reveal();
                out.push(Outcome::DragStarted);
            }
            SemanticEvent::DragMove {
                origin, current, ..
            } => {
                let (dx, dy) = current.delta(origin);
                let target = self.origin.offset(dx, dy);
                let half = ctx.bubble_size / 2.0;
                let lock = ctx.remove_target.lock_coordinate(ctx.bubble_size);
                let transition = ctx
                    .docking
                    .update_lock(target.offset(half, half), ctx.remove_target.center());

                if ctx.docking.is_locked() {
                    self.state = InteractionState::NearTarget;
                    if transition == DockTransition::Locked {
                        springs.set_profile(SpringProfile::Snap);
                        springs.set_target(lock);
                        springs.scale.set_target(1.0);
                        ctx.remove_target.grow();
                        out.push(Outcome::LockedToTarget);
                    }
                    return;
                }

                self.state = InteractionState::Free;
                if transition == DockTransition::Unlocked {
                    springs.scale.set_target(ctx.touch_down_scale);
                    ctx.remove_target.shrink();
                    out.push(Outcome::ReleasedFromTarget);
                }
                springs.set_profile(SpringProfile::Drag);
                springs.set_position(target);
            }
            _ => {}
        }
    }

    fn on_release(
        &mut self,
        event: &TouchEvent,
        semantics: &[SemanticEvent],
        springs: &mut BubbleSprings,
        ctx: &mut TouchContext<'_>,
        out: &mut Vec<Outcome>,
    ) {
        let previous = self.state;
        self.state = InteractionState::Released;
        springs.scale.set_target(1.0);

        match previous {
            InteractionState::NearTarget => {
                ctx.docking.reset();
                ctx.remove_target.hide();
                self.state = InteractionState::Destroyed;
                out.push(if ctx.close_all_armed {
                    Outcome::CloseAll
                } else {
                    Outcome::Destroy
                });
                return;
            }
            InteractionState::Free => {
                ctx.remove_target.hide();
                let fling = semantics.iter().find_map(|s| match s {
                    SemanticEvent::Fling { velocity } => Some(*velocity),
                    _ => None,
                });
                if let Some(raw) = fling {
                    let v = self.movement.corrected_or_raw(raw);
                    let vx = interpolate_x_velocity(
                        v.x,
                        event.pos.x,
                        ctx.screen.width,
                        ctx.screen.width * ctx.horizontal_fling_factor,
                    );
                    tracing::trace!(vx, vy = v.y, "fling");
                    springs.set_profile(SpringProfile::NoTension);
                    springs.x.set_velocity(vx);
                    springs.y.set_velocity(v.y);
                } else {
                    let rest =
                        ctx.docking
                            .stick_to_wall(springs.position(), ctx.screen, ctx.bubble_size);
                    springs.set_profile(SpringProfile::Fling);
                    springs.set_target(rest);
                }
                out.push(Outcome::Released {
                    flung: fling.is_some(),
                });
            }
            _ => {
                if semantics
                    .iter()
                    .any(|s| matches!(s, SemanticEvent::Tap { .. }))
                {
                    out.push(Outcome::Clicked);
                }
            }
        }
        self.state = InteractionState::Idle;
    }
}

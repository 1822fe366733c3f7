#![forbid(unsafe_code)]

//! The bubble engine: one context object owning the cluster.
//!
//! [`Engine`] is constructed by [`Engine::init`] and torn down by
//! [`Engine::shutdown`]. It owns the registry, the spring chain, the
//! docking policy, the remove target and the timer scheduler, and talks
//! to the host through a [`WindowSurface`], an optional
//! [`ContentRenderer`] and an optional [`BubbleListener`].
//!
//! # Tick order
//!
//! 1. Due timers (close-all arming, coasting) and long presses.
//! 2. The stacking nudge of a pending reveal.
//! 3. Master springs, the master's continuous bound clamp, then chain
//!    propagation.
//! 4. Every other bubble's springs, clamped too while unlinked.
//! 5. Window moves for every bubble whose position changed.
//! 6. Close sequences; finished bubbles are detached.
//! 7. The remove target's scale.
//! 8. Event dispatch.
//!
//! Slaves never read a stale master position: the chain is updated from
//! the master's new value before any slave spring advances.
//!
//! # Invariants
//!
//! 1. While any bubble exists exactly one of them is master.
//! 2. Listener callbacks run only from the dispatch step, once per
//!    public call, never while engine state is borrowed.
//! 3. A bubble marked destroyed swallows touch until it is detached.
//! 4. Every `Destroyed` event is emitted exactly once per bubble, after its
//!    window is gone.
//!
//! # Failure Modes
//!
//! - Window moves that fail are logged and dropped (see
//!   [`surface`](crate::surface)).
//! - Calls after `shutdown` return [`EngineError::NotInitialized`].

use std::fmt;

use web_time::{Duration, Instant};

use crate::animation::{ChainSprings, SpringChain, SpringProfile};
use crate::bubble::{Bubble, BubbleFlags, BubbleHandle, BubbleKey, BubbleState};
use crate::config::EngineConfig;
use crate::controller::{BubbleController, InteractionState, Outcome, TouchContext};
use crate::docking::{DockingPolicy, RemoveTarget};
use crate::error::{EngineError, Result};
use crate::event::{TouchEvent, TouchPhase};
use crate::geometry::{Point, ScreenSize};
use crate::lifecycle::{Closing, PendingReveal};
use crate::registry::BubbleRegistry;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::surface::{ContentRenderer, WindowSurface, destroy_quietly, move_quietly};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Receives cluster events. Every method defaults to a no-op.
pub trait BubbleListener {
    fn on_bubble_clicked(&mut self, _handle: &BubbleHandle) {}

    fn on_bubble_destroyed(&mut self, _handle: &BubbleHandle, _is_last: bool) {}

    fn on_bubble_long_pressed(&mut self, _handle: &BubbleHandle) {}
}

/// A queued listener notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BubbleEvent {
    Clicked(BubbleHandle),
    LongPressed(BubbleHandle),
    Destroyed { handle: BubbleHandle, is_last: bool },
}

impl BubbleEvent {
    fn deliver(&self, listener: &mut dyn BubbleListener) {
        match self {
            Self::Clicked(handle) => listener.on_bubble_clicked(handle),
            Self::LongPressed(handle) => listener.on_bubble_long_pressed(handle),
            Self::Destroyed { handle, is_last } => listener.on_bubble_destroyed(handle, *is_last),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimerTask {
    /// The master has been held on the remove target long enough.
    CloseAllArmed,
    /// An idle master drifts past the wall.
    Coast(BubbleKey),
}

// ---------------------------------------------------------------------------
// Chain access
// ---------------------------------------------------------------------------

struct RegistrySprings<'a, C>(&'a mut BubbleRegistry<C>);

impl<C> ChainSprings<BubbleKey> for RegistrySprings<'_, C> {
    fn position(&self, key: &BubbleKey) -> Option<Point> {
        self.0.get(key).map(Bubble::position)
    }

    fn set_target(&mut self, key: &BubbleKey, target: Point) {
        if let Some(b) = self.0.get_mut(key) {
            b.springs.set_target(target);
        }
    }

    fn rest(&mut self, key: &BubbleKey) {
        if let Some(b) = self.0.get_mut(key) {
            b.springs.rest();
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns and animates a cluster of bubbles with content of type `C`.
pub struct Engine<S: WindowSurface, C> {
    config: EngineConfig,
    surface: S,
    screen: ScreenSize,
    registry: BubbleRegistry<C>,
    chain: SpringChain<BubbleKey>,
    docking: DockingPolicy,
    remove_target: RemoveTarget,
    scheduler: Scheduler<TimerTask>,
    reveal: Option<PendingReveal>,
    closing: Vec<Closing>,
    linked: bool,
    /// Master window position at its last touch down.
    master_down: Option<Point>,
    /// Master position the chain was last propagated from.
    propagated: Option<Point>,
    close_all_timer: Option<TimerHandle>,
    close_all_armed: bool,
    listener: Option<Box<dyn BubbleListener>>,
    renderer: Option<Box<dyn ContentRenderer<C>>>,
    events: Vec<BubbleEvent>,
    last_tick: Option<Instant>,
    running: bool,
}

impl<S: WindowSurface + fmt::Debug, C> fmt::Debug for Engine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("surface", &self.surface)
            .field("screen", &self.screen)
            .field("bubbles", &self.registry.keys())
            .field("master", &self.registry.master_key())
            .field("linked", &self.linked)
            .field("closing", &self.closing.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl<S: WindowSurface, C> Engine<S, C> {
    /// Start an engine on `surface`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`] when `config` fails validation.
    /// - [`EngineError::InvalidScreen`] when the surface reports zero or
    ///   non-finite dimensions.
    /// - [`EngineError::Surface`] when the remove target window cannot be
    ///   created.
    pub fn init(config: EngineConfig, mut surface: S) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(EngineError::InvalidConfig(problems));
        }
        let screen = surface.screen_dimensions();
        if screen.is_degenerate() {
            return Err(EngineError::InvalidScreen {
                width: screen.width,
                height: screen.height,
            });
        }

        let mut remove_target = RemoveTarget::new(screen, &config.docking);
        let origin = remove_target.window_origin();
        let handle = surface.create_window(origin.x, origin.y)?;
        surface.set_scale(handle, 0.0);
        remove_target.set_handle(Some(handle));

        let chain = SpringChain::new(
            screen.width,
            config.bubble.max_visible,
            config.bubble.chain_x_step,
            config.bubble.chain_y_step,
        );
        tracing::debug!(width = screen.width, height = screen.height, "bubble engine started");

        Ok(Self {
            docking: DockingPolicy::new(&config.docking),
            linked: config.bubble.linked_on_start,
            config,
            surface,
            screen,
            registry: BubbleRegistry::new(),
            chain,
            remove_target,
            scheduler: Scheduler::new(),
            reveal: None,
            closing: Vec::new(),
            master_down: None,
            propagated: None,
            close_all_timer: None,
            close_all_armed: false,
            listener: None,
            renderer: None,
            events: Vec::new(),
            last_tick: None,
            running: true,
        })
    }

    /// Tear down every bubble without callbacks, then the remove target.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.teardown_bubbles();
        if let Some(handle) = self.remove_target.handle() {
            destroy_quietly(&mut self.surface, handle);
        }
        self.remove_target.destroy();
        self.scheduler.clear();
        self.events.clear();
        self.running = false;
        tracing::debug!("bubble engine shut down");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn BubbleListener>) {
        self.listener = Some(listener);
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn ContentRenderer<C>>) {
        self.renderer = Some(renderer);
    }

    // -- accessors ---------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    #[must_use]
    pub fn bubble_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn bubble(&self, key: &BubbleKey) -> Option<BubbleState> {
        self.registry.get(key).map(Bubble::state)
    }

    #[must_use]
    pub fn content(&self, key: &BubbleKey) -> Option<&C> {
        self.registry.get(key).map(Bubble::content)
    }

    /// Keys in stacking order, most recent first.
    #[must_use]
    pub fn keys(&self) -> &[BubbleKey] {
        self.registry.keys()
    }

    #[must_use]
    pub fn master_key(&self) -> Option<&BubbleKey> {
        self.registry.master_key()
    }

    /// Master window position at its last touch down.
    #[must_use]
    pub fn master_down(&self) -> Option<Point> {
        self.master_down
    }

    #[must_use]
    pub fn chain(&self) -> &SpringChain<BubbleKey> {
        &self.chain
    }

    #[must_use]
    pub fn registry(&self) -> &BubbleRegistry<C> {
        &self.registry
    }

    #[must_use]
    pub fn remove_target(&self) -> &RemoveTarget {
        &self.remove_target
    }

    #[must_use]
    pub fn is_close_all_armed(&self) -> bool {
        self.close_all_armed
    }

    #[must_use]
    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Whether no bubble is moving, scaling, revealing or closing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.reveal.is_none()
            && self.closing.is_empty()
            && self.remove_target.scale() == self.remove_target.target_scale()
            && self
                .registry
                .iter()
                .all(|b| !b.springs.is_moving() && b.springs.scale.is_at_rest())
    }

    // -- cluster operations ------------------------------------------------

    /// Add a bubble, or update the content of an existing one.
    ///
    /// A new bubble becomes master and is revealed once the existing
    /// bubbles have been nudged out of the way.
    ///
    /// # Errors
    ///
    /// - [`EngineError::EmptyKey`] for an empty key.
    /// - [`EngineError::BubbleDestroyed`] when the key is closing.
    /// - [`EngineError::Surface`] when the window cannot be created.
    pub fn add_bubble(
        &mut self,
        key: impl Into<BubbleKey>,
        content: C,
        now: Instant,
    ) -> Result<BubbleHandle> {
        self.ensure_running()?;
        let key = key.into();
        if key.is_empty() {
            return Err(EngineError::EmptyKey);
        }

        if let Some(b) = self.registry.get_mut(&key) {
            if b.is_destroyed() {
                return Err(EngineError::BubbleDestroyed(key));
            }
            b.replace_content(content);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.render(b.window(), b.content());
            }
            tracing::debug!(key = %key, "bubble updated");
            return Ok(b.handle());
        }

        self.finish_reveal();
        let had_bubbles = !self.registry.is_empty();
        let spawn = self.spawn_point();
        let window = self.surface.create_window(spawn.x, spawn.y)?;
        self.surface.set_scale(window, 0.0);

        let mut bubble = Bubble::new(
            key.clone(),
            window,
            content,
            spawn,
            BubbleController::new(self.config.gesture.clone()),
        );
        bubble.flags.set(BubbleFlags::LINKED, self.linked);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(window, bubble.content());
        }
        let handle = bubble.handle();

        let bases = if self.linked {
            Vec::new()
        } else {
            self.registry
                .iter()
                .filter(|b| !b.is_destroyed() && !b.is_queued() && !b.springs.is_moving())
                .map(|b| (b.key().clone(), b.position().y))
                .collect()
        };

        self.registry.insert(bubble);
        self.registry.set_master(&key);
        self.rebuild_chain();

        if had_bubbles {
            self.reveal = Some(PendingReveal::new(
                key.clone(),
                bases,
                self.config.bubble.stacking_gap,
                self.config.timing.nudge(),
            ));
        } else {
            self.reveal_now(&key);
        }
        self.schedule_coast(&key, now);
        tracing::debug!(key = %key, count = self.registry.len(), "bubble added");
        self.dispatch();
        Ok(handle)
    }

    /// Close a bubble. The listener hears about it once the close
    /// animation has finished.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownBubble`] or [`EngineError::BubbleDestroyed`].
    pub fn remove_bubble(&mut self, key: &BubbleKey) -> Result<()> {
        self.ensure_running()?;
        let Some(b) = self.registry.get(key) else {
            return Err(EngineError::UnknownBubble(key.clone()));
        };
        if b.is_destroyed() {
            return Err(EngineError::BubbleDestroyed(key.clone()));
        }
        self.begin_destroy(key, false, true);
        self.dispatch();
        Ok(())
    }

    /// Close the bubble at stack `index` (0 is the most recent).
    ///
    /// # Errors
    ///
    /// [`EngineError::IndexOutOfRange`], or any error of
    /// [`remove_bubble`](Self::remove_bubble).
    pub fn remove_bubble_at(&mut self, index: usize) -> Result<()> {
        self.ensure_running()?;
        let Some(key) = self.registry.key_at(index).cloned() else {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: self.registry.len(),
            });
        };
        self.remove_bubble(&key)
    }

    /// Drop every bubble immediately, without animations or callbacks.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotInitialized`] after shutdown.
    pub fn remove_all(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.teardown_bubbles();
        Ok(())
    }

    fn teardown_bubbles(&mut self) {
        let bubbles = self.registry.drain();
        let count = bubbles.len();
        for mut b in bubbles {
            self.scheduler.cancel_slot(&mut b.coast_timer);
            destroy_quietly(&mut self.surface, b.window());
        }
        self.closing.clear();
        self.reveal = None;
        self.chain.clear();
        self.chain.enable_displacement();
        self.docking.reset();
        self.remove_target.hide();
        self.scheduler.cancel_slot(&mut self.close_all_timer);
        self.close_all_armed = false;
        self.master_down = None;
        self.propagated = None;
        tracing::debug!(count, "all bubbles removed");
    }

    /// Link the cluster into a trailing stack behind the master, or release
    /// every bubble back to where it was before linking.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotInitialized`] after shutdown.
    pub fn set_linked(&mut self, linked: bool) -> Result<()> {
        self.ensure_running()?;
        if self.linked == linked {
            return Ok(());
        }
        self.linked = linked;
        for b in self.registry.values_mut() {
            b.flags.set(BubbleFlags::LINKED, linked);
        }

        if linked {
            for b in self.registry.values_mut() {
                if !b.is_destroyed() {
                    b.last_unlinked = b.position();
                }
            }
            self.rebuild_chain();
            for key in self.chain.slaves() {
                if let Some(b) = self.registry.get_mut(key) {
                    b.springs.set_profile(SpringProfile::Fly);
                }
            }
            self.propagate_chain();
        } else {
            self.chain.clear();
            for b in self.registry.values_mut() {
                if b.is_master() || b.is_destroyed() || b.is_queued() {
                    continue;
                }
                b.springs.set_profile(SpringProfile::Fly);
                b.springs.set_target(b.last_unlinked);
            }
        }
        tracing::debug!(linked, "link state changed");
        Ok(())
    }

    // -- input -------------------------------------------------------------

    /// Feed one touch event to the bubble `key`.
    ///
    /// Touches on a closing bubble are swallowed. Touches on a bubble that
    /// does not take input right now (a linked slave, queued or not yet
    /// revealed) are ignored.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownBubble`] when no bubble has this key.
    pub fn handle_touch(&mut self, key: &BubbleKey, event: &TouchEvent) -> Result<()> {
        self.ensure_running()?;
        let linked = self.linked;
        let Some(b) = self.registry.get_mut(key) else {
            return Err(EngineError::UnknownBubble(key.clone()));
        };
        if b.is_destroyed() {
            tracing::trace!(key = %key, "touch on closing bubble swallowed");
            return Ok(());
        }
        if !b.accepts_touch(linked) && !b.controller.is_touching() {
            return Ok(());
        }

        let before = b.position();
        if event.phase == TouchPhase::Down {
            self.scheduler.cancel_slot(&mut b.coast_timer);
            b.flags.remove(BubbleFlags::COASTING);
            if b.is_master() {
                self.master_down = Some(before);
            }
        }

        let mut ctx = TouchContext {
            screen: self.screen,
            bubble_size: self.config.bubble.size,
            touch_down_scale: self.config.bubble.touch_down_scale,
            horizontal_fling_factor: self.config.gesture.horizontal_fling_factor,
            close_all_armed: self.close_all_armed,
            docking: &mut self.docking,
            remove_target: &mut self.remove_target,
        };
        let outcomes = b.controller.handle_touch(event, &mut b.springs, &mut ctx);
        let after = b.position();
        if after != before {
            move_quietly(&mut self.surface, b.window(), after);
        }
        let handle = b.handle();

        for outcome in outcomes {
            self.apply_outcome(key, &handle, outcome, event.time);
        }
        if event.phase.is_terminal()
            && let Some(b) = self.registry.get_mut(key)
            && !b.is_destroyed()
        {
            b.flags.remove(BubbleFlags::DRAGGING);
            self.schedule_coast(key, event.time);
        }
        self.dispatch();
        Ok(())
    }

    fn apply_outcome(&mut self, key: &BubbleKey, handle: &BubbleHandle, outcome: Outcome, now: Instant) {
        match outcome {
            Outcome::Clicked => self.events.push(BubbleEvent::Clicked(handle.clone())),
            Outcome::LongPressed => self.events.push(BubbleEvent::LongPressed(handle.clone())),
            Outcome::DragStarted => {
                if let Some(b) = self.registry.get_mut(key) {
                    b.flags
                        .insert(BubbleFlags::MANUALLY_MOVED | BubbleFlags::DRAGGING);
                }
            }
            Outcome::LockedToTarget => {
                self.chain.disable_displacement();
                self.propagated = None;
                self.scheduler.cancel_slot(&mut self.close_all_timer);
                self.close_all_armed = false;
                if let Some(delay) = self.config.timing.close_all_delay() {
                    self.close_all_timer =
                        Some(self.scheduler.schedule(now, delay, TimerTask::CloseAllArmed));
                }
                tracing::debug!(key = %key, "locked to remove target");
            }
            Outcome::ReleasedFromTarget => {
                self.chain.enable_displacement();
                self.propagated = None;
                self.disarm_close_all();
                tracing::debug!(key = %key, "released from remove target");
            }
            Outcome::Destroy => {
                self.disarm_close_all();
                self.begin_destroy(key, true, true);
            }
            Outcome::CloseAll => {
                self.disarm_close_all();
                self.close_all();
            }
            Outcome::Released { flung } => {
                if let Some(b) = self.registry.get_mut(key) {
                    b.flags.remove(BubbleFlags::DRAGGING);
                }
                tracing::trace!(key = %key, flung, "released");
            }
        }
    }

    fn disarm_close_all(&mut self) {
        self.scheduler.cancel_slot(&mut self.close_all_timer);
        self.close_all_armed = false;
    }

    // -- ticking -----------------------------------------------------------

    /// Advance every animation to `now` and flush events.
    pub fn tick(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        self.last_tick = Some(now);

        let before: Vec<(BubbleKey, Point)> = self
            .registry
            .iter()
            .map(|b| (b.key().clone(), b.position()))
            .collect();

        for (_, task) in self.scheduler.poll(now) {
            self.run_task(task);
        }
        self.poll_long_presses(now);
        self.advance_reveal(dt);
        self.advance_springs(dt);

        for (key, old) in before {
            if let Some(b) = self.registry.get(&key)
                && b.position() != old
                && !b.is_queued()
            {
                move_quietly(&mut self.surface, b.window(), b.position());
            }
        }

        self.advance_closing(dt, now);

        let step = self.remove_target.advance(dt);
        if step.updated
            && let Some(handle) = self.remove_target.handle()
        {
            self.surface.set_scale(handle, self.remove_target.scale());
        }
        self.dispatch();
    }

    fn run_task(&mut self, task: TimerTask) {
        match task {
            TimerTask::CloseAllArmed => {
                self.close_all_timer = None;
                if self.docking.is_locked() {
                    self.close_all_armed = true;
                    tracing::debug!("close all armed");
                }
            }
            TimerTask::Coast(key) => {
                let bounds_size = self.config.bubble.size;
                let Some(b) = self.registry.get_mut(&key) else {
                    return;
                };
                b.coast_timer = None;
                if !b.is_master()
                    || b.flags.intersects(
                        BubbleFlags::MANUALLY_MOVED | BubbleFlags::DESTROYED | BubbleFlags::QUEUED,
                    )
                    || b.controller.is_touching()
                {
                    return;
                }
                let target = self
                    .docking
                    .coast_target(b.position(), self.screen, bounds_size);
                b.flags.insert(BubbleFlags::COASTING);
                b.springs.set_profile(SpringProfile::Fling);
                b.springs.set_target(target);
                tracing::debug!(key = %key, "coasting");
            }
        }
    }

    fn poll_long_presses(&mut self, now: Instant) {
        let mut pressed = Vec::new();
        for b in self.registry.values_mut() {
            if b.controller.state() == InteractionState::TouchDown
                && b.controller.check_long_press(now).is_some()
            {
                pressed.push(b.handle());
            }
        }
        for handle in pressed {
            tracing::debug!(key = %handle.key, "long press");
            self.events.push(BubbleEvent::LongPressed(handle));
        }
    }

    fn advance_reveal(&mut self, dt: Duration) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };
        let done = reveal.advance(dt);
        for (key, y) in reveal.offsets() {
            if let Some(b) = self.registry.get_mut(key)
                && !b.is_destroyed()
            {
                b.springs.y.set_current_value(y, false);
            }
        }
        if done {
            let key = reveal.key().clone();
            self.reveal = None;
            self.reveal_now(&key);
        }
    }

    fn finish_reveal(&mut self) {
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.finish();
        }
        self.advance_reveal(Duration::ZERO);
    }

    fn reveal_now(&mut self, key: &BubbleKey) {
        if let Some(b) = self.registry.get_mut(key)
            && !b.is_destroyed()
        {
            b.flags.insert(BubbleFlags::REVEALED);
            b.springs.scale.set_target(1.0);
        }
    }

    fn advance_springs(&mut self, dt: Duration) {
        let master = self.registry.master_key().cloned();

        if let Some(key) = &master {
            self.step_position(key, dt, true);
            if self.linked {
                self.propagate_chain();
            }
        }

        let keys = self.registry.keys().to_vec();
        for key in &keys {
            if master.as_ref() != Some(key) {
                self.step_position(key, dt, !self.linked);
            }
            if let Some(b) = self.registry.get_mut(key) {
                let step = b.springs.scale.advance(dt);
                if step.updated {
                    self.surface.set_scale(b.window(), b.scale());
                }
            }
        }
    }

    /// Advance one bubble's position springs. Bubbles that move on their own
    /// (the master, or any bubble while unlinked) are kept inside the bounds.
    fn step_position(&mut self, key: &BubbleKey, dt: Duration, free: bool) {
        let size = self.config.bubble.size;
        let Some(b) = self.registry.get_mut(key) else {
            return;
        };
        if b.is_queued() {
            return;
        }
        let step = b.springs.advance_position(dt);
        let clamped = free
            && step.updated
            && !b.flags.intersects(
                BubbleFlags::DRAGGING
                    | BubbleFlags::COASTING
                    | BubbleFlags::DESTROYED
                    | BubbleFlags::QUEUED,
            )
            && !b.controller.is_touching();
        if !clamped {
            return;
        }
        let fix = self.docking.clamp_to_screen(b.position(), self.screen, size);
        if let Some(x) = fix.x {
            b.springs.x.set_profile(SpringProfile::Fling);
            b.springs.x.set_target(x);
        }
        if let Some(y) = fix.y {
            b.springs.y.set_profile(SpringProfile::Fling);
            b.springs.y.set_target(y);
        }
    }

    /// Push the master's position into the chain if it moved.
    fn propagate_chain(&mut self) {
        let Some(pos) = self
            .chain
            .master()
            .and_then(|k| self.registry.get(k))
            .map(Bubble::position)
        else {
            return;
        };
        if self.propagated == Some(pos) {
            return;
        }
        self.chain.set_screen_width(self.screen.width);
        self.chain
            .on_master_update(&mut RegistrySprings(&mut self.registry));
        self.propagated = Some(pos);
    }

    fn advance_closing(&mut self, dt: Duration, now: Instant) {
        let mut finished = Vec::new();
        for closing in &mut self.closing {
            let Some(b) = self.registry.get(closing.key()) else {
                finished.push((closing.key().clone(), false));
                continue;
            };
            let scale = &b.springs.scale;
            let shrunk = scale.is_at_rest() && scale.value() == 0.0;
            let frame = closing.advance(dt, shrunk);
            if let Some(elevation) = frame.elevation {
                self.surface.set_elevation(b.window(), elevation);
            }
            if let Some(progress) = frame.close_icon {
                self.surface.show_close_icon(b.window(), progress);
            }
            if frame.finished {
                finished.push((closing.key().clone(), closing.notify()));
            }
        }
        if finished.is_empty() {
            return;
        }
        self.closing
            .retain(|c| !finished.iter().any(|(k, _)| k == c.key()));
        for (key, notify) in finished {
            self.finalize(&key, notify, now);
        }
    }

    // -- lifecycle ---------------------------------------------------------

    fn spawn_point(&self) -> Point {
        if let Some(master) = self.registry.master_key().and_then(|k| self.registry.get(k)) {
            return master.position();
        }
        let bounds = self.docking.bounds(self.screen, self.config.bubble.size);
        Point::new(bounds.left, self.screen.height / 3.0)
    }

    /// Start closing `key`: stop its timers, correct its docking position
    /// and queue the close sequence.
    fn begin_destroy(&mut self, key: &BubbleKey, collapse: bool, notify: bool) {
        let lock = self.remove_target.lock_coordinate(self.config.bubble.size);
        let Some(b) = self.registry.get_mut(key) else {
            return;
        };
        if b.is_destroyed() {
            return;
        }
        b.flags.insert(BubbleFlags::DESTROYED);
        b.flags.remove(BubbleFlags::DRAGGING | BubbleFlags::COASTING);
        b.controller.mark_destroyed();
        self.scheduler.cancel_slot(&mut b.coast_timer);

        if let Some(snap) = self.docking.snap_if_at_target(b.position(), lock)
            && b.springs.set_position(snap).updated
        {
            move_quietly(&mut self.surface, b.window(), snap);
        }

        let closing = if collapse {
            Closing::collapse(key.clone(), &self.config.timing, notify)
        } else {
            b.springs.scale.set_target(0.0);
            Closing::shrink(key.clone(), notify)
        };
        self.closing.push(closing);

        if self.reveal.as_ref().is_some_and(|r| r.key() == key) {
            self.reveal = None;
        } else if let Some(reveal) = self.reveal.as_mut() {
            reveal.forget(key);
        }
        tracing::debug!(key = %key, collapse, "bubble closing");
    }

    fn close_all(&mut self) {
        let master = self.registry.master_key().cloned();
        let keys = self.registry.keys().to_vec();
        for key in &keys {
            let collapse = self.linked || master.as_ref() == Some(key);
            self.begin_destroy(key, collapse, true);
        }
        tracing::debug!(count = keys.len(), "closing all bubbles");
    }

    /// Detach a bubble whose close sequence finished and hand mastership
    /// on if needed.
    fn finalize(&mut self, key: &BubbleKey, notify: bool, now: Instant) {
        let was_master = self.registry.master_key() == Some(key);
        let Some(mut bubble) = self.registry.remove(key) else {
            return;
        };
        bubble.springs.destroy();
        bubble.springs.scale.destroy();
        self.scheduler.cancel_slot(&mut bubble.coast_timer);
        self.surface.set_visible(bubble.window(), false);
        destroy_quietly(&mut self.surface, bubble.window());

        if was_master {
            self.reassign_master(now);
        }
        // A bubble released on the target leaves the lock behind.
        if !self.docking.is_locked() {
            self.chain.enable_displacement();
        }
        self.rebuild_chain();

        let is_last = self.registry.is_empty();
        if is_last {
            self.remove_target.hide();
            self.master_down = None;
        }
        if notify {
            self.events.push(BubbleEvent::Destroyed {
                handle: bubble.handle(),
                is_last,
            });
        }
        tracing::debug!(key = %key, is_last, "bubble destroyed");
    }

    /// The front-most live bubble becomes master and flies to where the
    /// old master was last touched.
    fn reassign_master(&mut self, now: Instant) {
        let Some(next) = self
            .registry
            .front_alive()
            .or_else(|| self.registry.key_at(0))
            .cloned()
        else {
            return;
        };
        self.registry.set_master(&next);
        if !self.docking.is_locked() {
            self.chain.enable_displacement();
        }
        if let Some(b) = self.registry.get_mut(&next)
            && !b.is_destroyed()
        {
            if let Some(down) = self.master_down {
                b.springs.set_profile(SpringProfile::Fling);
                b.springs.set_target(down);
            }
            self.schedule_coast(&next, now);
        }
        tracing::debug!(key = %next, "master changed");
    }

    /// Re-apply the queue and rebuild the chain from the registry order.
    fn rebuild_chain(&mut self) {
        let max_visible = self.config.bubble.max_visible;
        let master_pos = self
            .registry
            .master_key()
            .and_then(|k| self.registry.get(k))
            .map(Bubble::position);

        for (key, queued) in self.registry.apply_queue(max_visible) {
            let Some(b) = self.registry.get_mut(&key) else {
                continue;
            };
            self.surface.set_visible(b.window(), !queued);
            if queued {
                b.springs.x.set_at_rest();
                b.springs.y.set_at_rest();
            } else if let Some(pos) = master_pos {
                b.springs.set_position(pos);
                move_quietly(&mut self.surface, b.window(), pos);
            }
            tracing::debug!(key = %key, queued, "queue state changed");
        }

        self.chain.clear();
        self.propagated = None;
        if !self.linked {
            return;
        }
        let Some(master) = self.registry.master_key().cloned() else {
            return;
        };
        self.chain.set_master(master.clone());
        let keys = self.registry.keys().to_vec();
        for key in keys {
            if key == master {
                continue;
            }
            let Some(b) = self.registry.get_mut(&key) else {
                continue;
            };
            if b.is_queued() || b.is_destroyed() {
                continue;
            }
            if self.chain.add_slave(key) {
                b.springs.set_profile(SpringProfile::Follow);
            }
        }
    }

    fn schedule_coast(&mut self, key: &BubbleKey, now: Instant) {
        let Some(delay) = self.config.timing.coasting_delay() else {
            return;
        };
        let Some(b) = self.registry.get_mut(key) else {
            return;
        };
        if !b.is_master()
            || b.flags.intersects(
                BubbleFlags::MANUALLY_MOVED | BubbleFlags::DESTROYED | BubbleFlags::QUEUED,
            )
        {
            return;
        }
        self.scheduler.cancel_slot(&mut b.coast_timer);
        b.coast_timer = Some(self.scheduler.schedule(now, delay, TimerTask::Coast(key.clone())));
    }

    // -- dispatch ----------------------------------------------------------

    /// Deliver queued events to the listener.
    fn dispatch(&mut self) {
        if self.events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.events);
        match self.listener.as_mut() {
            Some(listener) => {
                for event in &events {
                    event.deliver(listener.as_mut());
                }
            }
            None => tracing::trace!(count = events.len(), "no listener, events dropped"),
        }
    }
}

//! Shared fakes for the integration tests: a recording window surface, a
//! recording listener and renderer, and a rig that drives an engine with a
//! synthetic clock.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bubbles_core::geometry::ScreenBounds;
use bubbles_core::{
    BubbleEvent, BubbleHandle, BubbleKey, BubbleListener, ContentRenderer, Engine, EngineConfig,
    Point, ScreenSize, SurfaceError, TouchEvent, TouchPhase, WindowHandle, WindowSurface,
};
use web_time::{Duration, Instant};

pub const SCREEN: ScreenSize = ScreenSize::new(1080.0, 1920.0);
pub const FRAME: Duration = Duration::from_millis(16);

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub screen: Option<ScreenSize>,
    pub next_id: u64,
    pub windows: HashMap<WindowHandle, Point>,
    pub destroyed: Vec<WindowHandle>,
    pub visible: HashMap<WindowHandle, bool>,
    pub scales: HashMap<WindowHandle, f64>,
    pub close_icon: HashMap<WindowHandle, f32>,
    pub moves: usize,
    /// Every move reports the window as already removed.
    pub moves_fail: bool,
    /// Window creation fails.
    pub create_fails: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screen(screen: ScreenSize) -> Self {
        Self {
            screen: Some(screen),
            ..Self::default()
        }
    }

    pub fn is_visible(&self, handle: WindowHandle) -> bool {
        self.visible.get(&handle).copied().unwrap_or(true)
    }
}

impl WindowSurface for RecordingSurface {
    fn create_window(&mut self, x: f64, y: f64) -> Result<WindowHandle, SurfaceError> {
        if self.create_fails {
            return Err(SurfaceError::Unavailable("overlay denied".into()));
        }
        let handle = WindowHandle(self.next_id);
        self.next_id += 1;
        self.windows.insert(handle, Point::new(x, y));
        Ok(handle)
    }

    fn move_window(&mut self, handle: WindowHandle, x: f64, y: f64) -> Result<(), SurfaceError> {
        if self.moves_fail {
            return Err(SurfaceError::AlreadyRemoved(handle));
        }
        let Some(pos) = self.windows.get_mut(&handle) else {
            return Err(SurfaceError::AlreadyRemoved(handle));
        };
        *pos = Point::new(x, y);
        self.moves += 1;
        Ok(())
    }

    fn destroy_window(&mut self, handle: WindowHandle) -> Result<(), SurfaceError> {
        if self.windows.remove(&handle).is_none() {
            return Err(SurfaceError::AlreadyRemoved(handle));
        }
        self.destroyed.push(handle);
        Ok(())
    }

    fn screen_dimensions(&self) -> ScreenSize {
        self.screen.unwrap_or(SCREEN)
    }

    fn set_scale(&mut self, handle: WindowHandle, scale: f64) {
        self.scales.insert(handle, scale);
    }

    fn set_visible(&mut self, handle: WindowHandle, visible: bool) {
        self.visible.insert(handle, visible);
    }

    fn show_close_icon(&mut self, handle: WindowHandle, progress: f32) {
        self.close_icon.insert(handle, progress);
    }
}

// ---------------------------------------------------------------------------
// Listener and renderer
// ---------------------------------------------------------------------------

pub type EventLog = Rc<RefCell<Vec<BubbleEvent>>>;

pub struct RecordingListener(pub EventLog);

impl BubbleListener for RecordingListener {
    fn on_bubble_clicked(&mut self, handle: &BubbleHandle) {
        self.0.borrow_mut().push(BubbleEvent::Clicked(handle.clone()));
    }

    fn on_bubble_destroyed(&mut self, handle: &BubbleHandle, is_last: bool) {
        self.0.borrow_mut().push(BubbleEvent::Destroyed {
            handle: handle.clone(),
            is_last,
        });
    }

    fn on_bubble_long_pressed(&mut self, handle: &BubbleHandle) {
        self.0.borrow_mut().push(BubbleEvent::LongPressed(handle.clone()));
    }
}

pub type RenderLog = Rc<RefCell<Vec<(WindowHandle, String)>>>;

pub struct RecordingRenderer(pub RenderLog);

impl ContentRenderer<String> for RecordingRenderer {
    fn render(&mut self, handle: WindowHandle, content: &String) {
        self.0.borrow_mut().push((handle, content.clone()));
    }
}

// ---------------------------------------------------------------------------
// Rig
// ---------------------------------------------------------------------------

pub fn quiet_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.timing.coasting_delay_ms = 0;
    config
}

pub struct Rig {
    pub engine: Engine<RecordingSurface, String>,
    pub events: EventLog,
    pub renders: RenderLog,
    pub now: Instant,
}

impl Rig {
    /// Default configuration with coasting off, so resting positions stay
    /// put however long a test runs.
    pub fn new() -> Self {
        Self::with_config(quiet_config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Engine::init(config, RecordingSurface::new()).expect("engine init");
        let events = EventLog::default();
        let renders = RenderLog::default();
        engine.set_listener(Box::new(RecordingListener(Rc::clone(&events))));
        engine.set_renderer(Box::new(RecordingRenderer(Rc::clone(&renders))));
        let now = Instant::now();
        engine.tick(now);
        Self {
            engine,
            events,
            renders,
            now,
        }
    }

    pub fn unlinked() -> Self {
        let mut config = quiet_config();
        config.bubble.linked_on_start = false;
        Self::with_config(config)
    }

    /// Advance the clock by `ms`, ticking every frame.
    pub fn advance(&mut self, ms: u64) {
        let end = self.now + Duration::from_millis(ms);
        while self.now < end {
            self.now = (self.now + FRAME).min(end);
            self.engine.tick(self.now);
        }
    }

    /// Tick until nothing animates, at most `max_ms`.
    pub fn settle_within(&mut self, max_ms: u64) {
        let end = self.now + Duration::from_millis(max_ms);
        self.advance(FRAME.as_millis() as u64);
        while !self.engine.is_idle() && self.now < end {
            self.now += FRAME;
            self.engine.tick(self.now);
        }
        assert!(self.engine.is_idle(), "engine did not settle within {max_ms}ms");
    }

    pub fn settle(&mut self) {
        self.settle_within(4000);
    }

    pub fn add(&mut self, key: &str) -> BubbleHandle {
        self.engine
            .add_bubble(key, format!("content of {key}"), self.now)
            .expect("add bubble")
    }

    pub fn touch(&mut self, key: &str, phase: TouchPhase, x: f64, y: f64) {
        let event = TouchEvent::new(phase, Point::new(x, y), self.now);
        self.engine
            .handle_touch(&BubbleKey::from(key), &event)
            .expect("touch");
    }

    /// Press `key`, drag the finger by `(dx, dy)` in `steps` moves, then hold
    /// still long enough that the release carries no fling. Leaves the
    /// finger down.
    pub fn drag_by(&mut self, key: &str, dx: f64, dy: f64, steps: u32) -> Point {
        let start = self.position(key).offset(20.0, 20.0);
        self.touch(key, TouchPhase::Down, start.x, start.y);
        for i in 1..=steps {
            self.advance(16);
            let f = f64::from(i) / f64::from(steps);
            self.touch(key, TouchPhase::Move, start.x + dx * f, start.y + dy * f);
        }
        let end = start.offset(dx, dy);
        self.advance(150);
        self.touch(key, TouchPhase::Move, end.x, end.y);
        self.advance(150);
        end
    }

    /// Drag by `(dx, dy)` and release without a fling.
    pub fn drag_and_release(&mut self, key: &str, dx: f64, dy: f64) {
        let end = self.drag_by(key, dx, dy, 12);
        self.touch(key, TouchPhase::Up, end.x, end.y);
    }

    /// Tap `key` in place.
    pub fn tap(&mut self, key: &str) {
        let at = self.position(key).offset(20.0, 20.0);
        self.touch(key, TouchPhase::Down, at.x, at.y);
        self.advance(48);
        self.touch(key, TouchPhase::Up, at.x, at.y);
    }

    pub fn position(&self, key: &str) -> Point {
        self.engine
            .bubble(&BubbleKey::from(key))
            .map(|s| s.position)
            .expect("bubble exists")
    }

    pub fn master(&self) -> Option<String> {
        self.engine.master_key().map(|k| k.as_str().to_owned())
    }

    pub fn destroyed(&self) -> Vec<(String, bool)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BubbleEvent::Destroyed { handle, is_last } => {
                    Some((handle.key.as_str().to_owned(), *is_last))
                }
                _ => None,
            })
            .collect()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BubbleEvent::Clicked(handle) => Some(handle.key.as_str().to_owned()),
                _ => None,
            })
            .collect()
    }

    pub fn bounds(&self) -> ScreenBounds {
        let c = self.engine.config();
        ScreenBounds::new(
            SCREEN,
            c.bubble.size,
            c.docking.wall_displace,
            c.docking.top_inset,
            c.docking.bottom_fraction,
        )
    }
}

//! Benchmark: per-frame engine cost.
//!
//! Run with: `cargo bench -p bubbles-core --bench engine_tick_bench`
//!
//! Measures one `Engine::tick` for a linked cluster while the master is
//! being dragged (every slave spring active), for an idle cluster, and the
//! cost of a drag move event itself.

use std::hint::black_box;

use bubbles_core::{
    Engine, EngineConfig, Point, ScreenSize, SurfaceError, TouchEvent, TouchPhase, WindowHandle,
    WindowSurface,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use web_time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

/// Surface that accepts everything and draws nothing.
#[derive(Debug, Default)]
struct NullSurface {
    next: u64,
}

impl WindowSurface for NullSurface {
    fn create_window(&mut self, _x: f64, _y: f64) -> Result<WindowHandle, SurfaceError> {
        self.next += 1;
        Ok(WindowHandle(self.next))
    }

    fn move_window(&mut self, _handle: WindowHandle, _x: f64, _y: f64) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn destroy_window(&mut self, _handle: WindowHandle) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn screen_dimensions(&self) -> ScreenSize {
        ScreenSize::new(1080.0, 1920.0)
    }
}

fn cluster(n: usize) -> (Engine<NullSurface, u32>, Instant) {
    let mut config = EngineConfig::default();
    config.timing.coasting_delay_ms = 0;
    let mut engine = Engine::init(config, NullSurface::default()).expect("init");
    let mut now = Instant::now();
    engine.tick(now);
    for i in 0..n {
        engine
            .add_bubble(format!("b{i}"), i as u32, now)
            .expect("add");
        for _ in 0..20 {
            now += FRAME;
            engine.tick(now);
        }
    }
    (engine, now)
}

// ===========================================================================
// Tick
// ===========================================================================

fn bench_tick_dragging(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_dragging");
    for n in [1usize, 5, 12] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (mut engine, mut now) = cluster(n);
            let master = engine.master_key().cloned().expect("master");
            let start = Point::new(20.0, 660.0);
            engine
                .handle_touch(&master, &TouchEvent::new(TouchPhase::Down, start, now))
                .expect("down");
            let mut step = 0u32;
            b.iter(|| {
                step = (step + 1) % 400;
                now += FRAME;
                let x = start.x + f64::from(step);
                let pos = Point::new(x, start.y + f64::from(step) * 0.5);
                engine
                    .handle_touch(&master, &TouchEvent::new(TouchPhase::Move, pos, now))
                    .expect("move");
                engine.tick(black_box(now));
            });
        });
    }
    group.finish();
}

fn bench_tick_idle(c: &mut Criterion) {
    let (mut engine, mut now) = cluster(5);
    c.bench_function("tick_idle_5", |b| {
        b.iter(|| {
            now += FRAME;
            engine.tick(black_box(now));
        });
    });
}

criterion_group!(benches, bench_tick_dragging, bench_tick_idle);
criterion_main!(benches);

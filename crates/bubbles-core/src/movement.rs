#![forbid(unsafe_code)]

//! Fling velocity correction.
//!
//! The raw recognizer velocity can point the wrong way when the touch path
//! was short or jittery. [`MovementTracker`] keeps the last few touch
//! samples of a sequence and, when the raw velocity disagrees in sign with
//! the trend of those samples, recomputes that axis from the down and up
//! points instead.
//!
//! [`interpolate_x_velocity`] then raises weak horizontal flings so a bubble
//! released mid-screen still reaches the wall it was thrown toward.

use std::collections::VecDeque;

use web_time::Instant;

use crate::geometry::{Point, Velocity};

/// One recorded touch sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub pos: Point,
    pub time: Instant,
}

impl TouchSample {
    #[must_use]
    pub const fn new(pos: Point, time: Instant) -> Self {
        Self { pos, time }
    }
}

/// Bounded history of the current touch sequence.
#[derive(Debug, Clone)]
pub struct MovementTracker {
    history: VecDeque<TouchSample>,
    capacity: usize,
    down: Option<TouchSample>,
    up: Option<TouchSample>,
}

impl MovementTracker {
    /// Keep at most `capacity` samples (minimum 2).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            down: None,
            up: None,
        }
    }

    /// Start a new sequence.
    pub fn on_down(&mut self, sample: TouchSample) {
        self.history.clear();
        self.up = None;
        self.down = Some(sample);
        self.push(sample);
    }

    pub fn add_movement(&mut self, sample: TouchSample) {
        self.push(sample);
    }

    pub fn on_up(&mut self, sample: TouchSample) {
        self.up = Some(sample);
        self.push(sample);
    }

    #[must_use]
    pub fn down(&self) -> Option<TouchSample> {
        self.down
    }

    #[must_use]
    pub fn up(&self) -> Option<TouchSample> {
        self.up
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn push(&mut self, sample: TouchSample) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }

    /// Net displacement across the recorded samples.
    #[must_use]
    pub fn trend(&self) -> Option<(f64, f64)> {
        if self.history.len() < 2 {
            return None;
        }
        let first = self.history.front()?;
        let last = self.history.back()?;
        Some(last.pos.delta(first.pos))
    }

    /// Correct `raw` against the recorded trend.
    ///
    /// Each axis whose sign disagrees with the trend is recomputed as
    /// `(up - down) / elapsed`. Returns `None` when the history is too
    /// short to judge, or when a correction is needed but `down` and `up`
    /// share a timestamp. Callers fall back to `raw` in that case.
    #[must_use]
    pub fn adjusted_velocity(
        &self,
        raw: Velocity,
        down: TouchSample,
        up: TouchSample,
    ) -> Option<Velocity> {
        let (tx, ty) = self.trend()?;
        let disagrees = |v: f64, d: f64| v != 0.0 && d != 0.0 && v.signum() != d.signum();
        let fix_x = disagrees(raw.x, tx);
        let fix_y = disagrees(raw.y, ty);
        if !fix_x && !fix_y {
            return Some(raw);
        }

        let elapsed = up.time.saturating_duration_since(down.time).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let (dx, dy) = up.pos.delta(down.pos);
        Some(Velocity::new(
            if fix_x { dx / elapsed } else { raw.x },
            if fix_y { dy / elapsed } else { raw.y },
        ))
    }

    /// [`adjusted_velocity`](Self::adjusted_velocity) using the recorded
    /// down and up samples, falling back to `raw`.
    #[must_use]
    pub fn corrected_or_raw(&self, raw: Velocity) -> Velocity {
        match (self.down, self.up) {
            (Some(down), Some(up)) => self.adjusted_velocity(raw, down, up).unwrap_or(raw),
            _ => raw,
        }
    }
}

/// Raise a horizontal fling to reach the wall it is heading for.
///
/// With `f` the release x as a fraction of `screen_width`, the magnitude is
/// raised to at least `min_velocity × (1 - f)` when moving right and
/// `min_velocity × f` when moving left (or standing still).
#[must_use]
pub fn interpolate_x_velocity(vx: f64, release_x: f64, screen_width: f64, min_velocity: f64) -> f64 {
    if screen_width <= 0.0 {
        return vx;
    }
    let f = (release_x / screen_width).clamp(0.0, 1.0);
    if vx > 0.0 {
        vx.max(min_velocity * (1.0 - f))
    } else {
        -(-vx).max(min_velocity * f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use web_time::Duration;

    fn sample(base: Instant, ms: u64, x: f64, y: f64) -> TouchSample {
        TouchSample::new(Point::new(x, y), base + Duration::from_millis(ms))
    }

    #[test]
    fn history_is_bounded() {
        let t = Instant::now();
        let mut m = MovementTracker::new(5);
        m.on_down(sample(t, 0, 0.0, 0.0));
        for i in 1..10 {
            m.add_movement(sample(t, i * 10, i as f64, 0.0));
        }
        assert_eq!(m.len(), 5);
        assert_eq!(m.trend(), Some((4.0, 0.0)));
    }

    #[test]
    fn agreeing_velocity_is_kept() {
        let t = Instant::now();
        let mut m = MovementTracker::new(5);
        let down = sample(t, 0, 0.0, 0.0);
        let up = sample(t, 100, 50.0, 20.0);
        m.on_down(down);
        m.on_up(up);
        let raw = Velocity::new(900.0, 300.0);
        assert_eq!(m.adjusted_velocity(raw, down, up), Some(raw));
    }

    #[test]
    fn disagreeing_axis_is_recomputed() {
        let t = Instant::now();
        let mut m = MovementTracker::new(5);
        let down = sample(t, 0, 0.0, 0.0);
        let up = sample(t, 100, 50.0, 20.0);
        m.on_down(down);
        m.add_movement(sample(t, 50, 30.0, 10.0));
        m.on_up(up);
        let raw = Velocity::new(-700.0, 300.0);
        let fixed = m.adjusted_velocity(raw, down, up).expect("correctable");
        assert!((fixed.x - 500.0).abs() < 1e-9);
        assert_eq!(fixed.y, 300.0);
    }

    #[test]
    fn ambiguous_history_returns_none() {
        let t = Instant::now();
        let mut m = MovementTracker::new(5);
        let down = sample(t, 0, 0.0, 0.0);
        m.on_down(down);
        assert_eq!(m.adjusted_velocity(Velocity::new(1.0, 1.0), down, down), None);

        let up = sample(t, 0, 10.0, 0.0);
        m.on_up(up);
        assert_eq!(m.adjusted_velocity(Velocity::new(-1.0, 0.0), down, up), None);
        assert_eq!(m.corrected_or_raw(Velocity::new(-1.0, 0.0)), Velocity::new(-1.0, 0.0));
    }

    #[test]
    fn interpolation_raises_weak_flings() {
        let min = 10_000.0;
        // Moving right from the left quarter: at least 75% of min.
        assert_eq!(interpolate_x_velocity(100.0, 250.0, 1000.0, min), 7500.0);
        // Moving left from the same spot: at least 25% of min.
        assert_eq!(interpolate_x_velocity(-100.0, 250.0, 1000.0, min), -2500.0);
        // Strong flings are untouched.
        assert_eq!(interpolate_x_velocity(-9000.0, 250.0, 1000.0, min), -9000.0);
    }

    #[test]
    fn interpolation_never_flips_direction() {
        for x in [0.0, 100.0, 500.0, 999.0, 1000.0] {
            for v in [-5000.0, -1.0, 1.0, 5000.0] {
                let out = interpolate_x_velocity(v, x, 1000.0, 10_000.0);
                assert_eq!(out.signum(), f64::signum(v), "v={v} x={x}");
                assert!(out.abs() >= v.abs());
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Engine configuration as data.
//!
//! [`EngineConfig`] gathers every tunable of the bubble engine into four
//! sections that can be loaded from TOML or JSON (feature `config`).
//!
//! # Loading
//!
//! ```toml
//! [bubble]
//! size = 64.0
//! max_visible = 4
//!
//! [docking]
//! magnetism_radius = 140.0
//!
//! [timing]
//! coasting_delay_ms = 0
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("bubbles.toml")?;
//! ```
//!
//! # Defaults
//!
//! Every default is a pixel value at density 1.0. Durations are stored as
//! integer milliseconds so both formats round-trip without loss. A timer
//! delay of zero disables that timer.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level EngineConfig
// ---------------------------------------------------------------------------

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    pub bubble: BubbleConfig,
    pub gesture: GestureConfig,
    pub docking: DockingConfig,
    pub timing: TimingConfig,
}

impl EngineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)?.validated()
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)?.validated()
    }

    /// Return `self` if it validates cleanly.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let b = &self.bubble;
        if !(b.size > 0.0 && b.size.is_finite()) {
            errors.push(format!("bubble.size must be > 0, got {}", b.size));
        }
        if b.max_visible == 0 {
            errors.push("bubble.max_visible must be > 0".into());
        }
        if b.chain_x_step < 0.0 || b.chain_y_step < 0.0 {
            errors.push("bubble.chain_x_step and bubble.chain_y_step must be >= 0".into());
        }
        if b.stacking_gap < 0.0 {
            errors.push(format!("bubble.stacking_gap must be >= 0, got {}", b.stacking_gap));
        }
        if !(b.touch_down_scale > 0.0 && b.touch_down_scale <= 1.0) {
            errors.push(format!(
                "bubble.touch_down_scale must be in (0, 1], got {}",
                b.touch_down_scale
            ));
        }

        let g = &self.gesture;
        if g.touch_slop < 0.0 {
            errors.push(format!("gesture.touch_slop must be >= 0, got {}", g.touch_slop));
        }
        if g.min_fling_velocity < 0.0 {
            errors.push(format!(
                "gesture.min_fling_velocity must be >= 0, got {}",
                g.min_fling_velocity
            ));
        }
        if g.velocity_window_ms == 0 {
            errors.push("gesture.velocity_window_ms must be > 0".into());
        }
        if g.history_len < 2 {
            errors.push(format!("gesture.history_len must be >= 2, got {}", g.history_len));
        }
        if g.horizontal_fling_factor < 0.0 {
            errors.push("gesture.horizontal_fling_factor must be >= 0".into());
        }

        let d = &self.docking;
        if d.magnetism_radius <= 0.0 {
            errors.push(format!(
                "docking.magnetism_radius must be > 0, got {}",
                d.magnetism_radius
            ));
        }
        if d.snap_tolerance < 0.0 {
            errors.push("docking.snap_tolerance must be >= 0".into());
        }
        if !(d.wall_displace > 0.0 && d.wall_displace <= 1.0) {
            errors.push(format!(
                "docking.wall_displace must be in (0, 1], got {}",
                d.wall_displace
            ));
        }
        if !(d.bottom_fraction > 0.0 && d.bottom_fraction <= 1.0) {
            errors.push(format!(
                "docking.bottom_fraction must be in (0, 1], got {}",
                d.bottom_fraction
            ));
        }
        if !(d.remove_target_idle_scale > 0.0 && d.remove_target_idle_scale <= 1.0) {
            errors.push("docking.remove_target_idle_scale must be in (0, 1]".into());
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Bubble geometry and cluster shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct BubbleConfig {
    /// Bubble window edge length (default: 56).
    pub size: f64,
    /// Bubbles visible in the cluster, master included (default: 5).
    pub max_visible: usize,
    /// Horizontal trail offset per slave (default: 4).
    pub chain_x_step: f64,
    /// Vertical trail offset per slave (default: 1.7).
    pub chain_y_step: f64,
    /// Vertical nudge applied to existing bubbles on add (default: 6).
    pub stacking_gap: f64,
    /// Scale while a finger is down (default: 0.85).
    pub touch_down_scale: f64,
    /// Whether the cluster starts linked (default: true).
    pub linked_on_start: bool,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            size: 56.0,
            max_visible: 5,
            chain_x_step: 4.0,
            chain_y_step: 1.7,
            stacking_gap: 6.0,
            touch_down_scale: 0.85,
            linked_on_start: true,
        }
    }
}

/// Touch interpretation thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct GestureConfig {
    /// Euclidean distance before a touch becomes a drag (default: 8).
    pub touch_slop: f64,
    /// Hold time before a long press (default: 500ms).
    pub long_press_ms: u64,
    /// Per-axis speed a drag must reach on release to fling (default: 50 px/s).
    pub min_fling_velocity: f64,
    /// Span of recent samples used for the raw velocity (default: 100ms).
    pub velocity_window_ms: u64,
    /// Samples kept for fling direction correction (default: 5).
    pub history_len: usize,
    /// Minimum horizontal fling speed in screen widths per second
    /// (default: 10).
    pub horizontal_fling_factor: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_slop: 8.0,
            long_press_ms: 500,
            min_fling_velocity: 50.0,
            velocity_window_ms: 100,
            history_len: 5,
            horizontal_fling_factor: 10.0,
        }
    }
}

impl GestureConfig {
    #[must_use]
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    #[must_use]
    pub fn velocity_window(&self) -> Duration {
        Duration::from_millis(self.velocity_window_ms)
    }
}

/// Remove target and wall behavior.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DockingConfig {
    /// Center-to-center distance that captures a bubble (default: 120).
    pub magnetism_radius: f64,
    /// Distance from the lock coordinate that snaps exactly (default: 15).
    pub snap_tolerance: f64,
    /// Fraction of the bubble left on screen at a wall (default: 0.7).
    pub wall_displace: f64,
    /// Top resting inset (default: 25).
    pub top_inset: f64,
    /// Bottom resting limit as a fraction of screen height (default: 0.85).
    pub bottom_fraction: f64,
    /// Remove target window edge length (default: 72).
    pub remove_target_size: f64,
    /// Remove target scale while shown but not grown (default: 0.9).
    pub remove_target_idle_scale: f64,
}

impl Default for DockingConfig {
    fn default() -> Self {
        Self {
            magnetism_radius: 120.0,
            snap_tolerance: 15.0,
            wall_displace: 0.7,
            top_inset: 25.0,
            bottom_fraction: 0.85,
            remove_target_size: 72.0,
            remove_target_idle_scale: 0.9,
        }
    }
}

/// Timer delays and animation durations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TimingConfig {
    /// Hold at the remove target before release closes everything
    /// (default: 3000ms, 0 disables).
    pub close_all_delay_ms: u64,
    /// Idle time before an untouched master drifts off the edge
    /// (default: 6000ms, 0 disables).
    pub coasting_delay_ms: u64,
    /// Stacking nudge duration (default: 200ms).
    pub nudge_ms: u64,
    /// Close sequence: shadow flatten (default: 50ms).
    pub close_flatten_ms: u64,
    /// Close sequence: delay before the close icon fades in (default: 100ms).
    pub close_reveal_delay_ms: u64,
    /// Close sequence: close icon cross-fade (default: 400ms).
    pub close_reveal_ms: u64,
    /// Close sequence: hold after the cross-fade (default: 200ms).
    pub close_post_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            close_all_delay_ms: 3000,
            coasting_delay_ms: 6000,
            nudge_ms: 200,
            close_flatten_ms: 50,
            close_reveal_delay_ms: 100,
            close_reveal_ms: 400,
            close_post_delay_ms: 200,
        }
    }
}

impl TimingConfig {
    /// `None` when the close-all timer is disabled.
    #[must_use]
    pub fn close_all_delay(&self) -> Option<Duration> {
        (self.close_all_delay_ms > 0).then(|| Duration::from_millis(self.close_all_delay_ms))
    }

    /// `None` when coasting is disabled.
    #[must_use]
    pub fn coasting_delay(&self) -> Option<Duration> {
        (self.coasting_delay_ms > 0).then(|| Duration::from_millis(self.coasting_delay_ms))
    }

    #[must_use]
    pub fn nudge(&self) -> Duration {
        Duration::from_millis(self.nudge_ms)
    }

    /// Total length of the close sequence.
    #[must_use]
    pub fn close_sequence(&self) -> Duration {
        let reveal_end = self.close_reveal_delay_ms + self.close_reveal_ms;
        Duration::from_millis(self.close_flatten_ms.max(reveal_end) + self.close_post_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

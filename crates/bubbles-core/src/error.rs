#![forbid(unsafe_code)]

//! Engine and configuration errors.
//!
//! Only caller misuse and fatal initialization problems surface as
//! [`EngineError`]. Render-surface races during animation are swallowed and
//! logged by the engine, and ambiguous fling velocities fall back to the raw
//! recognizer velocity, so neither has a variant here.

use std::fmt;

use crate::bubble::BubbleKey;
use crate::surface::SurfaceError;

/// Convenience alias for engine results.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors reported synchronously by [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A bubble was requested with an empty key.
    EmptyKey,
    /// No bubble with this key exists.
    UnknownBubble(BubbleKey),
    /// The bubble is already being destroyed.
    BubbleDestroyed(BubbleKey),
    /// A stack index past the end of the registry.
    IndexOutOfRange { index: usize, len: usize },
    /// The surface reported unusable screen dimensions.
    InvalidScreen { width: f64, height: f64 },
    /// A window operation that must succeed failed.
    Surface(SurfaceError),
    /// The engine was used before `init` or after `shutdown`.
    NotInitialized,
    /// The configuration failed validation.
    InvalidConfig(Vec<String>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "bubble key must not be empty"),
            Self::UnknownBubble(key) => write!(f, "no bubble with key {key}"),
            Self::BubbleDestroyed(key) => write!(f, "bubble {key} is already being destroyed"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "bubble index {index} out of range (len {len})")
            }
            Self::InvalidScreen { width, height } => {
                write!(f, "invalid screen dimensions {width}x{height}")
            }
            Self::Surface(e) => write!(f, "window surface error: {e}"),
            Self::NotInitialized => write!(f, "engine is not initialized"),
            Self::InvalidConfig(errors) => {
                write!(f, "invalid configuration: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfaceError> for EngineError {
    fn from(e: SurfaceError) -> Self {
        Self::Surface(e)
    }
}

/// Errors loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Validation(errors) => Self::InvalidConfig(errors),
            other => Self::InvalidConfig(vec![other.to_string()]),
        }
    }
}

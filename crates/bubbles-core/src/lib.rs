#![forbid(unsafe_code)]

//! Core: spring physics, gestures, docking and cluster bookkeeping for
//! floating overlay bubbles.
//!
//! # Role
//! `bubbles-core` is the motion and interaction engine behind a cluster of
//! chat-head style bubbles. It never draws: a host supplies a
//! [`WindowSurface`] that places small overlay windows, feeds raw
//! [`TouchEvent`]s in, and calls [`Engine::tick`] once per frame.
//!
//! # Primary responsibilities
//! - **Spring / SpringChain**: damped springs and the master/slave trail.
//! - **GestureRecognizer / BubbleController**: tap, long press, drag and
//!   fling, and the per-bubble interaction state machine.
//! - **DockingPolicy / RemoveTarget**: magnetic capture, wall snapping and
//!   screen clamping.
//! - **Engine**: registry, mastership, queueing, link state, add/remove
//!   sequences and listener events.
//!
//! # Time
//! Nothing reads the clock. Every time-dependent call takes an explicit
//! [`Instant`](web_time::Instant), so tests and replays are deterministic.

pub mod animation;
pub mod bubble;
pub mod config;
pub mod controller;
pub mod docking;
pub mod engine;
pub mod error;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod lifecycle;
pub mod logging;
pub mod movement;
pub mod registry;
pub mod scheduler;
pub mod semantic_event;
pub mod surface;

pub use bubble::{BubbleFlags, BubbleHandle, BubbleKey, BubbleState};
pub use config::EngineConfig;
pub use engine::{BubbleEvent, BubbleListener, Engine};
pub use error::{ConfigError, EngineError, Result};
pub use event::{TouchEvent, TouchPhase};
pub use geometry::{Point, ScreenSize, Velocity};
pub use surface::{ContentRenderer, SurfaceError, WindowHandle, WindowSurface};

#![forbid(unsafe_code)]

//! Logging conventions.
//!
//! The engine logs through [`tracing`] and never installs a subscriber on
//! its own. Levels:
//!
//! | Level   | Used for                                                   |
//! |---------|------------------------------------------------------------|
//! | `debug` | lifecycle: added, updated, master changed, queued, closing, destroyed, timers firing; swallowed "already removed" window races |
//! | `trace` | per-tick detail: fling velocities, close cues, dropped events |
//! | `warn`  | swallowed window failures other than removal races          |
//!
//! Every event carries structured fields (`key`, `index`, `is_last`,
//! `count`) rather than formatting them into the message. Targets are the
//! default module paths, all under `bubbles_core`.
//!
//! Hosts without a subscriber of their own can enable the `tracing-json`
//! feature and call [`install_json_subscriber`].

/// Default filter for [`install_json_subscriber`] when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "bubbles_core=info";

/// Install a global JSON-lines subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
#[cfg(feature = "tracing-json")]
pub fn install_json_subscriber() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
}

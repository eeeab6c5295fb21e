//! Logging setup
//!
//! The pipeline stages emit `tracing` events as they run: per-stage
//! `debug!` (graph built, component validated, entry points emitted) and
//! per-key `trace!` during resolution. This module only installs a
//! subscriber for those events; embedding tools that already own a
//! subscriber should skip it and the events flow there instead.
//!
//! The output format follows the enabled cargo feature: `logging-json` for
//! build-server log aggregation, `logging-pretty` for debugging a
//! misbehaving graph locally. With neither feature, [`init`] is a no-op.

/// Install a subscriber for this crate's events.
///
/// Filtering honors `RUST_LOG`, defaulting to `dependency_codegen=debug`.
/// Call once at startup; events reported before that are dropped.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dependency_codegen=debug"));

    #[cfg(feature = "logging-json")]
    let layer = fmt::layer().json().with_target(true);
    #[cfg(not(feature = "logging-json"))]
    let layer = fmt::layer().pretty().with_target(true);

    tracing_subscriber::registry().with(filter).with(layer).init();
}

/// No subscriber features enabled: the host application owns setup.
#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init() {}

//! Logging bootstrap and phase-timing spans.
//!
//! Generalises the original program's `PROFILER_START`/`PROFILER_END` macros
//! (`original_source/progc/src/profile.h`) into ordinary `tracing` spans, so
//! that phase timings show up the same way any other structured log line
//! does, instead of through a bespoke nanosecond timer writing straight to
//! stderr.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing_subscriber::fmt` subscriber writing to stderr, so
/// that computation output (stdout) is never interleaved with
/// diagnostics.
///
/// The filter is read from `ROUTE_ANALYTICS_LOG`, falling back to
/// `RUST_LOG`, falling back to `info` (or `debug` when the `profiling`
/// feature is enabled, standing in for the original's `ENABLE_PROFILER`).
pub fn init() {
    let default_level = if cfg!(feature = "profiling") {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_env("ROUTE_ANALYTICS_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Enters a named span for the duration of `f`, mirroring
/// `PROFILER_START(name) ... PROFILER_END()` around a block of code.
pub fn timed_phase<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let span = tracing::info_span!("phase", name);
    let _guard = span.enter();
    f()
}

//! Logging and tracing configuration
//!
//! Logs go to stderr so the command trace on stdout stays clean. The level is
//! controlled by `RUST_LOG`; without it, everything logs warnings only, and
//! `--verbose` raises this crate to debug.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "poe_code_matrix=debug,warn"
    } else {
        "warn"
    }
}

/// Initialize tracing for the CLI (stderr logging)
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

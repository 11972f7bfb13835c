//! Structured logging setup.
//!
//! Library code only emits `tracing` events; binaries and tests decide
//! whether anything is printed by calling [`init_logging`].

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `commit_graph=info` when `RUST_LOG` is not set. Output goes to
/// stderr so that command output on stdout stays machine readable. Repeated
/// calls are silently ignored by `tracing_subscriber`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("commit_graph=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

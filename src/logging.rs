//! Logging setup
//!
//! The library only emits `tracing` events. Binaries (and the demo) call
//! [`init_logging`] once at start-up to print them.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` (e.g. `"modelrun_db=info"`) when
/// `RUST_LOG` is unset or invalid. Returns `false` if a global subscriber
/// was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("modelrun_db=debug");
        assert!(!init_logging("modelrun_db=debug"));
    }
}

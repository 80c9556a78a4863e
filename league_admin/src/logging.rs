//! Log setup for the admin binary.
//!
//! Everything goes to stderr; stdout carries only the JSON result. Records from
//! `league_core` arrive through the `log` facade and share the same filter.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
pub fn init() {
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry().with(filter()).with(stderr).init();
}

/// One summary line per invocation
pub fn log_command(command: &str, took: Duration, ok: bool) {
    let duration_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX);
    if ok {
        tracing::info!(command, duration_ms, "Command completed");
    } else {
        tracing::warn!(command, duration_ms, "Command failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_summary_without_subscriber() {
        log_command("tournament-score", Duration::from_millis(12), true);
        log_command("tournament-score", Duration::MAX, false);
    }
}

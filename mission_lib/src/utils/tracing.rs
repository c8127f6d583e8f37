//! Logging setup shared by the sequencer node and the station tools.
//!
//! The subscriber is installed per thread and removed when the returned
//! guard drops, leaving dora's global subscriber alone.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset or does not parse.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the default compact logger. Keep the guard alive in `main`.
pub fn init_tracing() -> DefaultGuard {
    init_tracing_with_default(DEFAULT_LOG_FILTER)
}

/// Same as [`init_tracing`] with a caller-chosen fallback filter, e.g.
/// `"debug"` for a tool run with `--verbose`. `RUST_LOG` still wins.
pub fn init_tracing_with_default(default_filter: &str) -> DefaultGuard {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter_from(rust_log.as_deref(), default_filter);

    let subscriber = tracing_subscriber::Registry::default().with(filter).with(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_file(false)
            .with_line_number(false),
    );

    tracing::subscriber::set_default(subscriber)
}

fn filter_from(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default() {
        let filter = filter_from(Some("warn"), "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_default_used_without_rust_log() {
        let filter = filter_from(None, "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = filter_from(None, DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}

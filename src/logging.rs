//! Tracing setup for the `siteproof` binary.
//!
//! Events go to the systemd journal on Linux and to a daily rolling file
//! otherwise. Stdout stays reserved for command output (JSON reports).

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding filter directives, e.g. `debug` or
/// `siteproof::verify=trace`.
pub const LOG_ENV: &str = "SITEPROOF_LOG";

/// Our own events at info, dependencies only when they warn.
pub const DEFAULT_DIRECTIVES: &str = "warn,siteproof=info";

/// Build the filter from `raw` directives. Malformed directives fall back to
/// the default rather than silencing logging.
pub fn build_filter(raw: Option<&str>) -> EnvFilter {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("siteproof")
        .join("logs")
}

/// Install the global subscriber. Call once, before any command runs.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let raw = std::env::var(LOG_ENV).ok();
    let env_filter = build_filter(raw.as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .init();

            tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging to journald");
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "siteproof.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops the writer thread
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        "Logging to file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_scopes_info_to_crate() {
        let filter = build_filter(None).to_string();
        assert!(filter.contains("siteproof=info"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn test_env_directives_override_default() {
        let filter = build_filter(Some("siteproof::verify=trace")).to_string();
        assert!(filter.contains("siteproof::verify=trace"));
        assert!(!filter.contains("siteproof=info"));
    }

    #[test]
    fn test_blank_directives_fall_back() {
        assert_eq!(build_filter(Some("  ")).to_string(), build_filter(None).to_string());
    }
}

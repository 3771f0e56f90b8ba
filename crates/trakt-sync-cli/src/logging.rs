use anyhow::Result;
use list_sync_config::LoggingConfig;
use std::io;
use std::io::IsTerminal;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive for the given verbosity.
///
/// `-v` is debug with the hyper connection noise suppressed, `-vv` and above
/// is trace. Without flags the configured level applies.
fn filter_directive(verbose_level: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose_level {
        0 => configured.to_string(),
        1 => "debug,hyper::proto::h1=warn,hyper::client::pool=warn".to_string(),
        _ => "trace".to_string(),
    }
}

/// `logging.format` wins; otherwise JSON whenever stdout is not a terminal.
fn use_json(format: Option<&str>) -> bool {
    match format.map(|f| f.to_ascii_lowercase()) {
        Some(f) if f == "json" => true,
        Some(f) if f == "text" => false,
        _ => std::env::var("RUST_LOG_JSON")
            .map(|v| v == "true")
            .unwrap_or_else(|_| !io::stdout().is_terminal()),
    }
}

pub fn init_logging(verbose_level: u8, quiet: bool, config: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(verbose_level, quiet, &config.level);
    let filter = if quiet {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    };

    let json = use_json(config.format.as_deref());
    let registry = Registry::default().with(filter);

    match &config.file {
        Some(log_path) => {
            let file_appender = rolling_appender(log_path)?;
            if json {
                registry
                    .with(
                        fmt::layer()
                            .json()
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(file_appender),
                    )
                    .init();
            } else {
                registry
                    .with(
                        fmt::layer()
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_ansi(false)
                            .with_writer(file_appender),
                    )
                    .init();
            }
        }
        None => {
            if json {
                registry
                    .with(
                        fmt::layer()
                            .json()
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(io::stderr),
                    )
                    .init();
            } else {
                registry
                    .with(
                        fmt::layer()
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_writer(io::stderr),
                    )
                    .init();
            }
        }
    }

    Ok(())
}

/// Daily-rotating appender: `trakt-sync.log` becomes `trakt-sync.2025-05-10` etc.
fn rolling_appender(log_path: &Path) -> Result<RollingFileAppender> {
    let log_dir = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Log file path has no parent directory"))?;
    std::fs::create_dir_all(log_dir)?;

    let log_filename = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log filename"))?;
    let log_prefix = log_filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(log_filename);

    Ok(RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(0, false, "warn"), "warn");
        assert!(filter_directive(1, false, "info").starts_with("debug,"));
        assert_eq!(filter_directive(3, false, "info"), "trace");
        assert_eq!(filter_directive(2, true, "info"), "error");
    }

    #[test]
    fn test_explicit_format() {
        assert!(use_json(Some("JSON")));
        assert!(!use_json(Some("text")));
    }
}

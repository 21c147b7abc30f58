//! Logging setup

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::schema::LoggingConfig;

/// Prefix of the rolling log files, `chat-relay.log.YYYY-MM-DD`
const LOG_FILE_PREFIX: &str = "chat-relay.log";

/// Days a rolled log file is kept
const LOG_RETENTION_DAYS: u64 = 7;

/// HTTP plumbing capped at `warn` unless `RUST_LOG` says otherwise
const NOISY_MODULES: &[&str] = &["hyper", "h2", "reqwest", "rustls"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system.
///
/// `RUST_LOG` and `LOG_FORMAT` take precedence over the config values.
/// The returned guard must be held for the lifetime of the process so the
/// file writer flushes.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let json = format.eq_ignore_ascii_case("json");

    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layers = vec![
        output_layer(std::io::stdout, json, true),
        output_layer(non_blocking, json, false),
    ];

    Registry::default()
        .with(layers)
        .with(build_filter(config))
        .init();

    if let Err(e) = cleanup_old_logs(Path::new(&config.dir), LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config))
}

fn configured_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(&config.level);
    let noisy = NOISY_MODULES.iter().map(|module| (*module, "warn"));
    let configured = config
        .overrides
        .iter()
        .map(|(module, level)| (module.as_str(), level.as_str()));

    // Configured overrides come last so they win over the noise caps.
    for (module, level) in noisy.chain(configured) {
        match format!("{}={}", module, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => eprintln!("Invalid log directive: {}={}", module, level),
        }
    }
    filter
}

/// One output layer. JSON records carry the current span's fields, so a
/// `session_id` recorded on the exchange span shows up on every event
/// inside it. Source locations go to JSON and to plain files.
fn output_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi && !json)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(json || !ansi)
        .with_line_number(json || !ansi);

    if json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.boxed()
    }
}

/// Remove rolled log files older than `days` days
fn cleanup_old_logs(dir: &Path, days: u64) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let threshold = Duration::from_secs(days * 24 * 3600);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > threshold) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_follow_noise_caps() {
        let mut config = LoggingConfig::default();
        config.overrides.insert("reqwest".to_string(), "debug".to_string());
        let rendered = configured_filter(&config).to_string();

        assert!(rendered.contains("hyper=warn"));
        assert!(rendered.contains("reqwest=debug"));
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert_eq!(cleanup_old_logs(&missing, 7).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("chat-relay.log.2026-01-01"), "x").unwrap();
        std::fs::write(temp_dir.path().join("other.txt"), "y").unwrap();

        assert_eq!(cleanup_old_logs(temp_dir.path(), 7).unwrap(), 0);
        assert!(temp_dir.path().join("chat-relay.log.2026-01-01").exists());
        assert!(temp_dir.path().join("other.txt").exists());
    }
}

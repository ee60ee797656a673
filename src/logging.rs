use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::UtcTime, layer::Identity, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: stdout plus an optional rolling file appender.
///
/// The filter comes from `logging.level` when set, then `RUST_LOG`, then `info`.
/// The returned guard flushes the file writer on drop; hold it for the life of the process.
pub fn init_with_config(cfg: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = build_env_filter(cfg);

    match cfg.format {
        LogFormat::Json => init_json_logging(cfg, env_filter),
        LogFormat::Text => init_text_logging(cfg, env_filter),
    }
}

fn build_env_filter(cfg: &LoggingConfig) -> EnvFilter {
    match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn init_json_logging(cfg: &LoggingConfig, env_filter: EnvFilter) -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if cfg.enable_file_logging {
        if let Some((file_layer, guard)) = build_file_layer(cfg, |writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer)
        }) {
            let _ = registry.with(file_layer).try_init();
            return Some(guard);
        }
    }

    let _ = registry.with(Identity::new()).try_init();
    None
}

fn init_text_logging(cfg: &LoggingConfig, env_filter: EnvFilter) -> Option<WorkerGuard> {
    let registry = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stdout),
    );

    if cfg.enable_file_logging {
        if let Some((file_layer, guard)) = build_file_layer(cfg, |writer| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer)
        }) {
            let _ = registry.with(file_layer).try_init();
            return Some(guard);
        }
    }

    let _ = registry.with(Identity::new()).try_init();
    None
}

fn rotation_for(raw: &str) -> tracing_appender::rolling::Rotation {
    match raw.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    }
}

fn build_file_layer<F, L>(cfg: &LoggingConfig, build_layer: F) -> Option<(L, WorkerGuard)>
where
    F: FnOnce(tracing_appender::non_blocking::NonBlocking) -> L,
{
    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({err}), continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        rotation_for(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    Some((build_layer(non_blocking), guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use tracing_appender::rolling::Rotation;

    #[test]
    fn configured_level_wins_over_environment() {
        let cfg = LoggingConfig {
            level: Some(LogLevel::Warn),
            ..LoggingConfig::default()
        };
        assert_eq!(build_env_filter(&cfg).to_string(), "warn");
    }

    #[test]
    fn unknown_rotation_falls_back_to_daily() {
        assert_eq!(rotation_for("HOURLY"), Rotation::HOURLY);
        assert_eq!(rotation_for("never"), Rotation::NEVER);
        assert_eq!(rotation_for("weekly"), Rotation::DAILY);
    }

    #[test]
    fn file_layer_creates_the_log_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("logs");
        let cfg = LoggingConfig {
            dir: dir.to_string_lossy().into_owned(),
            enable_file_logging: true,
            ..LoggingConfig::default()
        };

        let built = build_file_layer(&cfg, |_writer| ());

        assert!(built.is_some());
        assert!(dir.is_dir());
    }
}

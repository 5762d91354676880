//! Tracing setup for the client binary.

use std::path::Path;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "raven-client.log";

/// Keeps the background log writer alive. Drop it last.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Console output filtered by `RUST_LOG` (warnings and the client's own info
/// by default), plus a daily rolling file in `log_dir` at debug level for the
/// client's crates.
pub fn init(log_dir: Option<&Path>) -> LoggingGuard {
    let console_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(
            std::env::var(EnvFilter::DEFAULT_ENV)
                .unwrap_or_else(|_| "raven_=info,hyper=off,reqwest=warn".to_string()),
        );

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
    ];

    let mut file_guard = None;
    let mut file_error = None;
    if let Some(dir) = log_dir {
        match file_layer(dir) {
            Ok((layer, guard)) => {
                layers.push(layer);
                file_guard = Some(guard);
            }
            Err(err) => file_error = Some(err),
        }
    }

    // A subscriber may already be installed (tests, embedding hosts).
    let _ = tracing_subscriber::registry().with(layers).try_init();

    if let Some(err) = file_error {
        tracing::warn!("File logging disabled: {}", err);
    }

    LoggingGuard { _file: file_guard }
}

fn file_layer(
    dir: &Path,
) -> Result<(Box<dyn Layer<Registry> + Send + Sync>, WorkerGuard), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create {}: {}", dir.display(), e))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|e| e.to_string())?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let targets = Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("raven_", LevelFilter::DEBUG);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(targets)
        .boxed();

    Ok((layer, guard))
}

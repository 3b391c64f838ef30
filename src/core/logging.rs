//! Log file setup
//!
//! The import log is opened once per run. Events go to the file (no ANSI
//! colors) and, with `verbose`, to stderr as well. The filter honours
//! `RUST_LOG` and defaults to `info`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global logger is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Keeps the log file alive; flushes it when dropped
pub struct LogGuard {
    file: Arc<File>,
    path: PathBuf,
}

impl LogGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let _ = (&*self.file).flush();
        let _ = self.file.sync_all();
    }
}

/// Install the global subscriber writing to `log_file`
pub fn init(log_file: &Path, verbose: bool) -> Result<LogGuard, LoggingError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|source| LoggingError::Open {
            path: log_file.to_path_buf(),
            source,
        })?;
    let file = Arc::new(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(file.clone());
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    Ok(LogGuard {
        file,
        path: log_file.to_path_buf(),
    })
}

// src/telemetry.rs
//! Tracing setup for the CLI: compact stderr output plus an append-only run log.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target used for the one-line run summary that ends every invocation.
pub const RUN_TARGET: &str = "dejiryu::run";

/// Install the global subscriber. Safe to call once per process.
///
/// The log file is opened in append mode; if that fails (read-only dir, bad
/// path) the run continues with stderr only.
pub fn init(log_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = open_append(log_path).map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(file_layer);

    if registry.try_init().is_err() {
        // Already initialised (tests, embedding host).
        return;
    }
    if let Some(p) = log_path.to_str() {
        tracing::debug!(log_path = p, "run log attached");
    }
}

fn open_append(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok()?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_append_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/run.log");
        assert!(open_append(&path).is_some());
        assert!(path.exists());
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TableError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// The source was readable but its contents were rejected.
    Error,
    /// The source itself could not be read.
    Critical,
}

impl LoadSeverity {
    /// Severity of a failed load.
    pub fn of(error: &TableError) -> Self {
        if error.is_io() {
            Self::Critical
        } else {
            Self::Error
        }
    }
}

/// Context about a load attempt.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Human-readable source label (a path, or `<reader>`).
    pub source: String,
    /// Number of columns in the schema being loaded.
    pub columns: usize,
}

/// Minimal stats reported on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of loaded rows.
    pub rows: usize,
}

/// Observer interface for load outcomes.
pub trait LoadObserver: Send + Sync {
    /// Called when a load succeeds.
    fn on_success(&self, _ctx: &LoadContext, _stats: LoadStats) {}

    /// Called when a load fails.
    fn on_failure(&self, _ctx: &LoadContext, _severity: LoadSeverity, _error: &TableError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Writes load events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl LoadObserver for StdErrObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        eprintln!(
            "[load][ok] source={} columns={} rows={}",
            ctx.source, ctx.columns, stats.rows
        );
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        eprintln!(
            "[load][{severity:?}] source={} columns={} err={error}",
            ctx.source, ctx.columns
        );
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        eprintln!(
            "[ALERT][load][{severity:?}] source={} columns={} err={error}",
            ctx.source, ctx.columns
        );
    }
}

/// Forwards load events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl LoadObserver for LogObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        log::info!(
            "loaded {} rows of {} columns from {}",
            stats.rows, ctx.columns, ctx.source
        );
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        let (source, columns) = (&ctx.source, ctx.columns);
        match severity {
            LoadSeverity::Info => log::info!("load of {source} ({columns} columns) failed: {error}"),
            LoadSeverity::Warning => {
                log::warn!("load of {source} ({columns} columns) failed: {error}")
            }
            LoadSeverity::Error | LoadSeverity::Critical => {
                log::error!("load of {source} ({columns} columns) failed ({severity:?}): {error}")
            }
        }
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        log::error!(
            "ALERT load of {} ({} columns) failed ({severity:?}): {error}",
            ctx.source,
            ctx.columns
        );
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.append_line(&format!(
            "{} ok source={} columns={} rows={}",
            unix_ts(),
            ctx.source,
            ctx.columns,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} source={} columns={} err={error}",
            unix_ts(),
            ctx.source,
            ctx.columns
        ));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &TableError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} source={} columns={} err={error}",
            unix_ts(),
            ctx.source,
            ctx.columns
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Loading delimited text into a [`crate::table::Table`].
//!
//! [`load_from_reader`] and [`load_from_path`] drive a [`Loader`] to completion (fail-fast) and
//! optionally report the outcome to a [`LoadObserver`] configured on [`LoadOptions`].
//! [`Loader`] itself is a lazy, one-pass row producer for callers that want to stream.

pub mod loader;
pub mod observability;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::TableResult;
use crate::schema::Schema;
use crate::table::Table;

pub use loader::{LoadOptions, Loader};
pub use observability::{
    CompositeObserver, FileObserver, LoadContext, LoadObserver, LoadSeverity, LoadStats, LogObserver,
    StdErrObserver,
};

/// Load a table from any reader.
pub fn load_from_reader<R: Read>(
    reader: R,
    schema: Arc<Schema>,
    options: &LoadOptions,
) -> TableResult<Table> {
    let ctx = LoadContext {
        source: "<reader>".to_string(),
        columns: schema.len(),
    };
    let result = collect(reader, schema, options);
    report(options, &ctx, &result);
    result
}

/// Load a table from a file. The file handle is released before this returns, on every path.
pub fn load_from_path(
    path: impl AsRef<Path>,
    schema: Arc<Schema>,
    options: &LoadOptions,
) -> TableResult<Table> {
    let path = path.as_ref();
    let ctx = LoadContext {
        source: path.display().to_string(),
        columns: schema.len(),
    };
    let result = File::open(path)
        .map_err(Into::into)
        .and_then(|file| collect(file, schema, options));
    report(options, &ctx, &result);
    result
}

fn collect<R: Read>(reader: R, schema: Arc<Schema>, options: &LoadOptions) -> TableResult<Table> {
    let loader = Loader::new(reader, Arc::clone(&schema), options)?;
    let rows = loader.collect::<TableResult<Vec<_>>>()?;
    Ok(Table::from_loaded(schema, rows))
}

fn report(options: &LoadOptions, ctx: &LoadContext, result: &TableResult<Table>) {
    match result {
        Ok(table) => log::debug!("loaded {} rows from {}", table.len(), ctx.source),
        Err(e) => log::debug!("load of {} failed: {e}", ctx.source),
    }

    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok(table) => obs.on_success(ctx, LoadStats { rows: table.len() }),
        Err(e) => {
            let sev = LoadSeverity::of(e);
            obs.on_failure(ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

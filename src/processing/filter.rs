//! Row filtering for [`crate::table::Table`].

use crate::table::{Row, Table};

/// Returns a new [`Table`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`Table::filter_rows`].
pub fn filter<F>(table: &Table, predicate: F) -> Table
where
    F: FnMut(&Row) -> bool,
{
    table.filter_rows(predicate)
}

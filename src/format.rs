//! Rendering of [`GroupResult`]s for display. Nothing in the grouping path depends on this.

use std::fmt::Write;

use serde::Serialize;

use crate::processing::GroupResult;
use crate::table::Row;
use crate::types::Value;

/// Plain-text rendering of one group's value.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Value {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl Render for Row {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl<T: Render + ?Sized> Render for &T {
    fn render(&self) -> String {
        (**self).render()
    }
}

impl<T: Render> Render for Vec<T> {
    fn render(&self) -> String {
        let items: Vec<String> = self.iter().map(Render::render).collect();
        format!("[{}]", items.join(", "))
    }
}

/// One `key: value` line per group, in group order.
///
/// ```rust
/// # use std::sync::Arc;
/// # use typed_table::schema::{Field, Schema};
/// # use typed_table::table::Table;
/// # use typed_table::types::{DataType, Value};
/// use typed_table::format;
/// use typed_table::processing::{GroupRequest, Reduction};
/// # let schema = Arc::new(Schema::new(vec![
/// #     Field::new("department"),
/// #     Field::typed("salary", DataType::Int64),
/// # ]).unwrap());
/// # let table = Table::from_rows(schema, vec![
/// #     vec![Value::from("eng"), Value::Int64(100)],
/// #     vec![Value::from("sales"), Value::Int64(50)],
/// #     vec![Value::from("eng"), Value::Int64(200)],
/// # ]).unwrap();
///
/// let totals = table
///     .group_by_with(&GroupRequest::new("department").function(Reduction::Sum).key("salary"))
///     .unwrap();
/// assert_eq!(format::text(&totals), "eng: 300\nsales: 50\n");
/// ```
pub fn text<V: Render>(result: &GroupResult<V>) -> String {
    let mut out = String::new();
    for (key, value) in result {
        let _ = writeln!(out, "{key}: {}", value.render());
    }
    out
}

#[derive(Serialize)]
struct Entry<'a, V> {
    key: &'a crate::processing::GroupKey,
    value: &'a V,
}

/// JSON array of `{"key": [...], "value": ...}` objects, in group order.
pub fn json<V: Serialize>(result: &GroupResult<V>) -> serde_json::Result<serde_json::Value> {
    let entries: Vec<Entry<'_, V>> = result.iter().map(|(key, value)| Entry { key, value }).collect();
    serde_json::to_value(entries)
}

//! Queries over a loaded [`crate::table::Table`].
//!
//! - [`group`]: stable partitioning by key columns and per-group reduction
//! - [`reduce`]: the [`Reduce`] capability, built-in [`Reduction`]s and closure [`Reducer`]s
//! - [`filter()`]: row filtering into a new table
//!
//! ## Example: grouped sum
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use typed_table::processing::{GroupRequest, Reduction};
//! use typed_table::schema::{Field, Schema};
//! use typed_table::table::Table;
//! use typed_table::types::{DataType, Value};
//!
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("department"),
//!     Field::typed("salary", DataType::Int64),
//! ]).unwrap());
//! let csv = "department,salary\neng,100\nsales,50\neng,200\n";
//! let table = Table::open(schema, csv.as_bytes(), &Default::default()).unwrap();
//!
//! let totals = table
//!     .group_by_with(&GroupRequest::new("department").function(Reduction::Sum).key("salary"))
//!     .unwrap();
//! let keys: Vec<String> = totals.keys().map(|k| k.to_string()).collect();
//! assert_eq!(keys, ["eng", "sales"]);
//! assert_eq!(totals.get("eng"), Some(&Value::Int64(300)));
//! ```

pub mod filter;
pub mod group;
pub mod reduce;

pub use filter::filter;
pub use group::{GroupKey, GroupRequest, GroupResult, KeySpec};
pub use reduce::{reduce, Reduce, Reducer, Reduction};

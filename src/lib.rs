//! `typed-table` loads delimited text into an in-memory [`table::Table`] whose shape is fixed by
//! a declared [`schema::Schema`], and answers grouped aggregation queries over it.
//!
//! A table type declares an ordered column listing and one [`schema::Field`] per column. Each
//! field says how its raw text is converted: kept as-is, parsed into a built-in
//! [`types::DataType`], or passed through a custom conversion. Loading is fail-fast: the first
//! record with the wrong number of fields or a value that will not convert aborts the load, and
//! the error names the record number and column.
//!
//! ## Declaring and loading a table
//!
//! ```rust
//! use typed_table::schema::Field;
//! use typed_table::table::TableDef;
//! use typed_table::types::DataType;
//!
//! struct Employees;
//!
//! impl TableDef for Employees {
//!     const COLUMNS: &'static [&'static str] = &["name", "salary", "department"];
//!
//!     fn fields() -> Vec<Field> {
//!         vec![
//!             Field::new("name"),
//!             Field::typed("salary", DataType::Int64),
//!             Field::new("department"),
//!         ]
//!     }
//! }
//!
//! # fn main() -> Result<(), typed_table::TableError> {
//! let csv = "name,salary,department\nAda,100,eng\nBob,50,sales\nEve,200,eng\n";
//! let table = Employees::open(csv.as_bytes())?;
//! assert_eq!(table.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Grouping
//!
//! [`table::Table::group_by`] partitions rows by one or more columns. Groups keep the order in
//! which their key first appears, and members keep row order.
//! [`table::Table::group_by_with`] additionally reduces one value column per group:
//!
//! ```rust
//! # use typed_table::schema::Field;
//! # use typed_table::table::TableDef;
//! # use typed_table::types::{DataType, Value};
//! use typed_table::processing::{GroupRequest, Reduction};
//! # struct Employees;
//! # impl TableDef for Employees {
//! #     const COLUMNS: &'static [&'static str] = &["name", "salary", "department"];
//! #     fn fields() -> Vec<Field> {
//! #         vec![Field::new("name"), Field::typed("salary", DataType::Int64), Field::new("department")]
//! #     }
//! # }
//! # let csv = "name,salary,department\nAda,100,eng\nBob,50,sales\nEve,200,eng\n";
//! # let table = Employees::open(csv.as_bytes()).unwrap();
//!
//! let members = table.group_by("department").unwrap();
//! assert_eq!(members.get("eng").unwrap().len(), 2);
//!
//! let totals = table
//!     .group_by_with(&GroupRequest::new("department").function(Reduction::Sum).key("salary"))
//!     .unwrap();
//! assert_eq!(totals.get("eng"), Some(&Value::Int64(300)));
//! assert_eq!(totals.get("sales"), Some(&Value::Int64(50)));
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: fields, coercion and schema validation
//! - [`table`]: rows, tables and table-type declarations
//! - [`ingestion`]: the delimited-text loader, load options and observers
//! - [`processing`]: grouping, reductions and filtering
//! - [`format`]: optional text/JSON rendering of group results
//! - [`error`]: error types

pub mod error;
pub mod format;
pub mod ingestion;
pub mod processing;
pub mod schema;
pub mod table;
pub mod types;

pub use error::{CoercionError, RecordError, TableError, TableResult};

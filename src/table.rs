//! The loaded, immutable [`Table`] and its [`Row`]s.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{TableError, TableResult};
use crate::ingestion::{self, LoadOptions};
use crate::processing::group::{self, GroupRequest, GroupResult, KeySpec};
use crate::processing::reduce::{self, Reducer};
use crate::schema::{Field, Schema};
use crate::types::Value;

/// One coerced record. Values are stored in schema order.
#[derive(Debug, Clone)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    /// Value of the named column, if the schema declares it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.index_of(column).map(|idx| &self.values[idx])
    }

    /// Value at a schema position.
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Column names, in schema order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.schema.field_names()
    }

    /// `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns().zip(self.values.iter())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && (Arc::ptr_eq(&self.schema, &other.schema) || self.columns().eq(other.columns()))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (column, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Static declaration of a table type: its column listing and one [`Field`] per column.
///
/// ```rust
/// use typed_table::schema::Field;
/// use typed_table::table::TableDef;
/// use typed_table::types::DataType;
///
/// struct Employees;
///
/// impl TableDef for Employees {
///     const COLUMNS: &'static [&'static str] = &["name", "salary", "department"];
///
///     fn fields() -> Vec<Field> {
///         vec![
///             Field::new("name"),
///             Field::typed("salary", DataType::Int64),
///             Field::new("department"),
///         ]
///     }
/// }
///
/// let table = Employees::open("name,salary,department\nAda,100,eng\n".as_bytes()).unwrap();
/// assert_eq!(table.len(), 1);
/// ```
pub trait TableDef {
    /// Ordered column names.
    const COLUMNS: &'static [&'static str];

    /// One field per entry in [`Self::COLUMNS`], in any order.
    fn fields() -> Vec<Field>;

    /// The frozen schema for this table type.
    fn schema() -> TableResult<Arc<Schema>> {
        Schema::declare(Self::COLUMNS, Self::fields()).map(Arc::new)
    }

    /// Load a table of this type from a reader with default options.
    fn open<R: Read>(reader: R) -> TableResult<Table> {
        Self::open_with(reader, &LoadOptions::default())
    }

    fn open_with<R: Read>(reader: R, options: &LoadOptions) -> TableResult<Table> {
        Table::open(Self::schema()?, reader, options)
    }

    fn open_path(path: impl AsRef<Path>) -> TableResult<Table> {
        Table::open_path(Self::schema()?, path, &LoadOptions::default())
    }
}

/// In-memory table: a schema plus rows in load order.
///
/// A table is immutable once loaded; every query borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Table {
    /// Load a table from delimited text.
    ///
    /// Fails fast: the first malformed record aborts the load and no table is returned.
    pub fn open<R: Read>(schema: Arc<Schema>, reader: R, options: &LoadOptions) -> TableResult<Self> {
        ingestion::load_from_reader(reader, schema, options)
    }

    /// Load a table from a delimited text file.
    pub fn open_path(
        schema: Arc<Schema>,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> TableResult<Self> {
        ingestion::load_from_path(path, schema, options)
    }

    /// Build a table from already-typed values.
    ///
    /// Each inner vector must have one value per schema column.
    pub fn from_rows(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> TableResult<Self> {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, values)| {
                if values.len() != schema.len() {
                    return Err(TableError::RowShape {
                        record: idx + 1,
                        expected: schema.len(),
                        found: values.len(),
                    });
                }
                Ok(Row::new(Arc::clone(&schema), values))
            })
            .collect::<TableResult<Vec<_>>>()?;
        Ok(Self { schema, rows })
    }

    pub(crate) fn from_loaded(schema: Arc<Schema>, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in load order. Each call starts a fresh pass.
    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    /// Columnar view over one column.
    pub fn column(&self, name: &str) -> TableResult<Column<'_>> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| TableError::unknown_column(name))?;
        Ok(Column {
            index,
            rows: &self.rows,
        })
    }

    /// New table containing only the rows for which `predicate` returns `true`.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|row| predicate(row)).cloned().collect();
        Self {
            schema: Arc::clone(&self.schema),
            rows,
        }
    }

    /// Partition rows by one or more key columns; each group holds its member rows in row order.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use typed_table::schema::{Field, Schema};
    /// use typed_table::table::Table;
    /// use typed_table::types::{DataType, Value};
    ///
    /// let schema = Arc::new(Schema::new(vec![
    ///     Field::new("department"),
    ///     Field::typed("salary", DataType::Int64),
    /// ]).unwrap());
    /// let table = Table::from_rows(schema, vec![
    ///     vec![Value::from("eng"), Value::Int64(100)],
    ///     vec![Value::from("sales"), Value::Int64(50)],
    ///     vec![Value::from("eng"), Value::Int64(200)],
    /// ]).unwrap();
    ///
    /// let groups = table.group_by("department").unwrap();
    /// assert_eq!(groups.get("eng").unwrap().len(), 2);
    /// assert_eq!(groups.get("sales").unwrap().len(), 1);
    /// ```
    pub fn group_by(&self, keys: impl Into<KeySpec>) -> TableResult<GroupResult<Vec<&Row>>> {
        group::partition(self, &keys.into())
    }

    /// Partition rows and reduce each group's values of the request's value column.
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use typed_table::schema::{Field, Schema};
    /// # use typed_table::table::Table;
    /// # use typed_table::types::{DataType, Value};
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
    /// let request = GroupRequest::new("department").function(Reduction::Sum).key("salary");
    /// let totals = table.group_by_with(&request).unwrap();
    /// assert_eq!(totals.get("eng"), Some(&Value::Int64(300)));
    /// assert_eq!(totals.get("sales"), Some(&Value::Int64(50)));
    /// ```
    pub fn group_by_with(&self, request: &GroupRequest) -> TableResult<GroupResult<Value>> {
        group::aggregate(self, request)
    }

    /// Reduce an entire column.
    pub fn reduce(&self, column: &str, reducer: impl Into<Reducer>) -> TableResult<Value> {
        reduce::reduce(self, column, reducer)
    }
}

/// Borrowed view over the values of one column, in row order.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    index: usize,
    rows: &'a [Row],
}

impl<'a> Column<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a Value> + 'a {
        let index = self.index;
        self.rows.iter().map(move |row| &row.values[index])
    }

    /// Position of this column in the schema.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Table, TableDef};
    use crate::error::TableError;
    use crate::schema::{Field, Schema};
    use crate::types::{DataType, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                Field::new("name"),
                Field::typed("salary", DataType::Int64),
            ])
            .unwrap(),
        )
    }

    fn sample() -> Table {
        Table::from_rows(
            schema(),
            vec![
                vec![Value::from("a"), Value::Int64(1)],
                vec![Value::from("b"), Value::Int64(2)],
                vec![Value::from("c"), Value::Int64(3)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_is_restartable() {
        let t = sample();
        let first: Vec<_> = t.rows().collect();
        let second: Vec<_> = t.rows().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn column_view_follows_row_order() {
        let t = sample();
        let col = t.column("salary").unwrap();
        assert_eq!(col.index(), 1);
        assert_eq!(
            col.iter().cloned().collect::<Vec<_>>(),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]
        );
        assert!(matches!(t.column("region"), Err(TableError::UnknownColumn { .. })));
    }

    #[test]
    fn from_rows_rejects_wrong_arity() {
        let err = Table::from_rows(schema(), vec![vec![Value::from("a")]]).unwrap_err();
        assert!(matches!(
            err,
            TableError::RowShape { record: 1, expected: 2, found: 1 }
        ));
    }

    #[test]
    fn filter_rows_preserves_schema_and_original() {
        let t = sample();
        let out = t.filter_rows(|row| matches!(row.get("salary"), Some(Value::Int64(v)) if *v > 1));
        assert_eq!(out.len(), 2);
        assert!(Arc::ptr_eq(out.schema(), t.schema()));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn row_display_and_serialize() {
        let t = sample();
        let row = t.row(0).unwrap();
        assert_eq!(row.to_string(), "{name: a, salary: 1}");
        assert_eq!(
            serde_json::to_string(row).unwrap(),
            r#"{"name":"a","salary":1}"#
        );
    }

    struct Bad;

    impl TableDef for Bad {
        const COLUMNS: &'static [&'static str] = &["a", "b"];

        fn fields() -> Vec<Field> {
            vec![Field::new("a")]
        }
    }

    #[test]
    fn table_def_with_undeclared_column_fails_before_load() {
        let err = Bad::open("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Schema { .. }));
    }
}

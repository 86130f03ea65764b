use thiserror::Error;

/// Boxed error type returned by custom [`crate::schema::Coercer`]s.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Error type returned by loading, querying and reducing a [`crate::table::Table`].
///
/// Row-level variants carry a 1-based `record` number counted over the whole source, so the
/// header (when present) is record 1 and the first data record is record 2.
#[derive(Debug, Error)]
pub enum TableError {
    /// Underlying I/O error (e.g. file not found, permission denied, read failure).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited source could not be tokenized.
    #[error("csv error: {0}")]
    Csv(csv::Error),

    /// The schema declaration is malformed (empty, duplicate or undeclared columns).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// The header record does not list exactly the schema's columns, in order.
    #[error("header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A record's field count does not match the schema's column count.
    #[error("record {record}: expected {expected} fields, found {found}")]
    RowShape {
        record: usize,
        expected: usize,
        found: usize,
    },

    /// A raw value could not be converted by its field's coercion.
    #[error("record {record}: {source}")]
    Coercion {
        record: usize,
        #[source]
        source: CoercionError,
    },

    /// A grouping or lookup referenced a column the schema does not declare.
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    /// A grouping request is incomplete or inconsistent.
    #[error("invalid grouping request: {message}")]
    Config { message: String },

    /// A reduction was handed a value it cannot operate on.
    #[error("type mismatch in column '{column}': {reduction} cannot reduce {value}")]
    TypeMismatch {
        column: String,
        reduction: String,
        value: String,
    },

    /// Integer arithmetic overflowed while reducing a column.
    #[error("numeric overflow while reducing column '{column}'")]
    NumericOverflow { column: String },
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return Self::Csv(err);
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            _ => unreachable!("is_io_error implies ErrorKind::Io"),
        }
    }
}

impl TableError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }

    /// The 1-based record number responsible for this error, if it is a row-level error.
    pub fn record(&self) -> Option<usize> {
        match self {
            Self::RowShape { record, .. } | Self::Coercion { record, .. } => Some(*record),
            _ => None,
        }
    }

    /// Whether the error originated from the source itself rather than its contents.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// A field's raw value could not be converted into a typed [`crate::types::Value`].
#[derive(Debug, Error)]
#[error("failed to coerce column '{column}' (raw='{raw}'): {source}")]
pub struct CoercionError {
    /// Name of the field whose coercion failed.
    pub column: String,
    /// The offending raw text.
    pub raw: String,
    /// Underlying conversion failure.
    #[source]
    pub source: BoxError,
}

impl CoercionError {
    pub(crate) fn new(column: &str, raw: &str, source: impl Into<BoxError>) -> Self {
        Self {
            column: column.to_owned(),
            raw: raw.to_owned(),
            source: source.into(),
        }
    }
}

/// Failure to build a single row, before the loader has attached the record number.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Field count mismatch.
    #[error("expected {expected} fields, found {found}")]
    Shape { expected: usize, found: usize },

    /// A field's coercion failed; the whole row is rejected.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

impl RecordError {
    /// Attach the 1-based record number this failure belongs to.
    pub fn at(self, record: usize) -> TableError {
        match self {
            Self::Shape { expected, found } => TableError::RowShape {
                record,
                expected,
                found,
            },
            Self::Coercion(source) => TableError::Coercion { record, source },
        }
    }
}

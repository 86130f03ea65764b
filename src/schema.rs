//! Schema declaration: typed [`Field`]s and the ordered, immutable [`Schema`] built from them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, CoercionError, RecordError, TableError, TableResult};
use crate::table::Row;
use crate::types::{DataType, Value};

/// A caller-supplied conversion from raw text into a [`Value`].
#[derive(Clone)]
pub struct Coercer {
    inner: Arc<dyn Fn(&str) -> Result<Value, BoxError> + Send + Sync>,
}

impl Coercer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    fn call(&self, raw: &str) -> Result<Value, BoxError> {
        (self.inner)(raw)
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Coercer(..)")
    }
}

#[derive(Debug, Clone)]
enum Conversion {
    Builtin(DataType),
    Custom(Coercer),
}

impl PartialEq for Conversion {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

/// One named column and the rule that converts its raw text into a [`Value`].
///
/// Fields are required by default: the raw text, even when empty, is always handed to the
/// conversion. An optional field maps blank text to its default (or [`Value::Null`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name.
    pub name: String,
    conversion: Conversion,
    required: bool,
    default: Option<Value>,
}

impl Field {
    /// An identity field: raw text is kept unchanged as [`Value::Utf8`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name, DataType::Utf8)
    }

    /// A field using one of the built-in conversions.
    pub fn typed(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            conversion: Conversion::Builtin(data_type),
            required: true,
            default: None,
        }
    }

    /// A field using a custom conversion.
    ///
    /// ```rust
    /// use typed_table::schema::Field;
    /// use typed_table::types::Value;
    ///
    /// let cents = Field::custom("price", |raw: &str| {
    ///     let dollars: f64 = raw.trim_start_matches('$').parse()?;
    ///     Ok(Value::Int64((dollars * 100.0).round() as i64))
    /// });
    /// assert_eq!(cents.coerce("$1.25").unwrap(), Value::Int64(125));
    /// ```
    pub fn custom<F>(name: impl Into<String>, coerce: F) -> Self
    where
        F: Fn(&str) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            conversion: Conversion::Custom(Coercer::new(coerce)),
            required: true,
            default: None,
        }
    }

    /// Mark the field optional: blank raw values become [`Value::Null`].
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the field optional with a default for blank raw values.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(default.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The built-in data type, or `None` for custom conversions.
    pub fn data_type(&self) -> Option<DataType> {
        match &self.conversion {
            Conversion::Builtin(dt) => Some(*dt),
            Conversion::Custom(_) => None,
        }
    }

    /// Convert one raw value.
    pub fn coerce(&self, raw: &str) -> Result<Value, CoercionError> {
        if !self.required && raw.trim().is_empty() {
            return Ok(self.default.clone().unwrap_or(Value::Null));
        }

        let converted = match &self.conversion {
            Conversion::Builtin(dt) => convert_builtin(*dt, raw),
            Conversion::Custom(c) => c.call(raw),
        };
        converted.map_err(|e| CoercionError::new(&self.name, raw, e))
    }
}

fn convert_builtin(data_type: DataType, raw: &str) -> Result<Value, BoxError> {
    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        DataType::Int64 => Ok(Value::Int64(raw.trim().parse::<i64>()?)),
        DataType::Float64 => Ok(Value::Float64(raw.trim().parse::<f64>()?)),
        DataType::Bool => Ok(Value::Bool(parse_bool(raw.trim())?)),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Ordered, immutable list of fields describing the shape of every row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema whose columns are the given fields, in order.
    pub fn new(fields: Vec<Field>) -> TableResult<Self> {
        let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        Self::declare(&names, fields)
    }

    /// Build a schema from a column listing plus one field per listed column.
    ///
    /// Fields may be supplied in any order; the resulting schema follows `columns`.
    pub fn declare<S: AsRef<str>>(columns: &[S], fields: Vec<Field>) -> TableResult<Self> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !is_identifier(&field.name) {
                return Err(TableError::schema(format!(
                    "field name '{}' is not a valid identifier",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TableError::schema(format!(
                    "field '{}' is declared more than once",
                    field.name
                )));
            }
        }

        let unordered = Self { fields };
        unordered.validate(columns)?;

        let mut fields = unordered.fields;
        if let Some(extra) = fields
            .iter()
            .find(|f| !columns.iter().any(|c| c.as_ref() == f.name))
        {
            return Err(TableError::schema(format!(
                "field '{}' is not listed in columns",
                extra.name
            )));
        }
        fields.sort_by_key(|f| {
            columns
                .iter()
                .position(|c| c.as_ref() == f.name)
                .unwrap_or(usize::MAX)
        });

        Ok(Self { fields })
    }

    /// Check a column listing against this schema's fields.
    ///
    /// Fails if the listing is empty, repeats a name, or names a column without a field.
    pub fn validate<S: AsRef<str>>(&self, column_names: &[S]) -> TableResult<()> {
        if column_names.is_empty() {
            return Err(TableError::schema("no columns declared"));
        }

        let mut seen = HashSet::with_capacity(column_names.len());
        for name in column_names {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(TableError::schema(format!("duplicate column '{name}'")));
            }
            if self.index_of(name).is_none() {
                return Err(TableError::schema(format!(
                    "column '{name}' has no field declared. fields={:?}",
                    self.field_names().collect::<Vec<_>>()
                )));
            }
        }
        Ok(())
    }

    /// Coerce one raw record into a [`Row`].
    ///
    /// No partial rows: the first failing field rejects the whole record.
    pub fn build_row<I, S>(self: &Arc<Self>, raw_record: I) -> Result<Row, RecordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<S> = raw_record.into_iter().collect();
        if raw.len() != self.fields.len() {
            return Err(RecordError::Shape {
                expected: self.fields.len(),
                found: raw.len(),
            });
        }

        let values = self
            .fields
            .iter()
            .zip(raw.iter())
            .map(|(field, raw)| field.coerce(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Row::new(Arc::clone(self), values))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

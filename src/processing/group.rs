//! Grouping: stable partitioning of table rows by key columns, plus per-group reduction.
//!
//! Partitioning is a single pass over the table in row order. Groups appear in the result in
//! the order their key is first seen, and each group keeps its members in row order, whether or
//! not a reduction is applied afterwards.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::{TableError, TableResult};
use crate::schema::Schema;
use crate::table::{Row, Table};
use crate::types::Value;

use super::reduce::Reducer;

/// The column(s) a table is grouped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    columns: Vec<String>,
}

impl KeySpec {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn resolve(&self, schema: &Schema) -> TableResult<Vec<usize>> {
        if self.columns.is_empty() {
            return Err(TableError::config("at least one grouping column is required"));
        }
        self.columns
            .iter()
            .map(|c| schema.index_of(c).ok_or_else(|| TableError::unknown_column(c)))
            .collect()
    }
}

impl From<&str> for KeySpec {
    fn from(column: &str) -> Self {
        Self {
            columns: vec![column.to_owned()],
        }
    }
}

impl From<String> for KeySpec {
    fn from(column: String) -> Self {
        Self {
            columns: vec![column],
        }
    }
}

impl From<&[&str]> for KeySpec {
    fn from(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for KeySpec {
    fn from(columns: [&str; N]) -> Self {
        Self::from(columns.as_slice())
    }
}

impl From<Vec<String>> for KeySpec {
    fn from(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

/// Tuple of key-column values identifying one group.
///
/// Equality is value equality per column. Numbers compare by value across `Int64` and
/// `Float64`, so `1` and `1.0` form one group. Floats otherwise compare by canonical bit
/// pattern: all NaNs form a single group and `-0.0` groups with `0.0`.
#[derive(Debug, Clone)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// The value of a single-column key.
    pub fn single(&self) -> Option<&Value> {
        match self.0.as_slice() {
            [v] => Some(v),
            _ => None,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// The integer a float is exactly equal to, if any.
fn integral(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn key_part_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float64(x), Value::Float64(y)) => canonical_bits(*x) == canonical_bits(*y),
        (Value::Int64(i), Value::Float64(f)) | (Value::Float64(f), Value::Int64(i)) => {
            integral(*f) == Some(*i)
        }
        _ => a == b,
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| key_part_eq(a, b))
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for v in &self.0 {
            match v {
                Value::Null => 0u8.hash(state),
                Value::Int64(x) => {
                    1u8.hash(state);
                    x.hash(state);
                }
                Value::Float64(x) => match integral(*x) {
                    Some(i) => {
                        1u8.hash(state);
                        i.hash(state);
                    }
                    None => {
                        2u8.hash(state);
                        canonical_bits(*x).hash(state);
                    }
                },
                Value::Bool(x) => {
                    3u8.hash(state);
                    x.hash(state);
                }
                Value::Utf8(s) => {
                    4u8.hash(state);
                    s.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.single() {
            return write!(f, "{v}");
        }
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(")")
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl From<Value> for GroupKey {
    fn from(v: Value) -> Self {
        Self(vec![v])
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self(vec![Value::from(s)])
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        Self(vec![Value::Utf8(s)])
    }
}

impl From<i64> for GroupKey {
    fn from(v: i64) -> Self {
        Self(vec![Value::Int64(v)])
    }
}

impl From<f64> for GroupKey {
    fn from(v: f64) -> Self {
        Self(vec![Value::Float64(v)])
    }
}

impl From<bool> for GroupKey {
    fn from(v: bool) -> Self {
        Self(vec![Value::Bool(v)])
    }
}

impl From<Vec<Value>> for GroupKey {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Insertion-ordered mapping from [`GroupKey`] to a per-group value.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult<V> {
    groups: IndexMap<GroupKey, V>,
}

impl<V> GroupResult<V> {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: impl Into<GroupKey>) -> Option<&V> {
        self.groups.get(&key.into())
    }

    /// Group at a first-seen position.
    pub fn get_index(&self, idx: usize) -> Option<(&GroupKey, &V)> {
        self.groups.get_index(idx)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, GroupKey, V> {
        self.groups.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, GroupKey, V> {
        self.groups.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, GroupKey, V> {
        self.groups.values()
    }

    /// Transform every group's value, keeping group order.
    pub fn map_values<U, F>(self, mut f: F) -> GroupResult<U>
    where
        F: FnMut(&GroupKey, V) -> U,
    {
        GroupResult {
            groups: self
                .groups
                .into_iter()
                .map(|(k, v)| {
                    let u = f(&k, v);
                    (k, u)
                })
                .collect(),
        }
    }
}

impl<V> IntoIterator for GroupResult<V> {
    type Item = (GroupKey, V);
    type IntoIter = indexmap::map::IntoIter<GroupKey, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a GroupResult<V> {
    type Item = (&'a GroupKey, &'a V);
    type IntoIter = indexmap::map::Iter<'a, GroupKey, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// A grouped reduction: key column(s), a reduction function and the value column it reduces.
///
/// ```rust
/// use typed_table::processing::{GroupRequest, Reduction};
///
/// let request = GroupRequest::new(["department", "level"])
///     .function(Reduction::Mean)
///     .key("salary");
/// assert_eq!(request.keys().columns(), ["department", "level"]);
/// ```
#[derive(Debug, Clone)]
pub struct GroupRequest {
    keys: KeySpec,
    function: Option<Reducer>,
    key: Option<String>,
}

impl GroupRequest {
    pub fn new(keys: impl Into<KeySpec>) -> Self {
        Self {
            keys: keys.into(),
            function: None,
            key: None,
        }
    }

    /// The reduction applied to each group's values.
    pub fn function(mut self, function: impl Into<Reducer>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// The column whose values are reduced.
    pub fn key(mut self, column: impl Into<String>) -> Self {
        self.key = Some(column.into());
        self
    }

    pub fn keys(&self) -> &KeySpec {
        &self.keys
    }
}

fn project(row: &Row, idxs: &[usize]) -> GroupKey {
    GroupKey(idxs.iter().map(|&i| row.values()[i].clone()).collect())
}

/// Partition `table` by `keys`; each group holds its member rows in row order.
pub fn partition<'a>(table: &'a Table, keys: &KeySpec) -> TableResult<GroupResult<Vec<&'a Row>>> {
    let idxs = keys.resolve(table.schema())?;
    log::trace!("grouping {} rows by {:?}", table.len(), keys.columns());

    let mut groups: IndexMap<GroupKey, Vec<&Row>> = IndexMap::new();
    for row in table.rows() {
        groups.entry(project(row, &idxs)).or_default().push(row);
    }
    Ok(GroupResult { groups })
}

/// Partition `table` and reduce each group's values of the request's value column.
///
/// The request is validated before any partitioning work starts.
pub fn aggregate(table: &Table, request: &GroupRequest) -> TableResult<GroupResult<Value>> {
    let schema = table.schema();
    let idxs = request.keys.resolve(schema)?;
    let function = request
        .function
        .as_ref()
        .ok_or_else(|| TableError::config("no reduction function supplied"))?;
    let column = request.key.as_deref().ok_or_else(|| {
        TableError::config(format!(
            "reduction '{}' requires a value column (key)",
            function.name()
        ))
    })?;
    let value_idx = schema.index_of(column).ok_or_else(|| {
        TableError::config(format!("value column '{column}' is not declared in the schema"))
    })?;
    log::trace!(
        "reducing {} rows by {:?} with {} over '{column}'",
        table.len(),
        request.keys.columns(),
        function.name()
    );

    let mut buckets: IndexMap<GroupKey, Vec<&Value>> = IndexMap::new();
    for row in table.rows() {
        buckets
            .entry(project(row, &idxs))
            .or_default()
            .push(&row.values()[value_idx]);
    }

    let mut groups = IndexMap::with_capacity(buckets.len());
    for (key, values) in buckets {
        let reduced = function.reduce(column, &values)?;
        groups.insert(key, reduced);
    }
    Ok(GroupResult { groups })
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::GroupKey;
    use crate::types::Value;

    fn hash_of(k: &GroupKey) -> u64 {
        let mut h = DefaultHasher::new();
        k.hash(&mut h);
        h.finish()
    }

    #[test]
    fn nan_keys_are_mutually_equal() {
        let a = GroupKey::from(f64::NAN);
        let b = GroupKey::from(-f64::NAN);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn signed_zero_keys_are_equal() {
        let a = GroupKey::from(0.0);
        let b = GroupKey::from(-0.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn string_keys_are_case_sensitive() {
        assert_ne!(GroupKey::from("Eng"), GroupKey::from("eng"));
        assert_ne!(GroupKey::from(""), GroupKey::from(Value::Null));
    }

    #[test]
    fn integral_float_keys_equal_integer_keys() {
        let a = GroupKey::from(1_i64);
        let b = GroupKey::from(1.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(GroupKey::from(0_i64), GroupKey::from(-0.0));
        assert_eq!(hash_of(&GroupKey::from(0_i64)), hash_of(&GroupKey::from(-0.0)));

        assert_ne!(GroupKey::from(1_i64), GroupKey::from(1.5));
        assert_ne!(GroupKey::from(i64::MAX), GroupKey::from(i64::MAX as f64));
        assert_ne!(GroupKey::from(0_i64), GroupKey::from(f64::NAN));
        assert_ne!(GroupKey::from(1_i64), GroupKey::from(true));
    }

    #[test]
    fn display_of_single_and_compound_keys() {
        assert_eq!(GroupKey::from("eng").to_string(), "eng");
        assert_eq!(
            GroupKey::new(vec![Value::from("eng"), Value::Int64(2)]).to_string(),
            "(eng, 2)"
        );
    }
}

//! Reductions over a sequence of column values.

use std::fmt;
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::table::Table;
use crate::types::Value;

/// Capability to reduce the values of one column to a single [`Value`].
///
/// `values` arrive in row order. `column` names the column they were drawn from and is used
/// for error reporting.
pub trait Reduce: Send + Sync {
    fn name(&self) -> &str;

    fn reduce(&self, column: &str, values: &[&Value]) -> TableResult<Value>;
}

/// Built-in reduction operations.
///
/// Nulls are skipped by the numeric reductions, but NaN is a value: a NaN among the inputs makes
/// the result of `Sum`, `Min`, `Max` and `Mean` NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Count all values (including nulls).
    Count,
    /// Sum numeric values, ignoring nulls.
    Sum,
    /// Minimum numeric value, ignoring nulls.
    Min,
    /// Maximum numeric value, ignoring nulls.
    Max,
    /// Arithmetic mean of numeric values as `Float64`, ignoring nulls.
    Mean,
    /// First value in row order.
    First,
    /// Last value in row order.
    Last,
}

impl Reduction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

impl Reduce for Reduction {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn reduce(&self, column: &str, values: &[&Value]) -> TableResult<Value> {
        match self {
            Self::Count => Ok(Value::Int64(values.len() as i64)),
            Self::First => Ok(values.first().map(|v| (*v).clone()).unwrap_or(Value::Null)),
            Self::Last => Ok(values.last().map(|v| (*v).clone()).unwrap_or(Value::Null)),
            Self::Sum | Self::Min | Self::Max => reduce_numeric(*self, column, values),
            Self::Mean => mean(column, values),
        }
    }
}

#[derive(Clone, Copy)]
enum Acc {
    Empty,
    Int(i64),
    Float(f64),
}

impl Acc {
    fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Int(v) => Value::Int64(v),
            Self::Float(v) => Value::Float64(v),
        }
    }
}

fn type_mismatch(op: Reduction, column: &str, value: &Value) -> TableError {
    TableError::TypeMismatch {
        column: column.to_owned(),
        reduction: op.as_str().to_owned(),
        value: value.describe(),
    }
}

fn reduce_numeric(op: Reduction, column: &str, values: &[&Value]) -> TableResult<Value> {
    let mut acc = Acc::Empty;
    for value in values {
        let next = match value {
            Value::Null => continue,
            Value::Int64(v) => Acc::Int(*v),
            Value::Float64(v) => Acc::Float(*v),
            other => return Err(type_mismatch(op, column, other)),
        };

        acc = match (op, acc, next) {
            (_, Acc::Empty, n) => n,
            (Reduction::Sum, Acc::Int(a), Acc::Int(b)) => {
                Acc::Int(a.checked_add(b).ok_or_else(|| TableError::NumericOverflow {
                    column: column.to_owned(),
                })?)
            }
            (Reduction::Min, Acc::Int(a), Acc::Int(b)) => Acc::Int(a.min(b)),
            (Reduction::Max, Acc::Int(a), Acc::Int(b)) => Acc::Int(a.max(b)),
            (op, a, b) => {
                let (a, b) = (as_float(a), as_float(b));
                Acc::Float(match op {
                    Reduction::Sum => a + b,
                    Reduction::Min => nan_or(a, b, f64::min),
                    Reduction::Max => nan_or(a, b, f64::max),
                    _ => unreachable!("non-numeric op handled earlier"),
                })
            }
        };
    }
    Ok(acc.into_value())
}

fn nan_or(a: f64, b: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

fn as_float(acc: Acc) -> f64 {
    match acc {
        Acc::Int(v) => v as f64,
        Acc::Float(v) => v,
        Acc::Empty => 0.0,
    }
}

fn mean(column: &str, values: &[&Value]) -> TableResult<Value> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        match value {
            Value::Null => {}
            Value::Int64(v) => {
                sum += *v as f64;
                count += 1;
            }
            Value::Float64(v) => {
                sum += v;
                count += 1;
            }
            other => return Err(type_mismatch(Reduction::Mean, column, other)),
        }
    }
    if count == 0 {
        return Ok(Value::Null);
    }
    Ok(Value::Float64(sum / count as f64))
}

/// Shared handle to any [`Reduce`] implementation.
#[derive(Clone)]
pub struct Reducer(Arc<dyn Reduce>);

impl Reducer {
    pub fn new(reduce: impl Reduce + 'static) -> Self {
        Self(Arc::new(reduce))
    }

    /// Wrap a closure as a named reduction.
    ///
    /// ```rust
    /// use typed_table::processing::Reducer;
    /// use typed_table::types::Value;
    ///
    /// // Number of distinct non-null values.
    /// let distinct = Reducer::from_fn("distinct", |_column, values| {
    ///     let mut seen: Vec<&Value> = Vec::new();
    ///     for v in values.iter().copied().filter(|v| !v.is_null()) {
    ///         if !seen.contains(&v) {
    ///             seen.push(v);
    ///         }
    ///     }
    ///     Ok(Value::Int64(seen.len() as i64))
    /// });
    /// assert_eq!(distinct.name(), "distinct");
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &[&Value]) -> TableResult<Value> + Send + Sync + 'static,
    {
        Self::new(FnReducer {
            name: name.into(),
            f,
        })
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn reduce(&self, column: &str, values: &[&Value]) -> TableResult<Value> {
        self.0.reduce(column, values)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reducer").field(&self.0.name()).finish()
    }
}

impl From<Reduction> for Reducer {
    fn from(op: Reduction) -> Self {
        Self::new(op)
    }
}

struct FnReducer<F> {
    name: String,
    f: F,
}

impl<F> Reduce for FnReducer<F>
where
    F: Fn(&str, &[&Value]) -> TableResult<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reduce(&self, column: &str, values: &[&Value]) -> TableResult<Value> {
        (self.f)(column, values)
    }
}

/// Reduce every value of `column`, in row order.
///
/// Fails with [`TableError::UnknownColumn`] if the schema does not declare `column`.
pub fn reduce(table: &Table, column: &str, reducer: impl Into<Reducer>) -> TableResult<Value> {
    let values: Vec<&Value> = table.column(column)?.iter().collect();
    reducer.into().reduce(column, &values)
}

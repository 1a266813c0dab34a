//! Reducers combining child outputs into one composite output

use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// Custom reduction over the present child values
pub type ReduceFn = Arc<dyn Fn(Vec<Value>) -> Option<Value> + Send + Sync>;

/// How a composite combines one output key across its children
#[derive(Clone)]
pub enum Reducer {
    /// Numeric sum; integer if every value is an unsigned integer
    Sum,
    /// Union of array (or scalar) values, first occurrence order
    MergeSet,
    /// First child value that is present and not null
    FirstNonNull,
    /// Caller-supplied reduction
    Custom(ReduceFn),
}

impl Reducer {
    /// Wrap a closure as a reducer
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Reducer::Custom(Arc::new(f))
    }

    /// Reduce child values; missing and null values are skipped
    pub fn reduce<I>(&self, values: I) -> Option<Value>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let present: Vec<Value> = values
            .into_iter()
            .flatten()
            .filter(|value| !value.is_null())
            .collect();

        match self {
            Reducer::FirstNonNull => present.into_iter().next(),
            Reducer::Sum => sum(&present),
            Reducer::MergeSet => merge_set(present),
            Reducer::Custom(f) => f(present),
        }
    }
}

fn sum(values: &[Value]) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    if let Some(ints) = values.iter().map(Value::as_u64).collect::<Option<Vec<u64>>>() {
        return Some(Value::from(ints.iter().sum::<u64>()));
    }
    let total: f64 = values.iter().filter_map(Value::as_f64).sum();
    Number::from_f64(total).map(Value::Number)
}

fn merge_set(values: Vec<Value>) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    let mut merged: Vec<Value> = Vec::new();
    for value in values {
        let items = match value {
            Value::Array(items) => items,
            scalar => vec![scalar],
        };
        for item in items {
            if !merged.contains(&item) {
                merged.push(item);
            }
        }
    }
    Some(Value::Array(merged))
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum => write!(f, "Sum"),
            Reducer::MergeSet => write!(f, "MergeSet"),
            Reducer::FirstNonNull => write!(f, "FirstNonNull"),
            Reducer::Custom(_) => write!(f, "Custom"),
        }
    }
}

//! Scalar values exchanged between the persistence layer and storage sessions.
//!
//! `Value` is the crate's owned sum type: every column, filter argument and
//! procedure parameter is one of these. Conversions in go through `From`,
//! extraction goes through [`FromValue`] which returns `Option` so callers
//! can distinguish nulls and mismatches at the record layer.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single scalar value, nullable through the dedicated `Null` variant.
///
/// # Example
///
/// ```rust
/// use purser::Value;
///
/// let v: Value = 42i32.into();
/// assert_eq!(v, Value::Int(42));
/// assert!(Value::Null.is_null());
///
/// // `Option` maps `None` onto `Null`, which is what lets optional filter
/// // arguments flow straight into the query builder.
/// let absent: Value = None::<String>.into();
/// assert!(absent.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the runtime type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Decimal(_) => "numeric",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Compare two values the way a database would order them.
    ///
    /// Numeric variants compare across widths (`Int(5)` equals `BigInt(5)`),
    /// everything else compares within its own kind. `None` means the pair is
    /// not comparable: nulls, json documents, mixed kinds.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.compare(&b);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Database equality: comparable kinds compare equal, json falls back to
    /// structural equality. Null never equals anything, itself included.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(v) => Some(Number::Int(i64::from(*v))),
            Value::BigInt(v) => Some(Number::Int(*v)),
            Value::Double(v) => Some(Number::Float(*v)),
            Value::Decimal(v) => Some(Number::Decimal(*v)),
            _ => None,
        }
    }
}

/// Normalized numeric form for cross-width comparison.
enum Number {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    fn compare(&self, other: &Number) -> Option<Ordering> {
        use Number::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (Int(a), Decimal(b)) => Some(rust_decimal::Decimal::from(*a).cmp(b)),
            (Decimal(a), Int(b)) => Some(a.cmp(&rust_decimal::Decimal::from(*b))),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Decimal(a), Float(b)) => a.to_f64().and_then(|a| a.partial_cmp(b)),
            (Float(a), Decimal(b)) => b.to_f64().and_then(|b| a.partial_cmp(&b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "bytes[{}]", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Extraction from a [`Value`] reference.
///
/// Returns `None` on a kind mismatch or a null; [`crate::Record::try_get`]
/// layers column names and error context on top.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($type:ty, $variant:ident) => {
        impl FromValue for $type {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_from_value!(bool, Bool);
impl_from_value!(i32, Int);
impl_from_value!(f64, Double);
impl_from_value!(Decimal, Decimal);
impl_from_value!(String, Text);
impl_from_value!(NaiveDate, Date);
impl_from_value!(NaiveDateTime, DateTime);
impl_from_value!(uuid::Uuid, Uuid);
impl_from_value!(serde_json::Value, Json);
impl_from_value!(Vec<u8>, Bytes);

// i64 additionally widens from Int so callers can keep 64-bit keys while the
// stored literal happens to be narrow.
impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::BigInt(v) => Some(*v),
            Value::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }
}

impl<T> FromValue for Option<T>
where
    T: FromValue,
{
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_promotes_across_widths() {
        assert_eq!(
            Value::Int(5).compare(&Value::BigInt(5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::BigInt(100).compare(&Value::Double(99.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Decimal(Decimal::new(250, 1)).compare(&Value::Int(25)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn null_equals_nothing() {
        assert!(!Value::Null.equals(&Value::Null));
        assert!(!Value::Null.equals(&Value::Int(1)));
        assert!(Value::Text("a".into()).equals(&Value::Text("a".into())));
    }

    #[test]
    fn mixed_kinds_do_not_compare() {
        assert_eq!(Value::Text("5".into()).compare(&Value::Int(5)), None);
        assert_eq!(Value::Bool(true).compare(&Value::Int(1)), None);
    }

    #[test]
    fn option_round_trips_null() {
        let v: Value = None::<i32>.into();
        assert!(v.is_null());
        assert_eq!(Option::<i32>::from_value(&v), Some(None));
        assert_eq!(Option::<i32>::from_value(&Value::Int(3)), Some(Some(3)));
        assert_eq!(Option::<i32>::from_value(&Value::Text("x".into())), None);
    }

    #[test]
    fn i64_widens_from_int() {
        assert_eq!(i64::from_value(&Value::Int(7)), Some(7));
        assert_eq!(i64::from_value(&Value::BigInt(7)), Some(7));
        assert_eq!(i64::from_value(&Value::Double(7.0)), None);
    }
}

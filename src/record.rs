//! Column-to-value maps, the wire unit between the layer and a session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::value::{FromValue, Value};

/// One stored row (or one procedure/projection result row).
///
/// Columns are kept in a sorted map so iteration order is deterministic.
///
/// # Example
///
/// ```rust
/// use purser::Record;
///
/// let record = Record::new().with("id", 7i64).with("name", "boiler");
/// assert_eq!(record.try_get::<i64>("id").unwrap(), 7);
/// assert_eq!(record.try_get::<Option<String>>("missing").is_err(), true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable setter, the usual way entities assemble their records.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed extraction with column context in the error.
    ///
    /// Use `Option<T>` as the target for nullable columns; a bare `T` treats
    /// null as a decode failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, PersistenceError> {
        let expected = std::any::type_name::<T>();
        match self.values.get(column) {
            None => Err(PersistenceError::Decode {
                column: column.to_owned(),
                expected,
                message: "column is absent from the record".to_owned(),
            }),
            Some(value) => T::from_value(value).ok_or_else(|| PersistenceError::Decode {
                column: column.to_owned(),
                expected,
                message: format!("cannot read a {} value", value.kind()),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

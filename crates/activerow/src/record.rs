//! Ordered column -> value storage shared by rows and entities.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

static NULL: Value = Value::Null;

/// A column-name keyed map that keeps insertion order.
///
/// Query results come back as `Record`s, and every entity owns one as its data bag.
/// Keys are unique; setting an existing key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Value stored under `name`, or `Null` when absent.
    pub fn get(&self, name: &str) -> &Value {
        self.position(name)
            .map(|idx| &self.entries[idx].1)
            .unwrap_or(&NULL)
    }

    /// Typed access; absent columns decode like `Null`.
    pub fn try_get<T: FromValue>(&self, name: &str) -> OrmResult<T> {
        T::from_value(self.get(name)).map_err(|e| match e {
            OrmError::Decode { message, .. } => OrmError::decode(name, message),
            other => other,
        })
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// `true` when the column is present and not null.
    pub fn has(&self, name: &str) -> bool {
        !self.get(name).is_null()
    }

    /// Reset the column to `Null`. The key is kept.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.set(name, Value::Null)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace every entry.
    pub fn set_data<I, K, V>(&mut self, data: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.entries.clear();
        for (k, v) in data {
            self.set(k, v);
        }
        self
    }

    /// Copy entries from `data`, skipping any key listed in `except`.
    pub fn copy_data_from<I, K, V>(&mut self, data: I, except: &[&str]) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in data {
            let k = k.into();
            if except.contains(&k.as_str()) {
                continue;
            }
            self.set(k, v);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Value of the first column, if any. Used for scalar projections.
    pub fn first_value(&self) -> Option<&Value> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn into_first_value(self) -> Option<Value> {
        self.entries.into_iter().next().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object with the columns in insertion order.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

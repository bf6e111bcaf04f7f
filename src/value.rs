//! Value types produced by the parser.
//!
//! Submissions are small and field order matters to every consumer, so maps
//! are insertion-ordered vectors of pairs rather than hash maps.

use serde::ser::{Serialize, SerializeMap, Serializer};

// ---------------------------------------------------------------------------
// OrderedMap
// ---------------------------------------------------------------------------

/// An insertion-ordered string-keyed map.
///
/// Re-inserting an existing key replaces the value in place and keeps the
/// original position.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, V)> {
        self.entries.iter()
    }

    /// The single `(key, value)` pair of a one-entry map.
    pub fn single(&self) -> Option<(&str, &V)> {
        match self.entries.as_slice() {
            [(k, v)] => Some((k.as_str(), v)),
            _ => None,
        }
    }

    pub fn into_single(mut self) -> Option<(String, V)> {
        if self.entries.len() == 1 {
            self.entries.pop()
        } else {
            None
        }
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = &'a (String, V);
    type IntoIter = std::slice::Iter<'a, (String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Nested dict
// ---------------------------------------------------------------------------

/// A value in the nested dict built from the XML tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Text of a leaf element.
    Text(String),
    /// An element with data-carrying children.
    Group(Dict),
    /// Every occurrence of a repeated element, in document order.
    Repeat(Vec<Value>),
}

pub type Dict = OrderedMap<Value>;

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Dict> {
        match self {
            Value::Group(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_repeat(&self) -> Option<&[Value]> {
        match self {
            Value::Repeat(items) => Some(items),
            _ => None,
        }
    }

    /// Lookup a key in a `Group` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_group().and_then(|d| d.get(key))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Flat dict
// ---------------------------------------------------------------------------

/// A value in the flat dict keyed by slash-joined path.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FlatValue {
    Text(String),
    /// One flat map per repeat iteration.
    Repeat(Vec<FlatDict>),
}

pub type FlatDict = OrderedMap<FlatValue>;

impl FlatValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlatValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[FlatDict]> {
        match self {
            FlatValue::Repeat(rows) => Some(rows),
            _ => None,
        }
    }
}

impl From<&str> for FlatValue {
    fn from(s: &str) -> Self {
        FlatValue::Text(s.to_string())
    }
}

impl FlatDict {
    /// The flat dict as a JSON object, in field order.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (key, value) in self {
            object.insert(key.clone(), value.to_json());
        }
        serde_json::Value::Object(object)
    }
}

impl FlatValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FlatValue::Text(s) => serde_json::Value::String(s.clone()),
            FlatValue::Repeat(rows) => {
                serde_json::Value::Array(rows.iter().map(FlatDict::to_json).collect())
            }
        }
    }
}

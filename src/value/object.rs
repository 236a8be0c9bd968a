//! An ordered `response-key -> Value` map, preserving grouped-field-set
//! insertion order (§3 invariant: "response-key order in output mirrors
//! insertion order in the grouped field set").

use std::iter::FromIterator;

use indexmap::IndexMap;

use super::Value;

/// An ordered object value, as found nested in a response or at the top
/// level of `data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    key_value_list: IndexMap<String, Value>,
}

impl Object {
    /// An empty object with preallocated room for `size` fields.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            key_value_list: IndexMap::with_capacity(size),
        }
    }

    /// Inserts a field, returning the previous value for that key, if any.
    ///
    /// Preserves first-seen insertion order: overwriting an existing key's
    /// value does not move it to the end.
    pub fn add_field(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.key_value_list.insert(key.into(), value)
    }

    /// Whether a field with this name is already present.
    pub fn contains_field(&self, key: &str) -> bool {
        self.key_value_list.contains_key(key)
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.key_value_list.iter()
    }

    /// Mutable iteration over `(key, value)` pairs in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.key_value_list.iter_mut()
    }

    /// The number of fields in this object.
    pub fn field_count(&self) -> usize {
        self.key_value_list.len()
    }

    /// Whether this object has no fields.
    pub fn is_empty(&self) -> bool {
        self.key_value_list.is_empty()
    }

    /// Looks up a field's value by name.
    pub fn get_field_value(&self, key: &str) -> Option<&Value> {
        self.key_value_list.get(key)
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.key_value_list.into_iter()
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut ret = Self {
            key_value_list: IndexMap::with_capacity(iter.size_hint().0),
        };
        for (k, v) in iter {
            ret.add_field(k, v);
        }
        ret
    }
}

impl serde::Serialize for Object {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

use crate::selector::FieldMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One extracted item: field name to value, in field-map order
///
/// Every record built from a field map carries all of its keys. Fields that
/// could not be resolved are kept with an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with every field of `fields` present but absent
    pub fn with_fields(fields: &FieldMap) -> Self {
        Self {
            fields: fields.names().map(|name| (name.to_string(), None)).collect(),
        }
    }

    /// Sets a field, appending it if the record does not have it yet
    pub fn set(&mut self, name: &str, value: Option<String>) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// The raw value of a field; `None` if absent or unknown
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// True if the field has no value or an empty one
    pub fn is_missing(&self, name: &str) -> bool {
        self.get(name).map_or(true, str::is_empty)
    }

    /// Fills missing fields from `other`, leaving present values untouched
    ///
    /// Returns the number of fields filled.
    pub fn merge_missing(&mut self, other: &Record) -> usize {
        let mut filled = 0;
        for (name, slot) in self.fields.iter_mut() {
            if slot.as_deref().map_or(false, |v| !v.is_empty()) {
                continue;
            }
            if let Some(value) = other.get(name).filter(|v| !v.is_empty()) {
                *slot = Some(value.to_string());
                filled += 1;
            }
        }
        filled
    }

    /// Number of fields with a non-empty value
    pub fn resolved_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, v)| v.as_deref().map_or(false, |v| !v.is_empty()))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialized as a JSON object in field order, absent values as `""`
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value.as_deref().unwrap_or(""))?;
        }
        map.end()
    }
}

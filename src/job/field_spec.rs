//! Insertion-ordered mapping of request field names to values.

use std::fmt;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use super::Value;

/// Field name to value mapping that keeps the order fields were given in.
///
/// Used both for the axes to vary in a batch and for complete request
/// parameter sets. Field names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpec {
    fields: Vec<(String, Value)>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, overriding in place if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut spec = FieldSpec::new();
        for (name, value) in iter {
            spec.insert(name, value);
        }
        spec
    }
}

impl Serialize for FieldSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A field as written in a job file: a value, or an inclusive integer range.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Range(IntRange),
    Value(Value),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IntRange {
    from: i64,
    to: i64,
}

struct FieldSpecVisitor;

impl<'de> Visitor<'de> for FieldSpecVisitor {
    type Value = FieldSpec;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldSpec, A::Error> {
        let mut spec = FieldSpec::new();
        while let Some((name, raw)) = access.next_entry::<String, RawField>()? {
            if spec.contains_key(&name) {
                return Err(de::Error::custom(format!("duplicate field `{}`", name)));
            }
            let value = match raw {
                RawField::Value(value) => value,
                RawField::Range(IntRange { from, to }) => {
                    if from > to {
                        return Err(de::Error::custom(format!(
                            "field `{}`: range start {} is after end {}",
                            name, from, to
                        )));
                    }
                    Value::List((from..=to).map(Value::Int).collect())
                }
            };
            spec.fields.push((name, value));
        }
        Ok(spec)
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldSpecVisitor)
    }
}

// -- Tests -------------------------------------------------------------------

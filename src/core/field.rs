//! Structured key-value fields
//!
//! This module provides:
//! - `FieldValue`: closed set of value shapes a field can carry
//! - `Field`: one key/value annotation
//! - `FieldSet`: ordered, append-only collection attached to a handle

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    /// Rendered error chain
    Error(String),
    Map(BTreeMap<String, FieldValue>),
    List(Vec<FieldValue>),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Error(e) => write!(f, "{}", e),
            FieldValue::Map(_) | FieldValue::List(_) => {
                write!(f, "{}", self.to_json_value())
            }
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) | FieldValue::Error(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::UInt(u) => serde_json::Value::Number((*u).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Null => serde_json::Value::Null,
        }
    }

    /// Capture any serializable value as a structured field value
    ///
    /// Values that fail to serialize become `FieldValue::Error` describing
    /// the failure; this never panics.
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Self::from(json),
            Err(e) => FieldValue::Error(format!("unserializable value: {}", e)),
        }
    }

    /// Render an error together with its `source()` chain
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut rendered = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        FieldValue::Error(rendered)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    FieldValue::UInt(u)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(u: u64) -> Self {
        FieldValue::UInt(u)
    }
}

impl From<u32> for FieldValue {
    fn from(u: u32) -> Self {
        FieldValue::UInt(u as u64)
    }
}

impl From<usize> for FieldValue {
    fn from(u: usize) -> Self {
        FieldValue::UInt(u as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<std::time::Duration> for FieldValue {
    fn from(d: std::time::Duration) -> Self {
        FieldValue::Float(d.as_secs_f64())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// One key/value annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Field under the conventional `"error"` key
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::named_error("error", err)
    }

    pub fn named_error(key: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::from_error(err),
        }
    }

    /// Field holding any serializable value
    pub fn serialized<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::serialized(value),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered field collection shared between derived handles
///
/// Appending never mutates an existing set; keys may repeat and a later
/// occurrence shadows an earlier one only when the set is resolved.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Arc<Vec<Field>>,
}

/// Result of resolving handle fields against call-site fields
#[derive(Debug, Clone, Default)]
pub struct ResolvedFields {
    /// Last-wins view in first-appearance order
    pub fields: Vec<Field>,
    /// Keys that appeared more than once
    pub shadowed: Vec<String>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// New set with `extra` appended after the current fields
    #[must_use]
    pub fn extended(&self, extra: &[Field]) -> Self {
        if extra.is_empty() {
            return self.clone();
        }
        let mut fields = Vec::with_capacity(self.fields.len() + extra.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(extra.iter().cloned());
        Self {
            fields: Arc::new(fields),
        }
    }

    pub fn as_slice(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Last value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }

    /// Resolve these fields followed by `call_fields` into a last-wins view
    pub fn resolve(&self, call_fields: &[Field]) -> ResolvedFields {
        let mut resolved = ResolvedFields::default();
        for field in self.fields.iter().chain(call_fields.iter()) {
            match resolved.fields.iter_mut().find(|f| f.key == field.key) {
                Some(existing) => {
                    existing.value = field.value.clone();
                    if !resolved.shadowed.contains(&field.key) {
                        resolved.shadowed.push(field.key.clone());
                    }
                }
                None => resolved.fields.push(field.clone()),
            }
        }
        resolved
    }
}

impl From<Vec<Field>> for FieldSet {
    fn from(fields: Vec<Field>) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }
}

impl ResolvedFields {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(Field::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|f| (f.key.clone(), f.value.to_json_value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::from(42), FieldValue::Int(42));
        assert_eq!(FieldValue::from("x"), FieldValue::String("x".into()));
        assert_eq!(FieldValue::from(None::<i32>), FieldValue::Null);
        assert_eq!(
            FieldValue::from(vec![1, 2]),
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::Int(2)])
        );
    }

    #[test]
    fn test_serialized_struct_becomes_map() {
        #[derive(Serialize)]
        struct Request {
            method: &'static str,
            status: u16,
        }

        let value = FieldValue::serialized(&Request {
            method: "GET",
            status: 200,
        });
        match value {
            FieldValue::Map(map) => {
                assert_eq!(map.get("method"), Some(&FieldValue::String("GET".into())));
                assert_eq!(map.get("status"), Some(&FieldValue::Int(200)));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_error_field_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let outer = crate::core::LoggerError::io_operation("writing", "failed", inner);
        let field = Field::error(&outer);
        assert_eq!(field.key, "error");
        match field.value {
            FieldValue::Error(text) => {
                assert!(text.contains("IO error while writing"));
                assert!(text.ends_with("disk gone"));
            }
            other => panic!("expected error value, got {:?}", other),
        }
    }

    #[test]
    fn test_field_set_extended_leaves_parent_untouched() {
        let parent = FieldSet::from(vec![Field::new("a", 1)]);
        let child = parent.extended(&[Field::new("b", 2)]);

        assert_eq!(parent.len(), 1);
        assert_eq!(child.as_slice(), &[Field::new("a", 1), Field::new("b", 2)]);
    }

    #[test]
    fn test_resolve_last_wins_and_reports_shadowing() {
        let set = FieldSet::from(vec![Field::new("user", "alice"), Field::new("region", "eu")]);
        let resolved = set.resolve(&[Field::new("user", "bob"), Field::new("id", 7)]);

        assert_eq!(
            resolved.fields,
            vec![
                Field::new("user", "bob"),
                Field::new("region", "eu"),
                Field::new("id", 7),
            ]
        );
        assert_eq!(resolved.shadowed, vec!["user".to_string()]);
        assert_eq!(resolved.format_fields(), "user=bob region=eu id=7");
    }

    #[test]
    fn test_get_returns_last_occurrence() {
        let set = FieldSet::new().extended(&[Field::new("k", 1), Field::new("k", 2)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("k"), Some(&FieldValue::Int(2)));
    }
}

//! Dynamic value model for intercepted call arguments.
//!
//! Framework calls carry heterogeneous, partially typed data: plain scalars,
//! nested role/content maps, enumeration members and opaque framework objects
//! (tools, step logs, model handles). [`ArgValue`] captures all of them so the
//! flattener and the encoder can treat every argument uniformly.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::surface::ToolSurface;

/// Accessors for an opaque framework object passed through an interception point.
///
/// Every method has a conservative default so an object only opts into the
/// capabilities it actually has.
pub trait Inspect: Debug + Send + Sync {
    /// Type name used for span names and error messages.
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Standard structured serialization.
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        Err(serde_json::Error::custom(format!(
            "object of type {} is not JSON serializable",
            self.type_name()
        )))
    }

    /// Dict-style export for model objects that provide their own convention.
    fn model_dump(&self) -> Option<serde_json::Value> {
        None
    }

    /// Present when the object is a tool that can be offered to a model.
    fn as_tool(&self) -> Option<&dyn ToolSurface> {
        None
    }
}

/// Strips the module path from a `std::any::type_name` result.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Wraps any serde-serializable value as an opaque argument.
#[derive(Debug, Clone)]
pub struct Serialized<T>(pub T);

impl<T: Serialize + Debug + Send + Sync> Inspect for Serialized<T> {
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<T>())
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.0)
    }
}

/// A member of a fixed enumeration, carrying its underlying value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub value: Box<ArgValue>,
}

impl EnumMember {
    pub fn new(value: impl Into<ArgValue>) -> Self {
        Self {
            value: Box::new(value.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ArgValue {
    /// The absent marker; never emitted as an attribute.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum(EnumMember),
    List(Vec<ArgValue>),
    Map(ArgMap),
    Object(Arc<dyn Inspect>),
}

impl ArgValue {
    pub fn object(value: impl Inspect + 'static) -> Self {
        Self::Object(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ArgMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Python-style truthiness: absent, `false`, zero and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Str(value) => !value.is_empty(),
            Self::Enum(_) | Self::Object(_) => true,
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Str(value) => serializer.serialize_str(value),
            Self::Enum(member) => member.value.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => map.serialize(serializer),
            Self::Object(object) => export_object(object.as_ref()).serialize(serializer),
        }
    }
}

// Escalating export: own JSON, then model_dump, then the Debug representation.
fn export_object(object: &dyn Inspect) -> serde_json::Value {
    match object.to_json() {
        Ok(value) => value,
        Err(err) => {
            if let Some(dump) = object.model_dump() {
                return dump;
            }
            tracing::debug!(
                target: "autoagents.openinference.encoder",
                type_name = object.type_name(),
                error = %err,
                "falling back to debug representation"
            );
            serde_json::Value::String(format!("{object:?}"))
        }
    }
}

/// Insertion-ordered string-keyed map; inserting an existing key replaces the
/// value in place.
#[derive(Clone, Default, PartialEq)]
pub struct ArgMap {
    entries: Vec<(String, ArgValue)>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgValue> {
        let idx = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl Debug for ArgMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for ArgMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<ArgValue>> Extend<(K, V)> for ArgMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ArgMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<ArgValue>, const N: usize> From<[(K, V); N]> for ArgMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for ArgMap {
    type Item = (String, ArgValue);
    type IntoIter = std::vec::IntoIter<(String, ArgValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    Self::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Self::Int)
            .unwrap_or(Self::Float(value as f64))
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<EnumMember> for ArgValue {
    fn from(value: EnumMember) -> Self {
        Self::Enum(value)
    }
}

impl From<ArgMap> for ArgValue {
    fn from(value: ArgMap) -> Self {
        Self::Map(value)
    }
}

impl From<Arc<dyn Inspect>> for ArgValue {
    fn from(value: Arc<dyn Inspect>) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::None)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Self::Int(value),
                None => Self::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Self::Str(value),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => Self::Map(map.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_in_place() {
        let mut map = ArgMap::from([("a", 1), ("b", 2)]);
        let previous = map.insert("a", 3);

        assert_eq!(previous, Some(ArgValue::Int(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&ArgValue::Int(3)));
    }

    #[test]
    fn json_values_convert_recursively() {
        let value = ArgValue::from(json!({"role": "user", "n": 2, "x": 0.5, "tags": ["a"]}));
        let map = value.as_map().expect("object becomes a map");

        assert_eq!(map.get("role"), Some(&ArgValue::from("user")));
        assert_eq!(map.get("n"), Some(&ArgValue::Int(2)));
        assert_eq!(map.get("x"), Some(&ArgValue::Float(0.5)));
        assert_eq!(map.get("tags"), Some(&ArgValue::List(vec!["a".into()])));
    }

    #[test]
    fn truthiness_follows_container_emptiness() {
        assert!(!ArgValue::None.is_truthy());
        assert!(!ArgValue::Map(ArgMap::new()).is_truthy());
        assert!(!ArgValue::from("").is_truthy());
        assert!(ArgValue::from(ArgMap::from([("k", "v")])).is_truthy());
    }

    #[test]
    fn short_type_name_strips_module_path() {
        assert_eq!(short_type_name("my_crate::agents::CodeAgent"), "CodeAgent");
        assert_eq!(short_type_name("Vec<my_crate::Tool>"), "Vec<my_crate::Tool>");
        assert_eq!(short_type_name("alloc::vec::Vec<u8>"), "Vec<u8>");
    }

    #[test]
    fn serialized_wrapper_exports_through_serde() {
        #[derive(Debug, serde::Serialize)]
        struct Payload {
            q: &'static str,
        }

        let object = Serialized(Payload { q: "x" });
        assert_eq!(object.type_name(), "Payload");
        assert_eq!(object.to_json().expect("serializes"), json!({"q": "x"}));
    }
}

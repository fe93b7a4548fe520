//! Configuration value types
//!
//! Represents fully resolved configuration values. Values are immutable and
//! compare structurally; objects are ordered sequences of fields, each field
//! carrying the origin of the document that defined it.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::origin::Origin;

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Long(i64),
    /// Floating point value
    Double(f64),
    /// String value
    String(String),
    /// Sequence of values
    Array(Vec<ConfigValue>),
    /// Object value, an ordered sequence of fields
    Object(ObjectValue),
}

/// A single named field of an object, tagged with the origin of the document
/// that defined it.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: ConfigValue,
    pub origin: Origin,
}

impl Field {
    pub fn new(name: impl Into<String>, value: ConfigValue, origin: Origin) -> Self {
        Field {
            name: name.into(),
            value,
            origin,
        }
    }

    /// A field with the default root origin, for programmatic construction.
    pub fn rooted(name: impl Into<String>, value: ConfigValue) -> Self {
        Field::new(name, value, Origin::root())
    }
}

/// An object value: an ordered sequence of fields with unique names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectValue {
    pub fields: Vec<Field>,
}

impl ObjectValue {
    /// The empty object.
    pub fn empty() -> Self {
        ObjectValue { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<Field>) -> Self {
        ObjectValue { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field's value by name.
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.field(name).map(|f| &f.value)
    }

    /// Merge a fallback object into this one.
    ///
    /// Fields present locally win per leaf; when both sides hold an object
    /// for the same name the two merge recursively. Fallback-only fields are
    /// appended and keep their own origins, so relative-path decoding still
    /// anchors at the document that actually defined them.
    pub fn merge_fallback(&self, fallback: &ObjectValue) -> ObjectValue {
        merge_objects(fallback, self)
    }
}

/// Merge two objects, the overlay winning per leaf.
///
/// Objects merge recursively; any other kind of value in the overlay
/// replaces the base value entirely. Field order is base order first,
/// overlay-only fields appended in their own order.
pub(crate) fn merge_objects(base: &ObjectValue, overlay: &ObjectValue) -> ObjectValue {
    let mut fields: Vec<Field> = Vec::with_capacity(base.fields.len() + overlay.fields.len());
    for field in &base.fields {
        match overlay.field(&field.name) {
            Some(over) => match (&field.value, &over.value) {
                (ConfigValue::Object(base_obj), ConfigValue::Object(over_obj)) => {
                    fields.push(Field::new(
                        field.name.clone(),
                        ConfigValue::Object(merge_objects(base_obj, over_obj)),
                        over.origin.clone(),
                    ));
                }
                _ => fields.push(over.clone()),
            },
            None => fields.push(field.clone()),
        }
    }
    for over in &overlay.fields {
        if base.field(&over.name).is_none() {
            fields.push(over.clone());
        }
    }
    ObjectValue { fields }
}

/// Merge two values, the overlay winning per leaf. Non-object overlays
/// replace the base value entirely.
pub(crate) fn merge_values(base: ConfigValue, overlay: ConfigValue) -> ConfigValue {
    match (base, overlay) {
        (ConfigValue::Object(base_obj), ConfigValue::Object(over_obj)) => {
            ConfigValue::Object(merge_objects(&base_obj, &over_obj))
        }
        (_, overlay) => overlay,
    }
}

impl ConfigValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ConfigValue::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ConfigValue::Array(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Double(n) => Some(*n),
            ConfigValue::Long(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            ConfigValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The kind of this value, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::Long(_) => "long",
            ConfigValue::Double(_) => "double",
            ConfigValue::String(_) => "string",
            ConfigValue::Array(_) => "array",
            ConfigValue::Object(_) => "object",
        }
    }

    /// Render this value as a JSON string. Origins are resolution metadata
    /// and do not appear in the output.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Boolean(b) => write!(f, "{}", b),
            ConfigValue::Long(n) => write!(f, "{}", n),
            ConfigValue::Double(n) => write!(f, "{}", n),
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ConfigValue::Object(obj) => {
                write!(f, "{{")?;
                for (i, field) in obj.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", field.name, field.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Boolean(b) => serializer.serialize_bool(*b),
            ConfigValue::Long(n) => serializer.serialize_i64(*n),
            ConfigValue::Double(n) => serializer.serialize_f64(*n),
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigValue::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.fields.len()))?;
                for field in &obj.fields {
                    map.serialize_entry(&field.name, &field.value)?;
                }
                map.end()
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Long(n)
    }
}

impl From<i32> for ConfigValue {
    fn from(n: i32) -> Self {
        ConfigValue::Long(n as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(n: f64) -> Self {
        ConfigValue::Double(n)
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(items: Vec<T>) -> Self {
        ConfigValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<ObjectValue> for ConfigValue {
    fn from(obj: ObjectValue) -> Self {
        ConfigValue::Object(obj)
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Long(i)
                } else {
                    ConfigValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Array(items) => {
                ConfigValue::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(entries) => ConfigValue::Object(ObjectValue::from_fields(
                entries
                    .into_iter()
                    .map(|(name, value)| Field::rooted(name, value.into()))
                    .collect(),
            )),
        }
    }
}

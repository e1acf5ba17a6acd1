use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::Type;

/// Canonical value representation.
///
/// A closed set of shapes, inspected once at the converter boundary:
/// - Scalars (`Bool`, `Int`, `UInt`, `Float`, `Str`, `Bytes`) carry their
///   primitive type implicitly.
/// - `Seq` and `Map` are untyped containers; `Map` keeps insertion order.
/// - `Record` is a typed object with named fields.
/// - `Opaque` wraps anything else; only the top type accepts it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Record(Record),
    Opaque(Opaque),
}

impl Value {
    /// Descriptor carried by the value, if it has one.
    pub fn runtime_type(&self) -> Option<Type> {
        match self {
            Value::Bool(_) => Some(Type::bool()),
            Value::Int(_) => Some(Type::i64()),
            Value::UInt(_) => Some(Type::u64()),
            Value::Float(_) => Some(Type::f64()),
            Value::Str(_) => Some(Type::string()),
            Value::Bytes(_) => Some(Type::bytes()),
            Value::Record(record) => Some(record.ty.clone()),
            Value::Null | Value::Seq(_) | Value::Map(_) | Value::Opaque(_) => None,
        }
    }

    /// Whether this value may stand in as an instance of `ty`.
    ///
    /// Typed values must be subtypes of `ty`. `Null` stands in for any
    /// non-primitive type; `Seq` only for `List<..>` and `Map` only for
    /// `Mapping<..>`. The top type accepts all.
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        if ty.is_object() {
            return true;
        }
        if let Some(actual) = self.runtime_type() {
            return actual.is_subtype_of(ty);
        }
        match self {
            Value::Null => !ty.is_primitive(),
            Value::Seq(_) => ty.generic_definition() == Some(&Type::list_definition()),
            Value::Map(_) => ty.generic_definition() == Some(&Type::mapping_definition()),
            _ => false,
        }
    }

    /// The value a failed conversion reports for `ty`.
    pub fn default_for(ty: &Type) -> Value {
        if !ty.is_primitive() {
            return Value::Null;
        }
        match ty.key() {
            "i8" | "i16" | "i32" | "i64" => Value::Int(0),
            "u8" | "u16" | "u32" | "u64" => Value::UInt(0),
            "f32" | "f64" => Value::Float(0.0),
            "bool" => Value::Bool(false),
            _ => Value::Null,
        }
    }

    /// Short shape name for diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Record(record) => record.ty.key(),
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render as JSON. Bytes become arrays, records become objects,
    /// non-finite floats and opaque values become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null | Value::Opaque(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::Seq(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (key_string(k), v.to_json()))
                    .collect(),
            ),
            Value::Record(record) => Json::Object(
                record
                    .fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::Seq(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Opaque(_) => f.write_str("<opaque>"),
            Value::Record(record) => write!(f, "{} {}", record.ty, self.to_json()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A typed object: descriptor plus ordered named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    ty: Type,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(ty: Type) -> Self {
        Self { ty, fields: Vec::new() }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Insert or overwrite a field.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(entry) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Opaque
// ---------------------------------------------------------------------------

/// Shared handle to a value outside the tagged model. Compared by identity.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;

    #[test]
    fn json_in_and_out() {
        let json = serde_json::json!({"a": [1, -2, 3.5, "x", null, true], "b": 18446744073709551615u64});
        let value = Value::from(json.clone());
        let Value::Map(entries) = &value else { panic!("expected map, got {value:?}") };
        assert_eq!(entries[0].0, Value::Str("a".into()));
        assert_eq!(entries[1].1, Value::UInt(u64::MAX));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn record_renders_as_object() {
        let ty = TypeBuilder::class("Point").build().unwrap();
        let value = Value::from(Record::new(ty).with("x", 1i64).with("y", 2i64));
        assert_eq!(value.to_json(), serde_json::json!({"x": 1, "y": 2}));
        assert_eq!(value.kind_name(), "Point");
    }

    #[test]
    fn instance_checks() {
        let animal = TypeBuilder::class("Animal").build().unwrap();
        let dog = TypeBuilder::class("Dog").base(&animal).build().unwrap();
        let rex = Value::from(Record::new(dog.clone()));
        let generic = Value::from(Record::new(animal.clone()));

        assert!(rex.is_instance_of(&animal));
        assert!(rex.is_instance_of(&dog));
        assert!(!generic.is_instance_of(&dog));
        assert!(Value::Null.is_instance_of(&dog));
        assert!(!Value::Null.is_instance_of(&Type::i32()));
        assert!(Value::Int(1).is_instance_of(&Type::object()));
        assert!(!Value::Str("x".into()).is_instance_of(&dog));
        assert!(!Value::Opaque(Opaque::new(5u8)).is_instance_of(&dog));
        assert!(!Value::Map(Vec::new()).is_instance_of(&dog));
        assert!(Value::Map(Vec::new()).is_instance_of(&Type::mapping(Type::string(), dog)));
        assert!(Value::Seq(Vec::new()).is_instance_of(&Type::list(Type::i32())));
    }

    #[test]
    fn defaults_per_type() {
        assert_eq!(Value::default_for(&Type::i32()), Value::Int(0));
        assert_eq!(Value::default_for(&Type::u16()), Value::UInt(0));
        assert_eq!(Value::default_for(&Type::f32()), Value::Float(0.0));
        assert_eq!(Value::default_for(&Type::bool()), Value::Bool(false));
        assert_eq!(Value::default_for(&Type::string()), Value::Null);
        assert_eq!(Value::default_for(&Type::list(Type::i32())), Value::Null);
    }
}

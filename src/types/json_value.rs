use std::fmt;

use base64::Engine;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::{Map, Number, Value};

use crate::types::TypeCode;

/// A value whose SQL type has no native JSON kind, kept with its original type code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Opaque {
    pub type_code: TypeCode,
    pub buf: Vec<u8>,
}

impl Opaque {
    pub fn new(type_code: TypeCode, buf: Vec<u8>) -> Self {
        Self { type_code, buf }
    }
}

/// Structured JSON value, the leaf kinds a binary JSON codec can build plus nesting.
///
/// Object equality ignores key order; iteration follows insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Float64(OrderedFloat<f64>),
    String(String),
    Opaque(Opaque),
    Array(Vec<JsonValue>),
    Object(IndexMap<String, JsonValue>),
}

impl JsonValue {
    pub fn float(f: f64) -> Self {
        JsonValue::Float64(OrderedFloat(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        JsonValue::String(s.into())
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, JsonValue)>) -> Self {
        JsonValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, JsonValue>> {
        match self {
            JsonValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            JsonValue::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Member lookup on objects; `None` for any other kind.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Lower into plain `serde_json`. Opaque values become their `base64:type<N>:` text.
    pub fn to_serde_json(&self) -> Value {
        match self {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Int64(i) => Value::Number(Number::from(*i)),
            JsonValue::Uint64(u) => Value::Number(Number::from(*u)),
            JsonValue::Float64(f) => Number::from_f64(f.0).map(Value::Number).unwrap_or(Value::Null),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Opaque(o) => Value::String(opaque_text(o)),
            JsonValue::Array(items) => Value::Array(items.iter().map(JsonValue::to_serde_json).collect()),
            JsonValue::Object(m) => {
                let mut out = Map::new();
                for (k, v) in m {
                    out.insert(k.clone(), v.to_serde_json());
                }
                Value::Object(out)
            }
        }
    }
}

fn opaque_text(o: &Opaque) -> String {
    format!(
        "base64:type{}:{}",
        o.type_code.code(),
        base64::engine::general_purpose::STANDARD.encode(&o.buf)
    )
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() { JsonValue::Int64(i) }
                else if let Some(u) = n.as_u64() { JsonValue::Uint64(u) }
                else { JsonValue::float(n.as_f64().unwrap_or(f64::NAN)) }
            }
            Value::String(s) => JsonValue::String(s),
            Value::Array(items) => JsonValue::Array(items.into_iter().map(JsonValue::from).collect()),
            Value::Object(m) => JsonValue::Object(m.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect()),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    // serde_json's string escaping never fails for &str
    match serde_json::to_string(s) {
        Ok(q) => f.write_str(&q),
        Err(_) => Err(fmt::Error),
    }
}

/// Shortest round-trip text; exponent form below 1e-6 and from 1e21 up (`1e+300`, `1e-7`).
/// NaN and infinities have no JSON text and render as `null`.
fn format_float(x: f64) -> String {
    if !x.is_finite() {
        return "null".to_string();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        let e = format!("{x:e}");
        return match e.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => e,
        };
    }
    x.to_string()
}

/// MySQL JSON text form: `{"a": 1, "b": [true, null]}`.
impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Null => f.write_str("null"),
            JsonValue::Bool(b) => write!(f, "{b}"),
            JsonValue::Int64(i) => write!(f, "{i}"),
            JsonValue::Uint64(u) => write!(f, "{u}"),
            JsonValue::Float64(x) => f.write_str(&format_float(x.0)),
            JsonValue::String(s) => write_quoted(f, s),
            JsonValue::Opaque(o) => write_quoted(f, &opaque_text(o)),
            JsonValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            JsonValue::Object(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write_quoted(f, k)?;
                    write!(f, ": {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

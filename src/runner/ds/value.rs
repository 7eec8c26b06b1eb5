use std::collections::HashSet;
use std::fmt;
use std::fmt::{Display, Formatter};

use serde_json::{Map, Number, Value};

use crate::runner::ds::array_object::JsArray;
use crate::runner::ds::object::{JsObject, ObjectId};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    Object(JsObject),
    Array(JsArray),
}

impl JsValue {
    /// Mirrors the `typeof` operator (arrays report `"object"`).
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => TYPE_STR_UNDEFINED,
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::String(_) => "string",
            JsValue::Number(_) => "number",
            JsValue::Object(_) | JsValue::Array(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Objects and arrays are observed containers; everything else is a primitive.
    pub fn is_container(&self) -> bool {
        matches!(self, JsValue::Object(_) | JsValue::Array(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::String(s) => !s.is_empty(),
            JsValue::Number(n) => {
                let f = n.as_f64();
                f != 0.0 && !f.is_nan()
            }
            JsValue::Object(_) | JsValue::Array(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsValue::Number(JsNumberType::Integer(i)) => Some(*i),
            JsValue::Number(JsNumberType::Float(f)) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsArray> {
        match self {
            JsValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Identity of the container behind this value, if any.
    pub fn container_id(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(o) => Some(o.id()),
            JsValue::Array(a) => Some(a.id()),
            _ => None,
        }
    }

    /// String rendering used by the default array sort and by text nodes.
    pub fn to_display_string(&self) -> String {
        match self {
            JsValue::Undefined => TYPE_STR_UNDEFINED.to_string(),
            JsValue::Null => TYPE_STR_NULL.to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::String(s) => s.clone(),
            JsValue::Number(n) => n.to_string(),
            JsValue::Object(_) => "[object Object]".to_string(),
            JsValue::Array(a) => a
                .to_vec()
                .iter()
                .map(|v| match v {
                    JsValue::Undefined | JsValue::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Converts into a JSON value. Cyclic references are cut off as `null`.
    pub fn to_json(&self) -> Value {
        let mut visiting = HashSet::new();
        to_json_inner(self, &mut visiting)
    }

    /// Builds a fresh, unobserved value tree from JSON.
    pub fn from_json(value: &Value) -> JsValue {
        match value {
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => JsValue::Number(JsNumberType::Integer(i)),
                None => JsValue::Number(JsNumberType::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => JsValue::String(s.clone()),
            Value::Array(items) => {
                JsValue::Array(JsArray::from_vec(items.iter().map(JsValue::from_json).collect()))
            }
            Value::Object(map) => JsValue::Object(JsObject::from_entries(
                map.iter().map(|(k, v)| (k.clone(), JsValue::from_json(v))),
            )),
        }
    }
}

fn to_json_inner(value: &JsValue, visiting: &mut HashSet<ObjectId>) -> Value {
    match value {
        JsValue::Undefined | JsValue::Null => Value::Null,
        JsValue::Boolean(b) => Value::Bool(*b),
        JsValue::String(s) => Value::String(s.clone()),
        JsValue::Number(JsNumberType::Integer(i)) => Value::Number((*i).into()),
        JsValue::Number(JsNumberType::Float(f)) => {
            Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
        }
        JsValue::Object(o) => {
            if !visiting.insert(o.id()) {
                return Value::Null;
            }
            let mut map = Map::new();
            for (k, v) in o.entries() {
                map.insert(k, to_json_inner(&v, visiting));
            }
            visiting.remove(&o.id());
            Value::Object(map)
        }
        JsValue::Array(a) => {
            if !visiting.insert(a.id()) {
                return Value::Null;
            }
            let items = a.to_vec().iter().map(|v| to_json_inner(v, visiting)).collect();
            visiting.remove(&a.id());
            Value::Array(items)
        }
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other.to_display_string()),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Object(o) => write!(f, "JsValue::Object({})", o.id()),
            JsValue::Array(a) => write!(f, "JsValue::Array({}; len {})", a.id(), a.len()),
        }
    }
}

impl Default for JsValue {
    fn default() -> Self {
        JsValue::Undefined
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            (JsValue::Array(a), JsValue::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<i64> for JsValue {
    fn from(i: i64) -> Self {
        JsValue::Number(JsNumberType::Integer(i))
    }
}

impl From<i32> for JsValue {
    fn from(i: i32) -> Self {
        JsValue::Number(JsNumberType::Integer(i as i64))
    }
}

impl From<usize> for JsValue {
    fn from(i: usize) -> Self {
        JsValue::Number(JsNumberType::Integer(i as i64))
    }
}

impl From<f64> for JsValue {
    fn from(f: f64) -> Self {
        JsValue::Number(JsNumberType::Float(f))
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

impl From<JsArray> for JsValue {
    fn from(a: JsArray) -> Self {
        JsValue::Array(a)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum JsNumberType {
    Integer(i64),
    Float(f64),
}

impl JsNumberType {
    pub fn as_f64(&self) -> f64 {
        match self {
            JsNumberType::Integer(i) => *i as f64,
            JsNumberType::Float(f) => *f,
        }
    }
}

impl PartialEq for JsNumberType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsNumberType::Integer(a), JsNumberType::Integer(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Display for JsNumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsNumberType::Integer(i) => write!(f, "{}", i),
            JsNumberType::Float(nf) if nf.is_nan() => write!(f, "NaN"),
            JsNumberType::Float(nf) if nf.is_infinite() => {
                write!(f, "{}Infinity", if *nf < 0.0 { "-" } else { "" })
            }
            JsNumberType::Float(nf) if nf.fract() == 0.0 && nf.abs() < 1e15 => {
                write!(f, "{:.0}", nf)
            }
            JsNumberType::Float(nf) => write!(f, "{}", nf),
        }
    }
}

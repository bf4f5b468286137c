use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use weft_dom::Fragment;

use crate::error::{EvalError, EvalResult};

/// Host-supplied callable. The first argument is the receiver context:
/// the top-of-stack overlay for module calls, the previous chain value
/// for method calls.
pub type HostFunction = Rc<dyn Fn(&Value, &[Value]) -> EvalResult<Value>>;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    /// Covers both null and undefined of the source data model
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    Function(HostFunction),
    /// Pre-built markup inserted verbatim by node interpolations
    Node(Rc<Fragment>),
}

impl Value {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        Value::Function(Rc::new(f))
    }

    pub fn node(fragment: Fragment) -> Self {
        Value::Node(Rc::new(fragment))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Node(_) => "node",
        }
    }

    /// Coerce to the string rendered into text nodes and attributes.
    /// Null renders empty; integral numbers render without a fraction.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self
                .to_json()
                .map(|json| json.to_string())
                .unwrap_or_else(|_| format!("[{}]", self.type_name())),
            Value::Function(_) | Value::Node(_) => format!("[{}]", self.type_name()),
        }
    }

    /// Convert to JSON. Functions and nodes have no JSON form.
    pub fn to_json(&self) -> EvalResult<JsonValue> {
        match self {
            Value::Null => Ok(JsonValue::Null),
            Value::Boolean(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) => Ok(serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Array(items) => Ok(JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.to_json())
                    .collect::<EvalResult<_>>()?,
            )),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), value.to_json()?);
                }
                Ok(JsonValue::Object(out))
            }
            Value::Function(_) | Value::Node(_) => Err(EvalError::type_error(format!(
                "Cannot convert {} to JSON",
                self.type_name()
            ))),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Function(_) => write!(f, "Function"),
            Value::Node(_) => write!(f, "Node"),
        }
    }
}

/// Strict equality: types never coerce, containers compare structurally,
/// functions and nodes compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            JsonValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

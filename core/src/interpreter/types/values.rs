//! Runtime value types

use super::super::errors::FaultKind;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/* ===================== Value ===================== */

/// Runtime value type
///
/// Host-side objects (functions, classes, modules, model pipelines) are held by handle.
/// The objects themselves live in the environment's host-object table or inside the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Dict),
    /// Function or class, resolved by name at call time
    Callable(String),
    Instance(Instance),
    Module(String),
    Model(ModelHandle),
}

/// Object produced by instantiating a host class
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub class: String,
    pub fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Handle to a model pipeline owned by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    pub id: usize,
    pub task: String,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Callable(_) => "function",
            Value::Instance(_) => "object",
            Value::Module(_) => "module",
            Value::Model(_) => "model",
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.is_empty(),
            _ => true,
        }
    }

    /// Numeric view of the value; booleans count as 0/1
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Equality used by `==`, `in` and list removal: ints, floats and bools compare
    /// numerically, containers compare element-wise.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Dict(a), Value::Dict(b)) => a.loose_eq(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    /// Ordering for comparisons and sorting. `None` when the pair is not orderable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => {
                let (a, b) = (self.as_f64()?, other.as_f64()?);
                a.partial_cmp(&b)
            }
        }
    }

    /// Items visited when iterating: list elements, dict keys, or string characters
    pub fn to_items(&self) -> Result<Vec<Value>, FaultKind> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Dict(dict) => Ok(dict.keys().cloned().collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(FaultKind::Type(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Quoted representation, as used for elements inside containers
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote(s),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::None => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Dict(dict) => JsonValue::Object(
                dict.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Instance(instance) => JsonValue::Object(
                instance
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            other => JsonValue::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Dict(dict) => {
                let parts: Vec<String> = dict
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Callable(name) => write!(f, "<function {}>", name),
            Value::Instance(instance) => write!(f, "<{} object>", instance.class),
            Value::Module(name) => write!(f, "<module '{}'>", name),
            Value::Model(model) => write!(f, "<model '{}'>", model.task),
        }
    }
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/* ===================== Dict ===================== */

/// Insertion-ordered mapping with value keys
///
/// Keys are compared with [`Value::loose_eq`], so `1` and `1.0` address the same entry.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.loose_eq(key))
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        let i = self.position(key)?;
        Some(&mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    /// Insert or overwrite, returning the previous value
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    fn loose_eq(&self, other: &Dict) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.loose_eq(w)))
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(Value, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_notation_output() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::None.to_string(), "None");

        let list = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(list.to_string(), "[1, 'a']");

        let dict: Dict = vec![(Value::from("k"), Value::Int(2))].into_iter().collect();
        assert_eq!(Value::Dict(dict).to_string(), "{'k': 2}");
    }

    #[test]
    fn test_loose_equality_crosses_numeric_types() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(!Value::Int(1).loose_eq(&Value::from("1")));
    }

    #[test]
    fn test_dict_equality_ignores_insertion_order() {
        let a: Dict = vec![(Value::from("x"), Value::Int(1)), (Value::from("y"), Value::Int(2))]
            .into_iter()
            .collect();
        let b: Dict = vec![(Value::from("y"), Value::Int(2)), (Value::from("x"), Value::Int(1))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Module("math".to_string()).is_truthy());
    }

    #[test]
    fn test_string_items_are_characters() {
        let items = Value::from("ab").to_items().expect("strings iterate");
        assert_eq!(items, vec![Value::from("a"), Value::from("b")]);
        assert!(Value::Int(3).to_items().is_err());
    }
}

//! Core types for spark-bind.
//!
//! `Value` is the dynamic data that flows through state, expressions and
//! directives. It follows script-style coercion rules so markup expressions
//! behave the way authors expect (`count + 1`, `!items.length`, `'a' + n`).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StateError;

/// Insertion-ordered object map used by [`Value::Object`].
pub type Map = IndexMap<String, Value>;

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value.
///
/// Cloning is a deep copy: nested arrays and objects are never shared
/// between two clones.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Empty object (`{}`).
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    /// Empty array (`[]`).
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Build an object from key/value pairs, keeping their order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Script truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// True for `null` and `undefined`.
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// True for arrays and objects.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Numeric coercion (`Number(value)`).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) => f64::NAN,
        }
    }

    /// `typeof` keyword result.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number payload, if any (no coercion).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow array items, if any.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow object entries, if any.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Read one level down. Missing keys read as `undefined`.
    pub fn get(&self, key: &PathKey) -> Value {
        match (self, key) {
            (Value::Object(map), PathKey::Key(k)) => map.get(k).cloned().unwrap_or_default(),
            (Value::Object(map), PathKey::Index(i)) => {
                map.get(&i.to_string()).cloned().unwrap_or_default()
            }
            (Value::Array(items), PathKey::Index(i)) => items.get(*i).cloned().unwrap_or_default(),
            (Value::Array(items), PathKey::Key(k)) if k == "length" => {
                Value::Number(items.len() as f64)
            }
            (Value::String(s), PathKey::Key(k)) if k == "length" => {
                Value::Number(s.chars().count() as f64)
            }
            (Value::String(s), PathKey::Index(i)) => s
                .chars()
                .nth(*i)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Read a nested path. Any missing hop reads as `undefined`.
    pub fn get_path(&self, path: &[PathKey]) -> Value {
        let mut current = self;
        for (i, key) in path.iter().enumerate() {
            match lookup_ref(current, key) {
                Some(next) => current = next,
                None => return self_or_leaf(current, &path[i..]),
            }
        }
        current.clone()
    }

    /// Write `value` at a nested path.
    ///
    /// Objects gain missing keys; arrays grow with `undefined` holes when an
    /// index lands past the end, and writing `length` truncates or extends.
    /// Every hop before the last must already be a container.
    pub fn set_path(&mut self, path: &[PathKey], value: Value) -> Result<(), StateError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(StateError::EmptyPath);
        };

        let mut current = self;
        for (depth, key) in parents.iter().enumerate() {
            current = match (current, key) {
                (Value::Object(map), PathKey::Key(k)) => map.get_mut(k.as_str()),
                (Value::Object(map), PathKey::Index(i)) => map.get_mut(&i.to_string()),
                (Value::Array(items), PathKey::Index(i)) => items.get_mut(*i),
                _ => None,
            }
            .ok_or_else(|| StateError::NotAContainer {
                path: display_path(&path[..=depth + 1]),
                found: "undefined",
            })?;
        }

        match (current, last) {
            (Value::Object(map), key) => {
                map.insert(key.to_string(), value);
            }
            (Value::Array(items), PathKey::Index(i)) => {
                if *i >= items.len() {
                    grow(items, *i + 1, path)?;
                }
                items[*i] = value;
            }
            (Value::Array(items), PathKey::Key(k)) if k == "length" => {
                let len = value.to_number();
                if !(0.0..=MAX_ARRAY_INDEX as f64 + 1.0).contains(&len) || len.fract() != 0.0 {
                    return Err(StateError::InvalidLength {
                        path: display_path(path),
                        len,
                    });
                }
                let len = len as usize;
                if len > items.len() {
                    grow(items, len, path)?;
                } else {
                    items.truncate(len);
                }
            }
            // Named keys on arrays have nowhere to live in this model.
            (other, _) => {
                return Err(StateError::NotAContainer {
                    path: display_path(path),
                    found: other.type_of(),
                });
            }
        }
        Ok(())
    }

    /// Loose equality (`==`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, _) | (_, a) if a.is_nullish() => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(_) | Value::String(_) | Value::Bool(_), Value::Number(_) | Value::String(_) | Value::Bool(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Array(_) | Value::Object(_), Value::String(s))
            | (Value::String(s), Value::Array(_) | Value::Object(_)) => {
                let container = if self.is_container() { self } else { other };
                container.to_string() == *s
            }
            _ => self.strict_eq(other),
        }
    }

    /// Strict equality (`===`). Containers compare structurally since values
    /// carry no identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }
}

fn lookup_ref<'a>(value: &'a Value, key: &PathKey) -> Option<&'a Value> {
    match (value, key) {
        (Value::Object(map), PathKey::Key(k)) => map.get(k),
        (Value::Object(map), PathKey::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), PathKey::Index(i)) => items.get(*i),
        _ => None,
    }
}

// Derived leaves such as `length` are not stored, so compute them on the
// last hop instead of walking references.
fn self_or_leaf(current: &Value, rest: &[PathKey]) -> Value {
    match rest {
        [last] => current.get(last),
        _ => Value::Undefined,
    }
}

/// Parse a string the way `Number("...")` does.
pub fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that scripts do not.
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number the way scripts print it (`5`, `1.5`, `NaN`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Array join prints holes and nullish items as empty.
                    if !item.is_nullish() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            // Integral values serialize without a trailing `.0`.
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serde_json::Value::Number((*n as i64).into())
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Largest value a computed member turns into an array index. Bigger
/// numbers address a plain key, as in script engines.
pub const MAX_ARRAY_INDEX: usize = 4_294_967_294;

/// Longest an array may become through an index or `length` write.
pub const MAX_ARRAY_LEN: usize = 1 << 20;

fn grow(items: &mut Vec<Value>, len: usize, path: &[PathKey]) -> Result<(), StateError> {
    if len > MAX_ARRAY_LEN {
        return Err(StateError::ArrayTooLong {
            path: display_path(path),
            len,
            limit: MAX_ARRAY_LEN,
        });
    }
    items.resize(len, Value::Undefined);
    Ok(())
}

/// One hop into a nested value: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

impl PathKey {
    /// Convert a computed member (`a[expr]`) into a path hop.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) if (0.0..=MAX_ARRAY_INDEX as f64).contains(n) && n.fract() == 0.0 => {
                PathKey::Index(*n as usize)
            }
            Value::String(s) => match s.parse::<usize>() {
                Ok(i) if i <= MAX_ARRAY_INDEX && i.to_string() == *s => PathKey::Index(i),
                _ => PathKey::Key(s.clone()),
            },
            other => PathKey::Key(other.to_string()),
        }
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        PathKey::Key(key.to_string())
    }
}

impl From<String> for PathKey {
    fn from(key: String) -> Self {
        PathKey::Key(key)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Key(k) => f.write_str(k),
            PathKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Render a path as `a.b[2].c` for log messages.
pub fn display_path(path: &[PathKey]) -> String {
    let mut out = String::new();
    for key in path {
        match key {
            PathKey::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathKey::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

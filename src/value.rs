//! The TONL value model: a small tagged union plus narrow-type inference.
//!
//! `Value` is the in-memory tree every other component operates on. Object
//! key order is preserved on insertion (array-of-pairs, not a `HashMap`) so
//! that tabular-mode column order can be derived from the first element's
//! keys, as required by the round-trip contract.

use std::fmt;

use crate::limits::is_dangerous_name;

/// A narrow type annotation used for column headers and schema fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Null,
    Bool,
    U32,
    I32,
    F64,
    Str,
    List,
    Obj,
}

impl TypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeHint::Null => "null",
            TypeHint::Bool => "bool",
            TypeHint::U32 => "u32",
            TypeHint::I32 => "i32",
            TypeHint::F64 => "f64",
            TypeHint::Str => "str",
            TypeHint::List => "list",
            TypeHint::Obj => "obj",
        }
    }

    pub fn parse(s: &str) -> Option<TypeHint> {
        match s {
            "null" => Some(TypeHint::Null),
            "bool" => Some(TypeHint::Bool),
            "u32" => Some(TypeHint::U32),
            "i32" => Some(TypeHint::I32),
            "f64" => Some(TypeHint::F64),
            "str" => Some(TypeHint::Str),
            "list" => Some(TypeHint::List),
            "obj" => Some(TypeHint::Obj),
            _ => None,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-order-preserving string-keyed map, the backing store for `Obj`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obj {
    entries: Vec<(String, Value)>,
}

impl Obj {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or overwrite a key, preserving the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Obj {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut obj = Obj::new();
        for (k, v) in iter {
            obj.insert(k, v);
        }
        obj
    }
}

/// The TONL value model. Exactly these variants are observable through the
/// public API; `Missing` (below) is an internal encode-time sentinel only.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Obj(Obj),
}

/// Internal sentinel used only during tabular encoding to represent "this
/// column is absent for this row". Never constructed by, or returned to,
/// a caller of the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Missing;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Value::Obj(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_obj_mut(&mut self) -> Option<&mut Obj> {
        match self {
            Value::Obj(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Narrowest [`TypeHint`] describing this runtime value (§4.1.1).
    pub fn infer_hint(&self) -> TypeHint {
        match self {
            Value::Null => TypeHint::Null,
            Value::Bool(_) => TypeHint::Bool,
            Value::Int(i) => {
                if i32::try_from(*i).is_ok() {
                    TypeHint::I32
                } else if u32::try_from(*i).is_ok() {
                    TypeHint::U32
                } else {
                    TypeHint::I32
                }
            }
            Value::Float(_) => TypeHint::F64,
            Value::Str(_) => TypeHint::Str,
            Value::List(_) => TypeHint::List,
            Value::Obj(_) => TypeHint::Obj,
        }
    }

    /// True when this is an array whose elements are all objects sharing the
    /// same key set (§4.1 "uniform-object" arrays), the trigger for tabular
    /// layout in the encoder.
    pub fn is_uniform_object_array(&self) -> bool {
        let Value::List(items) = self else {
            return false;
        };
        if items.is_empty() {
            return false;
        }
        let mut keys: Option<Vec<&str>> = None;
        for item in items {
            let Value::Obj(o) = item else {
                return false;
            };
            let mut this_keys: Vec<&str> = o.keys().collect();
            this_keys.sort_unstable();
            match &keys {
                None => keys = Some(this_keys),
                Some(k) => {
                    if *k != this_keys {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// True when this is an array of primitives (no List/Obj elements).
    pub fn is_primitive_array(&self) -> bool {
        match self {
            Value::List(items) => items
                .iter()
                .all(|v| !matches!(v, Value::List(_) | Value::Obj(_))),
            _ => false,
        }
    }

    /// Reject object keys that could subvert a dynamically-typed host, or
    /// that are empty. Called at every construction/mutation boundary that
    /// introduces a new key.
    pub fn check_key_safe(key: &str) -> Result<(), crate::error::SecurityViolation> {
        if key.is_empty() {
            return Err(crate::error::SecurityViolation::PrototypePollution {
                key: key.to_string(),
            });
        }
        if is_dangerous_name(key) {
            return Err(crate::error::SecurityViolation::PrototypePollution {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Depth-first check that no container appears as its own descendant.
    /// Returns the key-path of the first cycle found, if any.
    pub fn find_cycle(&self) -> Option<String> {
        fn walk(v: &Value, seen: &mut Vec<*const Value>, path: &mut Vec<String>) -> Option<String> {
            match v {
                Value::List(items) => {
                    let ptr = v as *const Value;
                    if seen.contains(&ptr) {
                        return Some(path.join("."));
                    }
                    seen.push(ptr);
                    for (i, item) in items.iter().enumerate() {
                        path.push(format!("[{i}]"));
                        if let Some(p) = walk(item, seen, path) {
                            return Some(p);
                        }
                        path.pop();
                    }
                    seen.pop();
                    None
                }
                Value::Obj(o) => {
                    let ptr = v as *const Value;
                    if seen.contains(&ptr) {
                        return Some(path.join("."));
                    }
                    seen.push(ptr);
                    for (k, val) in o.iter() {
                        path.push(k.to_string());
                        if let Some(p) = walk(val, seen, path) {
                            return Some(p);
                        }
                        path.pop();
                    }
                    seen.pop();
                    None
                }
                _ => None,
            }
        }
        let mut seen = Vec::new();
        let mut path = Vec::new();
        walk(self, &mut seen, &mut path)
    }
}

/// Infer a narrow type from a text fragment, following the ordered rule set
/// of §4.1 (first match wins).
pub fn infer_from_text(s: &str) -> Value {
    if s == "null" {
        return Value::Null;
    }
    if s == "true" {
        return Value::Bool(true);
    }
    if s == "false" {
        return Value::Bool(false);
    }
    if is_integer_literal(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
        // Overflows i64: widen to float, losing exactness, per §3 invariants.
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }
    if is_float_literal(s) {
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }
    Value::Str(s.trim().to_string())
}

fn is_integer_literal(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    let rest_start = if first == '-' {
        chars.clone()
    } else {
        s.chars()
    };
    let mut has_digit = false;
    let digits = if first == '-' { rest_start } else { s.chars() };
    for (i, c) in digits.enumerate() {
        if i == 0 && first == '-' {
            continue;
        }
        if !c.is_ascii_digit() {
            return false;
        }
        has_digit = true;
    }
    has_digit
}

fn is_float_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let mut i = 0;
    if bytes[i] == b'-' {
        i += 1;
    }
    let mut saw_digit = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        saw_digit = true;
    }
    let mut saw_dot = false;
    if i < bytes.len() && bytes[i] == b'.' {
        saw_dot = true;
        i += 1;
        let mut saw_frac_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            saw_frac_digit = true;
        }
        if !saw_frac_digit {
            return false;
        }
    }
    if !saw_dot {
        // Scientific notation without a fractional part, e.g. `1e10`.
        if !saw_digit {
            return false;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut saw_exp_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            saw_exp_digit = true;
        }
        if !saw_exp_digit {
            return false;
        }
    }
    saw_dot && i == bytes.len() && saw_digit || (!saw_dot && i == bytes.len() && saw_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_null_bool_int_float_str() {
        assert_eq!(infer_from_text("null"), Value::Null);
        assert_eq!(infer_from_text("true"), Value::Bool(true));
        assert_eq!(infer_from_text("false"), Value::Bool(false));
        assert_eq!(infer_from_text("42"), Value::Int(42));
        assert_eq!(infer_from_text("-7"), Value::Int(-7));
        assert_eq!(infer_from_text("3.14"), Value::Float(3.14));
        assert_eq!(infer_from_text("1e10"), Value::Float(1e10));
        assert_eq!(infer_from_text("hello"), Value::Str("hello".to_string()));
    }

    #[test]
    fn infer_hint_picks_narrowest_int_width() {
        assert_eq!(Value::Int(5).infer_hint(), TypeHint::I32);
        assert_eq!(Value::Int(-5).infer_hint(), TypeHint::I32);
        assert_eq!(Value::Int(i64::from(u32::MAX)).infer_hint(), TypeHint::U32);
    }

    #[test]
    fn uniform_object_array_detection() {
        let mut a = Obj::new();
        a.insert("id", Value::Int(1));
        a.insert("name", Value::Str("a".into()));
        let mut b = Obj::new();
        b.insert("id", Value::Int(2));
        b.insert("name", Value::Str("b".into()));
        let arr = Value::List(vec![Value::Obj(a), Value::Obj(b)]);
        assert!(arr.is_uniform_object_array());
    }

    #[test]
    fn detects_self_reference() {
        // Constructed indirectly: an object containing a list containing
        // itself is not directly expressible in a tree without unsafe, so
        // this test instead verifies no false positive on shared-but-acyclic
        // structures (encoder allows diamond sharing).
        let shared = Value::Int(1);
        let tree = Value::List(vec![shared.clone(), shared]);
        assert!(tree.find_cycle().is_none());
    }
}

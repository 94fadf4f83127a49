//! Path-targeted mutation operations (§4.6): `get`/`set`/`delete`/`push`/
//! `pop`/`merge`.
//!
//! Mutation paths address a single concrete location, so navigation here
//! only understands `Field` and `Index` segments (wildcards, slices,
//! recursive descent and filters are query-only constructs — attempting to
//! use one as a mutation target is a [`QueryError::InvalidPath`]). Every
//! operation is all-or-nothing: navigation failures are reported before any
//! part of the tree is touched.

use crate::error::{QueryError, SecurityViolation, TonlError, TonlResult, TypeError};
use crate::path::{Path, Segment};
use crate::value::{Obj, Value};

fn field_or_index(segment: &Segment) -> TonlResult<&Segment> {
    match segment {
        Segment::Field(_) | Segment::Index(_) => Ok(segment),
        _ => Err(QueryError::InvalidPath {
            expression: format!("{segment:?}"),
            reason: "mutation paths may only use field and index segments".to_string(),
        }
        .into()),
    }
}

/// Read the value at `path`, or `None` if any segment is absent /
/// out-of-bounds (a benign miss, not an error — matches §7's "query
/// evaluation returns an empty result set for benign misses").
pub fn get<'a>(root: &'a Value, path: &Path) -> TonlResult<Option<&'a Value>> {
    let mut node = root;
    for segment in &path.segments {
        field_or_index(segment)?;
        match segment {
            Segment::Field(name) => {
                Value::check_key_safe(name)?;
                match node.as_obj().and_then(|o| o.get(name)) {
                    Some(v) => node = v,
                    None => return Ok(None),
                }
            }
            Segment::Index(i) => match node.as_list() {
                Some(items) => match normalize_index(items.len(), *i) {
                    Some(idx) if idx < items.len() => node = &items[idx],
                    _ => return Ok(None),
                },
                None => return Ok(None),
            },
            _ => unreachable!("checked by field_or_index"),
        }
    }
    Ok(Some(node))
}

pub fn exists(root: &Value, path: &Path) -> TonlResult<bool> {
    Ok(get(root, path)?.is_some())
}

/// Normalize a possibly-negative index against `len`, the sign-normalization
/// rule shared by read and write paths: `-k` resolves to `len - k`.
fn normalize_index(len: usize, i: i64) -> Option<usize> {
    if i < 0 {
        let resolved = len as i64 + i;
        if resolved < 0 {
            None
        } else {
            Some(resolved as usize)
        }
    } else {
        Some(i as usize)
    }
}

/// Navigate to the parent of the final segment, creating intermediate
/// objects along the way when `create_path` is set. Returns the parent and
/// the final segment (still un-applied).
fn navigate_parent_mut<'a>(
    root: &'a mut Value,
    path: &Path,
    create_path: bool,
) -> TonlResult<(&'a mut Value, &'a Segment)> {
    if path.segments.is_empty() {
        return Err(QueryError::InvalidPath {
            expression: "$".to_string(),
            reason: "path has no segments to target".to_string(),
        }
        .into());
    }
    let (last, prefix) = path.segments.split_last().unwrap();
    field_or_index(last)?;

    let mut node = root;
    for segment in prefix {
        field_or_index(segment)?;
        match segment {
            Segment::Field(name) => {
                Value::check_key_safe(name)?;
                if !matches!(node, Value::Obj(_)) {
                    if create_path {
                        *node = Value::Obj(Obj::new());
                    } else {
                        return Err(TypeError::NotAnObject {
                            path: name.clone(),
                        }
                        .into());
                    }
                }
                let obj = node.as_obj_mut().unwrap();
                if !obj.contains_key(name) {
                    if create_path {
                        obj.insert(name.clone(), Value::Obj(Obj::new()));
                    } else {
                        return Err(TypeError::NotAnObject {
                            path: name.clone(),
                        }
                        .into());
                    }
                }
                node = obj.get_mut(name).unwrap();
            }
            Segment::Index(i) => {
                let Value::List(items) = node else {
                    return Err(TypeError::NotAnArray {
                        path: format!("[{i}]"),
                    }
                    .into());
                };
                let idx = normalize_index(items.len(), *i).ok_or(TypeError::IndexOutOfBounds {
                    index: *i,
                    length: items.len(),
                })?;
                if idx >= items.len() {
                    return Err(TypeError::IndexOutOfBounds {
                        index: *i,
                        length: items.len(),
                    }
                    .into());
                }
                node = &mut items[idx];
            }
            _ => unreachable!("checked by field_or_index"),
        }
    }
    Ok((node, last))
}

pub fn set(root: &mut Value, path: &Path, value: Value, create_path: bool) -> TonlResult<()> {
    let (parent, last) = navigate_parent_mut(root, path, create_path)?;
    match last {
        Segment::Field(name) => {
            Value::check_key_safe(name)?;
            if !matches!(parent, Value::Obj(_)) {
                if create_path {
                    *parent = Value::Obj(Obj::new());
                } else {
                    return Err(TypeError::NotAnObject { path: name.clone() }.into());
                }
            }
            parent.as_obj_mut().unwrap().insert(name.clone(), value);
        }
        Segment::Index(i) => {
            let Value::List(items) = parent else {
                return Err(TypeError::NotAnArray {
                    path: format!("[{i}]"),
                }
                .into());
            };
            let len = items.len();
            let idx = normalize_index(len, *i).ok_or(TypeError::IndexOutOfBounds {
                index: *i,
                length: len,
            })?;
            if idx > len {
                return Err(TypeError::IndexOutOfBounds {
                    index: *i,
                    length: len,
                }
                .into());
            }
            if idx == len {
                items.push(value);
            } else {
                items[idx] = value;
            }
        }
        _ => unreachable!(),
    }
    if let Some(cycle_path) = root.find_cycle() {
        return Err(SecurityViolation::Cycle { path: cycle_path }.into());
    }
    Ok(())
}

pub fn delete(root: &mut Value, path: &Path) -> TonlResult<()> {
    let (parent, last) = navigate_parent_mut(root, path, false)?;
    match last {
        Segment::Field(name) => {
            Value::check_key_safe(name)?;
            let obj = parent
                .as_obj_mut()
                .ok_or_else(|| TypeError::NotAnObject { path: name.clone() })?;
            obj.remove(name);
        }
        Segment::Index(i) => {
            let items = parent
                .as_list_mut()
                .ok_or_else(|| TypeError::NotAnArray { path: format!("[{i}]") })?;
            let idx = normalize_index(items.len(), *i).ok_or(TypeError::IndexOutOfBounds {
                index: *i,
                length: items.len(),
            })?;
            if idx >= items.len() {
                return Err(TypeError::IndexOutOfBounds {
                    index: *i,
                    length: items.len(),
                }
                .into());
            }
            items.remove(idx);
        }
        _ => unreachable!(),
    }
    Ok(())
}

pub fn push(root: &mut Value, path: &Path, value: Value) -> TonlResult<()> {
    let target = get_mut(root, path)?;
    let items = target
        .as_list_mut()
        .ok_or_else(|| TypeError::NotAnArray { path: "target".to_string() })?;
    items.push(value);
    Ok(())
}

pub fn pop(root: &mut Value, path: &Path) -> TonlResult<Value> {
    let target = get_mut(root, path)?;
    let items = target
        .as_list_mut()
        .ok_or_else(|| TypeError::NotAnArray { path: "target".to_string() })?;
    items.pop().ok_or_else(|| {
        TypeError::IndexOutOfBounds {
            index: -1,
            length: 0,
        }
        .into()
    })
}

pub fn merge(root: &mut Value, path: &Path, patch: Obj) -> TonlResult<()> {
    for key in patch.keys() {
        Value::check_key_safe(key)?;
    }
    let target = get_mut(root, path)?;
    let obj = target
        .as_obj_mut()
        .ok_or_else(|| TypeError::NotAnObject { path: "target".to_string() })?;
    for (k, v) in patch.iter() {
        obj.insert(k, v.clone());
    }
    Ok(())
}

/// Mutable navigation across the *whole* path (not stopping at the parent),
/// used by `push`/`pop`/`merge`, which operate on the node the path
/// addresses rather than a field within it.
fn get_mut<'a>(root: &'a mut Value, path: &Path) -> TonlResult<&'a mut Value> {
    let mut node = root;
    for segment in &path.segments {
        field_or_index(segment)?;
        match segment {
            Segment::Field(name) => {
                Value::check_key_safe(name)?;
                node = node
                    .as_obj_mut()
                    .and_then(|o| o.get_mut(name))
                    .ok_or_else(|| TypeError::NotAnObject { path: name.clone() })?;
            }
            Segment::Index(i) => {
                let len = node.as_list().map(|l| l.len()).unwrap_or(0);
                let idx = normalize_index(len, *i).ok_or(TypeError::IndexOutOfBounds {
                    index: *i,
                    length: len,
                })?;
                node = node
                    .as_list_mut()
                    .and_then(|items| items.get_mut(idx))
                    .ok_or_else(|| TypeError::IndexOutOfBounds { index: *i, length: len })?;
            }
            _ => unreachable!(),
        }
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;

    fn sample() -> Value {
        let mut a = Obj::new();
        a.insert("age", Value::Int(30));
        let mut root = Obj::new();
        root.insert("users", Value::List(vec![Value::Obj(a)]));
        Value::Obj(root)
    }

    #[test]
    fn set_updates_existing_field_s4() {
        let mut v = sample();
        let path = parse_path("$.users[0].age").unwrap();
        set(&mut v, &path, Value::Int(31), false).unwrap();
        assert_eq!(get(&v, &path).unwrap(), Some(&Value::Int(31)));
    }

    #[test]
    fn set_dangerous_key_is_rejected() {
        let mut v = sample();
        let path = parse_path("$.__proto__").unwrap();
        assert!(set(&mut v, &path, Value::Int(1), true).is_err());
    }

    #[test]
    fn set_out_of_bounds_index_fails() {
        let mut v = sample();
        let path = parse_path("$.users[5]").unwrap();
        assert!(matches!(
            set(&mut v, &path, Value::Null, false),
            Err(TonlError::Type(TypeError::IndexOutOfBounds { .. }))
        ));
    }

    #[test]
    fn push_appends_and_pop_removes_last() {
        let mut v = sample();
        let path = parse_path("$.users").unwrap();
        push(&mut v, &path, Value::Obj(Obj::new())).unwrap();
        let list = get(&v, &path).unwrap().unwrap().as_list().unwrap();
        assert_eq!(list.len(), 2);
        let popped = pop(&mut v, &path).unwrap();
        assert_eq!(popped, Value::Obj(Obj::new()));
    }

    #[test]
    fn delete_shifts_trailing_elements() {
        let mut root = Obj::new();
        root.insert(
            "items",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        let mut v = Value::Obj(root);
        let path = parse_path("$.items[0]").unwrap();
        delete(&mut v, &path).unwrap();
        let items = get(&v, &parse_path("$.items").unwrap()).unwrap().unwrap();
        assert_eq!(items, &Value::List(vec![Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn merge_shallow_merges_keys() {
        let mut v = sample();
        let mut patch = Obj::new();
        patch.insert("name", Value::Str("Alice".into()));
        let path = parse_path("$.users[0]").unwrap();
        merge(&mut v, &path, patch).unwrap();
        let user = get(&v, &path).unwrap().unwrap().as_obj().unwrap();
        assert_eq!(user.get("name").unwrap(), &Value::Str("Alice".into()));
        assert_eq!(user.get("age").unwrap(), &Value::Int(30));
    }
}

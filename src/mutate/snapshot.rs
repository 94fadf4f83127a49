//! Snapshot/diff/restore (§4.6): a deep-copy shadow tree plus a structural
//! diff against the live document.
//!
//! Since [`Value`] is an owned tree with no aliasing, "deep copy" is just
//! `Clone` — there is no shared-reference graph to rebuild.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Value);

impl Snapshot {
    pub fn capture(root: &Value) -> Self {
        Snapshot(root.clone())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Structural diff between a snapshot and the current tree: every path
/// present in one but not the other, or present in both with a different
/// value, yields one entry. Unchanged paths are omitted.
pub fn diff(snapshot: &Snapshot, current: &Value) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    walk("$", snapshot.value(), current, &mut out);
    out
}

pub fn restore(snapshot: &Snapshot) -> Value {
    snapshot.value().clone()
}

fn walk(path: &str, before: &Value, after: &Value, out: &mut Vec<DiffEntry>) {
    match (before, after) {
        (Value::Obj(b), Value::Obj(a)) => {
            for (k, bv) in b.iter() {
                let child_path = format!("{path}.{k}");
                match a.get(k) {
                    Some(av) => walk(&child_path, bv, av, out),
                    None => out.push(DiffEntry {
                        path: child_path,
                        kind: DiffKind::Removed,
                        before: Some(bv.clone()),
                        after: None,
                    }),
                }
            }
            for (k, av) in a.iter() {
                if b.get(k).is_none() {
                    out.push(DiffEntry {
                        path: format!("{path}.{k}"),
                        kind: DiffKind::Added,
                        before: None,
                        after: Some(av.clone()),
                    });
                }
            }
        }
        (Value::List(b), Value::List(a)) => {
            let max = b.len().max(a.len());
            for i in 0..max {
                let child_path = format!("{path}[{i}]");
                match (b.get(i), a.get(i)) {
                    (Some(bv), Some(av)) => walk(&child_path, bv, av, out),
                    (Some(bv), None) => out.push(DiffEntry {
                        path: child_path,
                        kind: DiffKind::Removed,
                        before: Some(bv.clone()),
                        after: None,
                    }),
                    (None, Some(av)) => out.push(DiffEntry {
                        path: child_path,
                        kind: DiffKind::Added,
                        before: None,
                        after: Some(av.clone()),
                    }),
                    (None, None) => unreachable!(),
                }
            }
        }
        (b, a) if b != a => out.push(DiffEntry {
            path: path.to_string(),
            kind: DiffKind::Changed,
            before: Some(b.clone()),
            after: Some(a.clone()),
        }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Obj;

    #[test]
    fn diff_reports_changed_added_removed() {
        let mut before_obj = Obj::new();
        before_obj.insert("name", Value::Str("Alice".into()));
        before_obj.insert("age", Value::Int(30));
        let before = Value::Obj(before_obj);
        let snap = Snapshot::capture(&before);

        let mut after_obj = Obj::new();
        after_obj.insert("name", Value::Str("Alicia".into()));
        after_obj.insert("city", Value::Str("Lagos".into()));
        let after = Value::Obj(after_obj);

        let entries = diff(&snap, &after);
        assert!(entries
            .iter()
            .any(|e| e.path == "$.name" && e.kind == DiffKind::Changed));
        assert!(entries
            .iter()
            .any(|e| e.path == "$.age" && e.kind == DiffKind::Removed));
        assert!(entries
            .iter()
            .any(|e| e.path == "$.city" && e.kind == DiffKind::Added));
    }

    #[test]
    fn restore_returns_snapshot_value_unchanged() {
        let v = Value::Str("frozen".into());
        let snap = Snapshot::capture(&v);
        assert_eq!(restore(&snap), v);
    }

    #[test]
    fn unchanged_tree_yields_no_diff_entries() {
        let v = Value::Int(7);
        let snap = Snapshot::capture(&v);
        assert!(diff(&snap, &v).is_empty());
    }
}

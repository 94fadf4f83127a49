//! Path-AST query evaluator (§4.5 "Evaluation semantics").
//!
//! Walks a [`Value`] tree node-set by node-set, one [`Segment`] at a time,
//! the same way the grammar describes it: start with `{root}`, transform
//! the whole set per segment, move on. Each surviving node carries its
//! concrete path (all wildcards/indices resolved) so callers — the index
//! layer, the mutation engine, aggregation — can address it directly
//! without re-walking the tree.

use chrono::Utc;

use crate::error::{LimitExceeded, QueryError, SecurityViolation, TonlError, TonlResult};
use crate::limits::Limits;
use crate::path::{Path, Segment};
use crate::query::filter_eval::eval_filter;
use crate::value::Value;

/// One resolved step of a concrete path: a field name or an array index.
/// Distinct from [`Segment`], which may still contain wildcards/slices/etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConcretePath(pub Vec<ConcreteSegment>);

impl ConcretePath {
    pub fn push_field(&self, name: &str) -> ConcretePath {
        let mut v = self.0.clone();
        v.push(ConcreteSegment::Field(name.to_string()));
        ConcretePath(v)
    }

    pub fn push_index(&self, idx: usize) -> ConcretePath {
        let mut v = self.0.clone();
        v.push(ConcreteSegment::Index(idx));
        ConcretePath(v)
    }

    /// Canonical `$.a[0].b`-style rendering, used both for display and as
    /// the cache/index key space.
    pub fn to_canonical_string(&self) -> String {
        let mut s = String::from("$");
        for seg in &self.0 {
            match seg {
                ConcreteSegment::Field(f) => {
                    s.push('.');
                    s.push_str(f);
                }
                ConcreteSegment::Index(i) => {
                    s.push('[');
                    s.push_str(&i.to_string());
                    s.push(']');
                }
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub path: ConcretePath,
    pub value: Value,
}

struct Node<'a> {
    path: ConcretePath,
    value: &'a Value,
}

/// Evaluate `path` against `root`, returning every surviving match. `now` is
/// resolved once by the caller (the document façade) so temporal literals
/// stay monotonic within a single query (§9 open question).
pub fn evaluate(root: &Value, path: &Path, limits: &Limits) -> TonlResult<Vec<QueryMatch>> {
    let now = Utc::now();
    let mut current: Vec<Node> = vec![Node {
        path: ConcretePath::default(),
        value: root,
    }];

    for segment in &path.segments {
        current = apply_segment(current, segment, root, limits, now, 0)?;
    }

    Ok(current
        .into_iter()
        .map(|n| QueryMatch {
            path: n.path,
            value: n.value.clone(),
        })
        .collect())
}

fn check_field_safe(name: &str) -> TonlResult<()> {
    Value::check_key_safe(name).map_err(TonlError::from)
}

fn apply_segment<'a>(
    nodes: Vec<Node<'a>>,
    segment: &Segment,
    root: &'a Value,
    limits: &Limits,
    now: chrono::DateTime<Utc>,
    depth: usize,
) -> TonlResult<Vec<Node<'a>>> {
    if depth > limits.max_query_depth {
        return Err(LimitExceeded::QueryTooDeep {
            limit: limits.max_query_depth,
        }
        .into());
    }
    match segment {
        Segment::Field(name) => {
            check_field_safe(name)?;
            let mut out = Vec::new();
            for node in nodes {
                if let Value::Obj(o) = node.value {
                    if let Some(child) = o.get(name) {
                        out.push(Node {
                            path: node.path.push_field(name),
                            value: child,
                        });
                    }
                }
            }
            Ok(out)
        }
        Segment::Index(i) => {
            let mut out = Vec::new();
            for node in nodes {
                if let Value::List(items) = node.value {
                    if let Some(idx) = resolve_index(items.len(), *i) {
                        out.push(Node {
                            path: node.path.push_index(idx),
                            value: &items[idx],
                        });
                    }
                }
            }
            Ok(out)
        }
        Segment::Slice { start, end, step } => {
            let step = step.unwrap_or(1);
            if step == 0 {
                return Err(QueryError::InvalidPath {
                    expression: "slice".to_string(),
                    reason: "slice step cannot be zero".to_string(),
                }
                .into());
            }
            let step_mag = step.unsigned_abs() as usize;
            if step_mag > limits.max_iterations {
                return Err(LimitExceeded::QueryTooDeep {
                    limit: limits.max_query_depth,
                }
                .into());
            }
            let mut out = Vec::new();
            for node in nodes {
                if let Value::List(items) = node.value {
                    for idx in slice_indices(items.len(), *start, *end, step) {
                        out.push(Node {
                            path: node.path.push_index(idx),
                            value: &items[idx],
                        });
                    }
                }
            }
            Ok(out)
        }
        Segment::Wildcard => {
            let mut out = Vec::new();
            for node in nodes {
                match node.value {
                    Value::List(items) => {
                        for (idx, item) in items.iter().enumerate() {
                            out.push(Node {
                                path: node.path.push_index(idx),
                                value: item,
                            });
                        }
                    }
                    Value::Obj(o) => {
                        for (k, v) in o.iter() {
                            check_field_safe(k)?;
                            out.push(Node {
                                path: node.path.push_field(k),
                                value: v,
                            });
                        }
                    }
                    _ => {}
                }
            }
            Ok(out)
        }
        Segment::Recursive(field) => {
            let mut out = Vec::new();
            for node in nodes {
                collect_recursive(node.value, &node.path, field.as_deref(), limits, 0, &mut out)?;
            }
            Ok(out)
        }
        Segment::Filter(expr) => {
            let mut out = Vec::new();
            for node in nodes {
                if eval_filter(expr, node.value, root, limits, now)? {
                    out.push(node);
                }
            }
            Ok(out)
        }
    }
}

fn collect_recursive<'a>(
    value: &'a Value,
    path: &ConcretePath,
    field: Option<&str>,
    limits: &Limits,
    depth: usize,
    out: &mut Vec<Node<'a>>,
) -> TonlResult<()> {
    if depth > limits.max_query_depth {
        return Err(LimitExceeded::QueryTooDeep {
            limit: limits.max_query_depth,
        }
        .into());
    }
    match value {
        Value::Obj(o) => {
            for (k, v) in o.iter() {
                check_field_safe(k)?;
                let child_path = path.push_field(k);
                let matches = match field {
                    Some(name) => k == name,
                    None => true,
                };
                if matches {
                    out.push(Node {
                        path: child_path.clone(),
                        value: v,
                    });
                }
                collect_recursive(v, &child_path, field, limits, depth + 1, out)?;
            }
        }
        Value::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                let child_path = path.push_index(idx);
                if field.is_none() {
                    out.push(Node {
                        path: child_path.clone(),
                        value: item,
                    });
                }
                collect_recursive(item, &child_path, field, limits, depth + 1, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolve a possibly-negative index against `len`; `None` means
/// out-of-bounds (yields nothing, per §4.5).
fn resolve_index(len: usize, i: i64) -> Option<usize> {
    let resolved = if i < 0 {
        let from_end = -i as usize;
        if from_end > len {
            return None;
        }
        len - from_end
    } else {
        i as usize
    };
    if resolved >= len {
        return None;
    }
    Some(resolved)
}

fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: i64) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let norm = |v: i64| -> i64 {
        if v < 0 {
            (len as i64 + v).max(0)
        } else {
            v.min(len as i64)
        }
    };
    let mut out = Vec::new();
    if step > 0 {
        let s = start.map(norm).unwrap_or(0).max(0) as usize;
        let e = end.map(norm).unwrap_or(len as i64).max(0) as usize;
        let mut i = s;
        while i < e && i < len {
            out.push(i);
            i += step as usize;
        }
    } else {
        let s = start.map(norm).unwrap_or(len as i64 - 1);
        let e = end.map(norm).unwrap_or(-1);
        let mut i = s;
        while i > e && i >= 0 {
            out.push(i as usize);
            i += step; // step is negative
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode;
    use crate::parser::DecodeOptions;
    use crate::path::parse_path;

    fn sample() -> Value {
        let text = "users[3]{name,age,role}:\n  Alice,30,admin\n  Bob,25,user\n  Carol,35,moderator\n";
        decode(text, &DecodeOptions::default(), &Limits::default()).unwrap()
    }

    #[test]
    fn wildcard_field_projection_s_count() {
        let v = sample();
        let path = parse_path("$.users[*].name").unwrap();
        let matches = evaluate(&v, &path, &Limits::default()).unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn filter_with_logical_ops_returns_alice_only_s3() {
        let v = sample();
        let path = parse_path("$.users[?(@.age > 25 && @.role == \"admin\")]").unwrap();
        let matches = evaluate(&v, &path, &Limits::default()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].value.as_obj().unwrap().get("name").unwrap(),
            &Value::Str("Alice".to_string())
        );
    }

    #[test]
    fn negative_index_and_slice() {
        let v = sample();
        let last = parse_path("$.users[-1].name").unwrap();
        let matches = evaluate(&v, &last, &Limits::default()).unwrap();
        assert_eq!(matches[0].value, Value::Str("Carol".to_string()));

        let slice = parse_path("$.users[0:2]").unwrap();
        let matches = evaluate(&v, &slice, &Limits::default()).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn dangerous_field_name_is_rejected() {
        let v = sample();
        let path = parse_path("$.__proto__").unwrap();
        assert!(evaluate(&v, &path, &Limits::default()).is_err());
    }
}

//! Filter predicate evaluator (§4.5 "Filter evaluator").
//!
//! Evaluates a [`FilterExpr`] against one candidate element (`@`) with
//! access to the document root (`$`). Operand paths inside a filter are
//! expected to resolve to a single scalar (`@.age`, `$.threshold[0]`), so
//! operand-segment resolution here is a simple field/index walk rather than
//! the full set-producing machinery in [`super::evaluator`] — wildcards,
//! slices, recursive descent and nested filters inside an operand path
//! are not meaningful for a single comparison operand and resolve to
//! "missing" rather than expanding into several values.

use chrono::{DateTime, Utc};

use crate::error::TonlResult;
use crate::limits::Limits;
use crate::path::{CmpOp, FilterExpr, Literal, Operand, Segment, TemporalLiteral};
use crate::query::fuzzy;
use crate::query::regex_guard;
use crate::query::temporal;
use crate::value::Value;

pub fn eval_filter(
    expr: &FilterExpr,
    current: &Value,
    root: &Value,
    limits: &Limits,
    now: DateTime<Utc>,
) -> TonlResult<bool> {
    match expr {
        FilterExpr::Or(a, b) => Ok(eval_filter(a, current, root, limits, now)?
            || eval_filter(b, current, root, limits, now)?),
        FilterExpr::And(a, b) => Ok(eval_filter(a, current, root, limits, now)?
            && eval_filter(b, current, root, limits, now)?),
        FilterExpr::Not(inner) => Ok(!eval_filter(inner, current, root, limits, now)?),
        FilterExpr::Truthy(operand) => {
            let v = resolve_operand(operand, current, root, now)?;
            Ok(is_truthy(&v))
        }
        FilterExpr::Compare { left, op, right, right2 } => {
            let l = resolve_operand(left, current, root, now)?;
            let r = resolve_operand(right, current, root, now)?;
            let r2 = match right2 {
                Some(o) => Some(resolve_operand(o, current, root, now)?),
                None => None,
            };
            eval_compare(&l, *op, &r, r2.as_ref(), limits, now)
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Obj(o) => !o.is_empty(),
    }
}

fn resolve_operand(
    operand: &Operand,
    current: &Value,
    root: &Value,
    now: DateTime<Utc>,
) -> TonlResult<Value> {
    match operand {
        Operand::Current(segs) => Ok(resolve_segments(current, segs)),
        Operand::Root(segs) => Ok(resolve_segments(root, segs)),
        Operand::Literal(Literal::Temporal(lit)) => {
            let instant = temporal::resolve(lit, now)?;
            Ok(Value::Str(instant.to_rfc3339()))
        }
        Operand::Literal(lit) => literal_to_value(lit),
    }
}

fn resolve_segments(start: &Value, segments: &[Segment]) -> Value {
    let mut node = start;
    for seg in segments {
        match seg {
            Segment::Field(name) => match node.as_obj().and_then(|o| o.get(name)) {
                Some(v) => node = v,
                None => return Value::Null,
            },
            Segment::Index(i) => match node.as_list() {
                Some(items) => {
                    let len = items.len() as i64;
                    let resolved = if *i < 0 { len + i } else { *i };
                    if resolved < 0 || resolved >= len {
                        return Value::Null;
                    }
                    node = &items[resolved as usize];
                }
                None => return Value::Null,
            },
            // Wildcards/slices/recursion/nested filters are not meaningful
            // as part of a scalar comparison operand.
            _ => return Value::Null,
        }
    }
    node.clone()
}

fn literal_to_value(lit: &Literal) -> TonlResult<Value> {
    Ok(match lit {
        Literal::Number(n) => Value::Float(*n),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        // Intercepted earlier in resolve_operand, which has `now` in scope.
        Literal::Temporal(_) => Value::Null,
    })
}

fn as_number(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn as_str(v: &Value) -> Option<String> {
    match v {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn eval_compare(
    left: &Value,
    op: CmpOp,
    right: &Value,
    right2: Option<&Value>,
    limits: &Limits,
    now: DateTime<Utc>,
) -> TonlResult<bool> {
    match op {
        CmpOp::Eq => Ok(values_equal(left, right)),
        CmpOp::Ne => Ok(!values_equal(left, right)),
        CmpOp::Gt | CmpOp::Lt | CmpOp::Ge | CmpOp::Le => Ok(numeric_or_string_cmp(left, op, right)),
        CmpOp::Contains => Ok(str_op(left, right, |a, b| a.contains(b))),
        CmpOp::StartsWith => Ok(str_op(left, right, |a, b| a.starts_with(b))),
        CmpOp::EndsWith => Ok(str_op(left, right, |a, b| a.ends_with(b))),
        CmpOp::Matches => eval_regex_match(left, right, limits),
        CmpOp::FuzzyEq => Ok(str_op(left, right, |a, b| {
            fuzzy::similar(a, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD
        })),
        CmpOp::FuzzyContains => Ok(str_op(left, right, |a, b| {
            a.split_whitespace().any(|w| fuzzy::similar(w, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD)
        })),
        CmpOp::FuzzyStartsWith => Ok(str_op(left, right, |a, b| {
            let prefix_len = b.chars().count().min(a.chars().count());
            let prefix: String = a.chars().take(prefix_len).collect();
            fuzzy::similar(&prefix, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD
        })),
        CmpOp::FuzzyEndsWith => Ok(str_op(left, right, |a, b| {
            let suffix_len = b.chars().count().min(a.chars().count());
            let suffix: String = a.chars().skip(a.chars().count() - suffix_len).collect();
            fuzzy::similar(&suffix, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD
        })),
        CmpOp::FuzzyMatch => Ok(str_op(left, right, |a, b| {
            fuzzy::similar(a, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD
        })),
        CmpOp::SoundsLike => Ok(str_op(left, right, |a, b| fuzzy::soundex(a) == fuzzy::soundex(b))),
        CmpOp::Similar => Ok(str_op(left, right, |a, b| {
            fuzzy::similar(a, b) >= fuzzy::DEFAULT_FUZZY_THRESHOLD
        })),
        CmpOp::Before => Ok(temporal_cmp(left, right, now, |a, b| a < b)),
        CmpOp::After => Ok(temporal_cmp(left, right, now, |a, b| a > b)),
        CmpOp::Between => {
            let Some(r2) = right2 else { return Ok(false) };
            let lo = temporal_instant(right, now);
            let hi = temporal_instant(r2, now);
            let l = temporal_instant(left, now);
            Ok(matches!((l, lo, hi), (Some(l), Some(lo), Some(hi)) if l >= lo && l <= hi))
        }
        CmpOp::DaysAgo => Ok(temporal_within(left, right, now, crate::path::TemporalUnit::Day)),
        CmpOp::WeeksAgo => Ok(temporal_within(left, right, now, crate::path::TemporalUnit::Week)),
        CmpOp::MonthsAgo => Ok(temporal_within(left, right, now, crate::path::TemporalUnit::Month)),
        CmpOp::YearsAgo => Ok(temporal_within(left, right, now, crate::path::TemporalUnit::Year)),
        CmpOp::SameDay => Ok(temporal_pair(left, right, now, temporal::same_day)),
        CmpOp::SameWeek => Ok(temporal_pair(left, right, now, temporal::same_week)),
        CmpOp::SameMonth => Ok(temporal_pair(left, right, now, temporal::same_month)),
        CmpOp::SameYear => Ok(temporal_pair(left, right, now, temporal::same_year)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        if matches!(a, Value::Int(_) | Value::Float(_)) && matches!(b, Value::Int(_) | Value::Float(_)) {
            return x == y;
        }
    }
    a == b
}

fn numeric_or_string_cmp(a: &Value, op: CmpOp, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return match op {
            CmpOp::Gt => x > y,
            CmpOp::Lt => x < y,
            CmpOp::Ge => x >= y,
            CmpOp::Le => x <= y,
            _ => false,
        };
    }
    if let (Some(x), Some(y)) = (as_str(a), as_str(b)) {
        return match op {
            CmpOp::Gt => x > y,
            CmpOp::Lt => x < y,
            CmpOp::Ge => x >= y,
            CmpOp::Le => x <= y,
            _ => false,
        };
    }
    false
}

fn str_op(a: &Value, b: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    match (as_str(a), as_str(b)) {
        (Some(x), Some(y)) => f(&x, &y),
        _ => false,
    }
}

fn eval_regex_match(left: &Value, right: &Value, limits: &Limits) -> TonlResult<bool> {
    let (Some(text), Some(pattern)) = (as_str(left), as_str(right)) else {
        return Ok(false);
    };
    let re = regex_guard::compile_checked(&pattern, limits)?;
    let (matched, _timed_out) =
        regex_guard::timed_is_match(&re, &text, 100, 1000);
    Ok(matched)
}

/// Temporal operands are normalized to an RFC-3339 `Value::Str` by
/// [`resolve_operand`] before reaching here (both literals, already resolved
/// against `now`, and field values, which are plain strings in the tree).
fn temporal_instant(v: &Value, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match v {
        Value::Str(s) => temporal::parse_operand_instant(s).ok(),
        _ => None,
    }
}

fn temporal_cmp(left: &Value, right: &Value, now: DateTime<Utc>, f: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool) -> bool {
    match (temporal_instant(left, now), temporal_instant(right, now)) {
        (Some(l), Some(r)) => f(l, r),
        _ => false,
    }
}

fn temporal_pair(left: &Value, right: &Value, now: DateTime<Utc>, f: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool) -> bool {
    temporal_cmp(left, right, now, f)
}

fn temporal_within(left: &Value, right: &Value, now: DateTime<Utc>, unit: crate::path::TemporalUnit) -> bool {
    let (Some(instant), Some(amount)) = (temporal_instant(left, now), as_number(right)) else {
        return false;
    };
    temporal::within_last(instant, amount as i64, unit, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;
    use crate::parser::{decode, DecodeOptions};

    #[test]
    fn contains_operator() {
        let v = Value::Str("hello world".to_string());
        assert!(str_op(&v, &Value::Str("world".into()), |a, b| a.contains(b)));
    }

    #[test]
    fn numeric_equality_coerces_int_and_float() {
        assert!(values_equal(&Value::Int(5), &Value::Float(5.0)));
    }

    #[test]
    fn filter_s3_alice_admin_over_25() {
        let text = "users[3]{name,age,role}:\n  Alice,30,admin\n  Bob,25,user\n  Carol,35,moderator\n";
        let v = decode(text, &DecodeOptions::default(), &Limits::default()).unwrap();
        let path = parse_path("$.users[?(@.age > 25 && @.role == \"admin\")]").unwrap();
        let matches = crate::query::evaluator::evaluate(&v, &path, &Limits::default()).unwrap();
        assert_eq!(matches.len(), 1);
    }
}

//! Aggregation layer (§4.6.1 of the expanded specification): a thin set of
//! reducers atop the node set a path query produces. [`crate::document::Document`]
//! exposes these as methods; the functions here take the match list directly
//! so they stay testable without a whole document around them.

use crate::error::{TonlResult, TypeError};
use crate::query::QueryMatch;
use crate::value::Value;

/// Summary statistics over one numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// One group produced by [`group_by`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub key: String,
    pub matches: Vec<QueryMatch>,
}

pub(crate) fn field_value<'a>(m: &'a QueryMatch, field: &str) -> Option<&'a Value> {
    m.value.as_obj().and_then(|o| o.get(field))
}

pub(crate) fn display_value(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => format!("{v:?}"),
    }
}

fn numeric_values(matches: &[QueryMatch], field: &str) -> TonlResult<Vec<f64>> {
    Value::check_key_safe(field)?;
    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        let Some(obj) = m.value.as_obj() else { continue };
        let Some(v) = obj.get(field) else { continue };
        let Some(n) = v.as_f64() else {
            return Err(TypeError::TypeMismatch {
                expected: "number".to_string(),
                found: format!("{v:?}"),
            }
            .into());
        };
        out.push(n);
    }
    Ok(out)
}

pub fn count(matches: &[QueryMatch]) -> usize {
    matches.len()
}

pub fn sum(matches: &[QueryMatch], field: &str) -> TonlResult<f64> {
    Ok(numeric_values(matches, field)?.into_iter().sum())
}

pub fn avg(matches: &[QueryMatch], field: &str) -> TonlResult<f64> {
    let values = numeric_values(matches, field)?;
    if values.is_empty() {
        return Ok(0.0);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn min(matches: &[QueryMatch], field: &str) -> TonlResult<Option<f64>> {
    Ok(numeric_values(matches, field)?
        .into_iter()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v)))))
}

pub fn max(matches: &[QueryMatch], field: &str) -> TonlResult<Option<f64>> {
    Ok(numeric_values(matches, field)?
        .into_iter()
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v)))))
}

pub fn stats(matches: &[QueryMatch], field: &str) -> TonlResult<Stats> {
    let values = numeric_values(matches, field)?;
    if values.is_empty() {
        return Ok(Stats {
            count: 0,
            sum: 0.0,
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
        });
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = sum / values.len() as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(Stats {
        count: values.len(),
        sum,
        avg,
        min,
        max,
        stddev: variance.sqrt(),
    })
}

/// `p` in `[0, 100]`, linear interpolation between closest ranks.
pub fn percentile(matches: &[QueryMatch], field: &str, p: f64) -> TonlResult<f64> {
    let mut values = numeric_values(matches, field)?;
    if values.is_empty() {
        return Ok(0.0);
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = (p / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(values[lo]);
    }
    let frac = rank - lo as f64;
    Ok(values[lo] + (values[hi] - values[lo]) * frac)
}

pub fn median(matches: &[QueryMatch], field: &str) -> TonlResult<f64> {
    percentile(matches, field, 50.0)
}

pub fn distinct(matches: &[QueryMatch], field: &str) -> TonlResult<Vec<Value>> {
    Value::check_key_safe(field)?;
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for m in matches {
        if let Some(v) = field_value(m, field) {
            let tag = format!("{v:?}");
            if !seen.contains(&tag) {
                seen.push(tag);
                out.push(v.clone());
            }
        }
    }
    Ok(out)
}

pub fn frequency(matches: &[QueryMatch], field: &str) -> TonlResult<Vec<(String, usize)>> {
    Value::check_key_safe(field)?;
    let mut counts: Vec<(String, usize)> = Vec::new();
    for m in matches {
        if let Some(v) = field_value(m, field) {
            let key = display_value(v);
            match counts.iter_mut().find(|(k, _)| *k == key) {
                Some((_, c)) => *c += 1,
                None => counts.push((key, 1)),
            }
        }
    }
    Ok(counts)
}

pub fn group_by(matches: Vec<QueryMatch>, field: &str) -> TonlResult<Vec<GroupEntry>> {
    Value::check_key_safe(field)?;
    let mut groups: Vec<GroupEntry> = Vec::new();
    for m in matches {
        let key = field_value(&m, field).map(display_value).unwrap_or_default();
        match groups.iter_mut().find(|g| g.key == key) {
            Some(g) => g.matches.push(m),
            None => groups.push(GroupEntry {
                key,
                matches: vec![m],
            }),
        }
    }
    Ok(groups)
}

pub fn order_by(mut matches: Vec<QueryMatch>, field: &str, descending: bool) -> TonlResult<Vec<QueryMatch>> {
    Value::check_key_safe(field)?;
    matches.sort_by(|a, b| {
        let av = field_value(a, field).and_then(Value::as_f64);
        let bv = field_value(b, field).and_then(Value::as_f64);
        match (av, bv) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap(),
            _ => {
                let ak = field_value(a, field).map(display_value).unwrap_or_default();
                let bk = field_value(b, field).map(display_value).unwrap_or_default();
                ak.cmp(&bk)
            }
        }
    });
    if descending {
        matches.reverse();
    }
    Ok(matches)
}

pub fn take(matches: Vec<QueryMatch>, n: usize) -> Vec<QueryMatch> {
    matches.into_iter().take(n).collect()
}

pub fn skip(matches: Vec<QueryMatch>, n: usize) -> Vec<QueryMatch> {
    matches.into_iter().skip(n).collect()
}

pub fn first(matches: Vec<QueryMatch>) -> Option<QueryMatch> {
    matches.into_iter().next()
}

pub fn last(matches: Vec<QueryMatch>) -> Option<QueryMatch> {
    matches.into_iter().last()
}

pub fn filter(matches: Vec<QueryMatch>, predicate: impl Fn(&Value) -> bool) -> Vec<QueryMatch> {
    matches.into_iter().filter(|m| predicate(&m.value)).collect()
}

pub fn map<T>(matches: &[QueryMatch], f: impl Fn(&Value) -> T) -> Vec<T> {
    matches.iter().map(|m| f(&m.value)).collect()
}

pub fn reduce<T>(matches: Vec<QueryMatch>, init: T, f: impl Fn(T, &Value) -> T) -> T {
    matches.into_iter().fold(init, |acc, m| f(acc, &m.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::parser::{decode, DecodeOptions};
    use crate::path::parse_path;
    use crate::query::evaluate;

    fn sample_matches() -> Vec<QueryMatch> {
        let text = "users[3]{name,age,role}:\n  Alice,30,admin\n  Bob,25,user\n  Carol,35,moderator\n";
        let root = decode(text, &DecodeOptions::default(), &Limits::default()).unwrap();
        let path = parse_path("$.users[*]").unwrap();
        evaluate(&root, &path, &Limits::default()).unwrap()
    }

    #[test]
    fn sum_and_avg_over_ages() {
        let matches = sample_matches();
        assert_eq!(sum(&matches, "age").unwrap(), 90.0);
        assert!((avg(&matches, "age").unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn stats_reports_min_and_max() {
        let matches = sample_matches();
        let s = stats(&matches, "age").unwrap();
        assert_eq!(s.min, 25.0);
        assert_eq!(s.max, 35.0);
        assert_eq!(s.count, 3);
        // ages 25, 30, 35: mean 30, population variance ((25+35)/2 deviations
        // squared, averaged) = (25 + 0 + 25) / 3 ≈ 16.667, sqrt ≈ 4.082.
        assert!((s.stddev - (50.0 / 3.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn stats_on_empty_input_has_zeroed_stddev() {
        let s = stats(&[], "age").unwrap();
        assert_eq!(s.count, 0);
        assert_eq!(s.stddev, 0.0);
    }

    #[test]
    fn median_of_three_ages() {
        let matches = sample_matches();
        assert_eq!(median(&matches, "age").unwrap(), 30.0);
    }

    #[test]
    fn distinct_roles_and_frequency() {
        let matches = sample_matches();
        assert_eq!(distinct(&matches, "role").unwrap().len(), 3);
        let freq = frequency(&matches, "role").unwrap();
        assert_eq!(freq.len(), 3);
        assert!(freq.iter().all(|(_, c)| *c == 1));
    }

    #[test]
    fn group_by_role_makes_three_groups() {
        let matches = sample_matches();
        let groups = group_by(matches, "role").unwrap();
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn order_by_age_ascending() {
        let matches = sample_matches();
        let ordered = order_by(matches, "age", false).unwrap();
        assert_eq!(
            ordered[0].value.as_obj().unwrap().get("name").unwrap(),
            &Value::Str("Bob".to_string())
        );
    }

    #[test]
    fn take_and_skip() {
        let matches = sample_matches();
        assert_eq!(take(matches.clone(), 2).len(), 2);
        assert_eq!(skip(matches, 2).len(), 1);
    }

    #[test]
    fn dangerous_field_rejected() {
        let matches = sample_matches();
        assert!(sum(&matches, "__proto__").is_err());
    }
}

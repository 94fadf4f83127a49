//! Smart delimiter selection (§4.2).
//!
//! Scans a JSON projection of the value for occurrences of each candidate
//! delimiter and picks the one with the minimum count, so the fewest
//! tabular fields need quoting. Ties are broken in the listed candidate
//! order: `,`, `|`, `\t`, `;`.

use crate::value::Value;

pub const CANDIDATES: [char; 4] = [',', '|', '\t', ';'];

/// Project a [`Value`] into `serde_json::Value` for the purpose of scanning
/// its textual serialization. `Missing` never reaches this stage.
fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Obj(o) => {
            serde_json::Value::Object(o.iter().map(|(k, v)| (k.to_string(), to_json(v))).collect())
        }
    }
}

/// Choose the delimiter that appears least often in `value`'s JSON text.
pub fn choose_delimiter(value: &Value) -> char {
    let text = serde_json::to_string(&to_json(value)).unwrap_or_default();
    CANDIDATES
        .iter()
        .copied()
        .min_by_key(|c| text.matches(*c).count())
        .unwrap_or(',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Obj;

    #[test]
    fn picks_pipe_when_commas_dominate() {
        let mut a = Obj::new();
        a.insert("name", Value::Str("Bob, Jr.".to_string()));
        let v = Value::List(vec![Value::Obj(a)]);
        // serde_json encodes the comma inside the string but no '|' ever
        // appears, so pipe should be chosen.
        assert_eq!(choose_delimiter(&v), '|');
    }

    #[test]
    fn defaults_to_comma_when_no_delimiter_candidate_appears() {
        let v = Value::Str("plain text".to_string());
        assert_eq!(choose_delimiter(&v), ',');
    }
}

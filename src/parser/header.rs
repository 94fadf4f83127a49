//! Header line classification.
//!
//! A block's header line determines how its body is parsed: as tabular
//! rows, as indexed sub-blocks, as a nested object, as an inline primitive
//! list, or as a plain scalar assignment. This module only classifies the
//! shape — it does not coerce field values, that's [`super::document_parser`]'s
//! job once the shape (and therefore the expected row/column structure) is
//! known.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::limits::Limits;
use crate::value::TypeHint;

/// §4.3: a declared count with more digits than this is rejected outright,
/// independent of the block-line limit, so an absurd count can't even reach
/// the `usize::parse` call.
const MAX_COUNT_DIGITS: usize = 16;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[^\[\]:]+?)(\[(?P<count>\d+)\])?(\{(?P<cols>[^{}]*)\})?:(?P<rest>.*)$")
        .unwrap()
});

static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(?P<index>\d+)\]:(?P<rest>.*)$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderShape {
    /// `key[N]{col1,col2:type,...}:` followed by indented rows.
    Tabular {
        key: String,
        count: usize,
        columns: Vec<(String, Option<TypeHint>)>,
    },
    /// `key[N]:` followed by indented `[i]:` sub-blocks.
    ObjectArray { key: String, count: usize },
    /// `[i]:` — one element of an object-array block.
    Index { index: usize },
    /// `key:` with an indented body — nested object.
    NestedObject { key: String },
    /// `key[N]: [v1, v2, ...]` or `key: [v1, v2, ...]` — inline primitive list.
    PrimitiveListInline {
        key: String,
        declared_count: Option<usize>,
        raw_items: String,
    },
    /// `key: <value>` with no indented body.
    ScalarAssignment { key: String, raw_value: String },
}

pub fn parse_header_line(content: &str, limits: &Limits) -> Result<HeaderShape, ParseError> {
    let trimmed = content.trim_end();

    if let Some(caps) = INDEX_RE.captures(trimmed) {
        let index: usize = caps["index"].parse().map_err(|_| ParseError::InvalidHeader {
            at: crate::error::Location::default(),
            reason: "index header has an invalid number".to_string(),
        })?;
        return Ok(HeaderShape::Index { index });
    }

    let caps = HEADER_RE.captures(trimmed).ok_or_else(|| ParseError::InvalidHeader {
        at: crate::error::Location::default(),
        reason: format!("line does not match any recognized header shape: '{trimmed}'"),
    })?;

    let key = caps["key"].trim().to_string();
    if key.is_empty() {
        return Err(ParseError::InvalidHeader {
            at: crate::error::Location::default(),
            reason: "header key is empty".to_string(),
        });
    }
    let count: Option<usize> = caps
        .name("count")
        .map(|m| parse_declared_count(m.as_str(), limits))
        .transpose()?;
    let cols = caps.name("cols").map(|m| m.as_str());
    let rest = caps["rest"].trim();

    if let Some(cols) = cols {
        let count = count.ok_or_else(|| ParseError::InvalidHeader {
            at: crate::error::Location::default(),
            reason: "tabular header requires an element count".to_string(),
        })?;
        let columns = parse_columns(cols)?;
        return Ok(HeaderShape::Tabular { key, count, columns });
    }

    if rest.is_empty() {
        return match count {
            Some(count) => Ok(HeaderShape::ObjectArray { key, count }),
            None => Ok(HeaderShape::NestedObject { key }),
        };
    }

    if rest.starts_with('[') && rest.ends_with(']') {
        return Ok(HeaderShape::PrimitiveListInline {
            key,
            declared_count: count,
            raw_items: rest[1..rest.len() - 1].to_string(),
        });
    }

    Ok(HeaderShape::ScalarAssignment {
        key,
        raw_value: rest.to_string(),
    })
}

/// Parse a header's declared `[N]` count, rejecting digit strings too long
/// to reasonably represent a line count and counts over the configured
/// block-line limit (§4.3), rather than letting `usize::parse` panic or
/// silently accepting an unbounded `N`.
fn parse_declared_count(digits: &str, limits: &Limits) -> Result<usize, ParseError> {
    if digits.len() > MAX_COUNT_DIGITS {
        return Err(ParseError::InvalidHeader {
            at: crate::error::Location::default(),
            reason: format!("declared count '{digits}' has more than {MAX_COUNT_DIGITS} digits"),
        });
    }
    let count: usize = digits.parse().map_err(|_| ParseError::InvalidHeader {
        at: crate::error::Location::default(),
        reason: format!("declared count '{digits}' is not a valid number"),
    })?;
    if count > limits.max_block_lines {
        return Err(ParseError::InvalidHeader {
            at: crate::error::Location::default(),
            reason: format!("declared count {count} exceeds the block-line limit of {}", limits.max_block_lines),
        });
    }
    Ok(count)
}

fn parse_columns(cols: &str) -> Result<Vec<(String, Option<TypeHint>)>, ParseError> {
    if cols.trim().is_empty() {
        return Ok(Vec::new());
    }
    cols.split(',')
        .map(|col| {
            let col = col.trim();
            match col.split_once(':') {
                Some((name, ty)) => {
                    let hint = TypeHint::parse(ty.trim());
                    Ok((name.trim().to_string(), hint))
                }
                None => Ok((col.to_string(), None)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn parses_tabular_header_with_types() {
        let shape = parse_header_line("users[3]{id:u32,name:str,active:bool}:", &limits()).unwrap();
        match shape {
            HeaderShape::Tabular { key, count, columns } => {
                assert_eq!(key, "users");
                assert_eq!(count, 3);
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[0], ("id".to_string(), Some(TypeHint::U32)));
            }
            other => panic!("expected Tabular, got {other:?}"),
        }
    }

    #[test]
    fn parses_object_array_header() {
        assert_eq!(
            parse_header_line("users[2]:", &limits()).unwrap(),
            HeaderShape::ObjectArray {
                key: "users".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn parses_index_header() {
        assert_eq!(
            parse_header_line("[0]:", &limits()).unwrap(),
            HeaderShape::Index { index: 0 }
        );
    }

    #[test]
    fn parses_nested_object_header() {
        assert_eq!(
            parse_header_line("address:", &limits()).unwrap(),
            HeaderShape::NestedObject {
                key: "address".to_string()
            }
        );
    }

    #[test]
    fn parses_inline_primitive_list() {
        let shape = parse_header_line("tags[3]: [red, green, blue]", &limits()).unwrap();
        match shape {
            HeaderShape::PrimitiveListInline {
                key,
                declared_count,
                raw_items,
            } => {
                assert_eq!(key, "tags");
                assert_eq!(declared_count, Some(3));
                assert_eq!(raw_items, "red, green, blue");
            }
            other => panic!("expected PrimitiveListInline, got {other:?}"),
        }
    }

    #[test]
    fn parses_scalar_assignment() {
        assert_eq!(
            parse_header_line("name: Alice", &limits()).unwrap(),
            HeaderShape::ScalarAssignment {
                key: "name".to_string(),
                raw_value: "Alice".to_string()
            }
        );
    }

    #[test]
    fn declared_count_with_too_many_digits_is_rejected() {
        // 20 digits, comfortably overflows usize on any platform and must
        // not panic the parser.
        assert!(parse_header_line("foo[99999999999999999999]:", &limits()).is_err());
    }

    #[test]
    fn declared_count_over_block_line_limit_is_rejected() {
        let mut l = limits();
        l.max_block_lines = 10_000;
        assert!(parse_header_line("foo[100000]:", &l).is_err());
        assert!(parse_header_line("foo[10000]:", &l).is_ok());
    }
}

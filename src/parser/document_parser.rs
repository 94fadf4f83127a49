//! Top-level decode pipeline: text → [`Value`] tree.
//!
//! Ties together directives, block grouping, header classification and
//! field tokenization/coercion into the single [`decode`] entry point.

use crate::error::{LimitExceeded, ParseError, TonlError, TonlResult};
use crate::limits::Limits;
use crate::parser::block::{group_blocks, logical_lines, Block, RawLine};
use crate::parser::directives::read_directives;
use crate::parser::header::{parse_header_line, HeaderShape};
use crate::tokenizer::{tokenize_row, Field};
use crate::value::{infer_from_text, Obj, TypeHint, Value};

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub delimiter: Option<char>,
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            strict: false,
        }
    }
}

pub fn decode(text: &str, options: &DecodeOptions, limits: &Limits) -> TonlResult<Value> {
    if text.len() > limits.max_input_size {
        return Err(LimitExceeded::InputTooLarge {
            limit: limits.max_input_size,
            found: text.len(),
        }
        .into());
    }

    let raw_lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let (directives, body_start) = read_directives(&raw_lines)?;
    let delimiter = options.delimiter.unwrap_or(directives.delimiter);

    let body = &raw_lines[body_start..];
    let logical = logical_lines(body, body_start + 1, limits)?;
    let blocks = group_blocks(&logical, limits)?;

    let mut root = Obj::new();
    for block in &blocks {
        let (key, value) = dispatch_block(block, delimiter, limits, 1, options.strict)?;
        Value::check_key_safe(&key)?;
        root.insert(key, value);
    }
    Ok(Value::Obj(root))
}

fn dispatch_block(
    block: &Block,
    delimiter: char,
    limits: &Limits,
    depth: usize,
    strict: bool,
) -> TonlResult<(String, Value)> {
    if depth > limits.max_nesting_depth {
        return Err(LimitExceeded::DepthExceeded {
            limit: limits.max_nesting_depth,
        }
        .into());
    }

    let shape =
        parse_header_line(&block.header.content, limits).map_err(|e| locate(e, block.header.line_no))?;

    match shape {
        HeaderShape::Tabular { key, count, columns } => {
            if strict && block.body.len() != count {
                return Err(ParseError::MalformedLine {
                    at: crate::error::Location::new(block.header.line_no, 0),
                    reason: format!(
                        "declared count {count} does not match {} row(s)",
                        block.body.len()
                    ),
                }
                .into());
            }
            let mut rows = Vec::with_capacity(block.body.len());
            for row in &block.body {
                let fields = tokenize_row(&row.content, delimiter, limits)
                    .map_err(|e| locate(e, row.line_no))?;
                if strict && fields.len() != columns.len() {
                    return Err(ParseError::MalformedLine {
                        at: crate::error::Location::new(row.line_no, 0),
                        reason: format!(
                            "row has {} field(s), header declares {}",
                            fields.len(),
                            columns.len()
                        ),
                    }
                    .into());
                }
                let mut obj = Obj::new();
                for (i, (name, hint)) in columns.iter().enumerate() {
                    if let Some(field) = fields.get(i) {
                        if let Some(value) = coerce_tabular_field(field, *hint, strict)? {
                            obj.insert(name.clone(), value);
                        }
                    }
                }
                rows.push(Value::Obj(obj));
            }
            Ok((key, Value::List(rows)))
        }
        HeaderShape::ObjectArray { key, count } => {
            let inner_blocks = group_blocks(&block.body, limits)?;
            if strict && inner_blocks.len() != count {
                return Err(ParseError::MalformedLine {
                    at: crate::error::Location::new(block.header.line_no, 0),
                    reason: format!(
                        "declared count {count} does not match {} element(s)",
                        inner_blocks.len()
                    ),
                }
                .into());
            }
            let mut items = Vec::with_capacity(inner_blocks.len());
            for inner in &inner_blocks {
                let inner_shape = parse_header_line(&inner.header.content, limits)?;
                match inner_shape {
                    HeaderShape::Index { .. } => {
                        let obj = parse_object_body(&inner.body, delimiter, limits, depth + 1, strict)?;
                        items.push(Value::Obj(obj));
                    }
                    _ => {
                        return Err(ParseError::InvalidHeader {
                            at: crate::error::Location::new(inner.header.line_no, 0),
                            reason: "expected an '[i]:' element header inside an object array".to_string(),
                        }
                        .into())
                    }
                }
            }
            Ok((key, Value::List(items)))
        }
        HeaderShape::Index { index } => Err(ParseError::InvalidHeader {
            at: crate::error::Location::new(block.header.line_no, 0),
            reason: format!("'[{index}]:' may only appear inside an object-array block"),
        }
        .into()),
        HeaderShape::NestedObject { key } => {
            let obj = parse_object_body(&block.body, delimiter, limits, depth + 1, strict)?;
            Ok((key, Value::Obj(obj)))
        }
        HeaderShape::PrimitiveListInline {
            key,
            declared_count,
            raw_items,
        } => {
            let items = parse_inline_list(&raw_items, limits, strict)?;
            if strict {
                if let Some(count) = declared_count {
                    if count != items.len() {
                        return Err(ParseError::MalformedLine {
                            at: crate::error::Location::new(block.header.line_no, 0),
                            reason: format!(
                                "declared count {count} does not match {} item(s)",
                                items.len()
                            ),
                        }
                        .into());
                    }
                }
            }
            Ok((key, Value::List(items)))
        }
        HeaderShape::ScalarAssignment { key, raw_value } => {
            let value = coerce_scalar(&raw_value, None, strict, limits)?;
            Ok((key, value))
        }
    }
}

fn parse_object_body(
    body: &[RawLine],
    delimiter: char,
    limits: &Limits,
    depth: usize,
    strict: bool,
) -> TonlResult<Obj> {
    let blocks = group_blocks(body, limits)?;
    let mut obj = Obj::new();
    for block in &blocks {
        let (key, value) = dispatch_block(block, delimiter, limits, depth, strict)?;
        Value::check_key_safe(&key)?;
        obj.insert(key, value);
    }
    Ok(obj)
}

fn parse_inline_list(raw_items: &str, limits: &Limits, strict: bool) -> TonlResult<Vec<Value>> {
    if raw_items.trim().is_empty() {
        return Ok(Vec::new());
    }
    let fields = tokenize_row(raw_items, ',', limits)?;
    fields
        .iter()
        .map(|f| coerce_field(f, None, strict))
        .collect()
}

/// Coerce a single scalar value, routing it through the row tokenizer with a
/// delimiter that cannot occur so that quoting/escaping is still honored but
/// no splitting happens on an unquoted comma inside a bare string.
fn coerce_scalar(raw_value: &str, hint: Option<TypeHint>, strict: bool, limits: &Limits) -> TonlResult<Value> {
    let fields = tokenize_row(raw_value, '\u{0}', limits)?;
    let field = fields.into_iter().next().unwrap_or(Field {
        text: String::new(),
        was_quoted: false,
    });
    coerce_field(&field, hint, strict)
}

fn coerce_tabular_field(field: &Field, hint: Option<TypeHint>, strict: bool) -> TonlResult<Option<Value>> {
    if !field.was_quoted && field.text.is_empty() {
        return Ok(None);
    }
    coerce_field(field, hint, strict).map(Some)
}

fn coerce_field(field: &Field, hint: Option<TypeHint>, strict: bool) -> TonlResult<Value> {
    if field.was_quoted {
        if strict {
            if let Some(h) = hint {
                if h != TypeHint::Str {
                    return Err(crate::error::TypeError::TypeMismatch {
                        expected: h.to_string(),
                        found: "str".to_string(),
                    }
                    .into());
                }
            }
        }
        return Ok(Value::Str(field.text.clone()));
    }

    let text = field.text.as_str();
    match hint {
        None => Ok(infer_from_text(text)),
        Some(TypeHint::Null) => {
            if text == "null" {
                Ok(Value::Null)
            } else {
                type_fallback(hint, text, strict)
            }
        }
        Some(TypeHint::Bool) => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => type_fallback(hint, text, strict),
        },
        Some(TypeHint::U32) => match text.parse::<u32>() {
            Ok(u) => Ok(Value::Int(i64::from(u))),
            Err(_) => type_fallback(hint, text, strict),
        },
        Some(TypeHint::I32) => match text.parse::<i32>() {
            Ok(i) => Ok(Value::Int(i64::from(i))),
            Err(_) => type_fallback(hint, text, strict),
        },
        Some(TypeHint::F64) => match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => type_fallback(hint, text, strict),
        },
        Some(TypeHint::Str) => Ok(Value::Str(text.trim().to_string())),
        Some(TypeHint::List) | Some(TypeHint::Obj) => type_fallback(hint, text, strict),
    }
}

fn type_fallback(hint: Option<TypeHint>, text: &str, strict: bool) -> TonlResult<Value> {
    if strict {
        let h = hint.expect("type_fallback only called with a hint");
        return Err(crate::error::TypeError::TypeMismatch {
            expected: h.to_string(),
            found: format!("'{text}'"),
        }
        .into());
    }
    Ok(infer_from_text(text))
}

fn locate(err: ParseError, line_no: usize) -> TonlError {
    match err {
        ParseError::InvalidHeader { reason, .. } => ParseError::InvalidHeader {
            at: crate::error::Location::new(line_no, 0),
            reason,
        }
        .into(),
        ParseError::MalformedLine { reason, .. } => ParseError::MalformedLine {
            at: crate::error::Location::new(line_no, 0),
            reason,
        }
        .into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn decodes_tabular_block() {
        let text = "#version 1.0\nusers[2]{id,name,role}:\n  1,Alice,admin\n  2,\"Bob, Jr.\",user\n";
        let v = decode(text, &DecodeOptions::default(), &limits()).unwrap();
        let users = v.as_obj().unwrap().get("users").unwrap();
        let list = users.as_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list[1].as_obj().unwrap().get("name").unwrap(),
            &Value::Str("Bob, Jr.".to_string())
        );
    }

    #[test]
    fn decodes_inline_primitive_list() {
        let text = "tags[3]: [red, green, blue]\n";
        let v = decode(text, &DecodeOptions::default(), &limits()).unwrap();
        let tags = v.as_obj().unwrap().get("tags").unwrap().as_list().unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], Value::Str("red".to_string()));
    }

    #[test]
    fn decodes_nested_object() {
        let text = "address:\n  city: Springfield\n  zip: 12345\n";
        let v = decode(text, &DecodeOptions::default(), &limits()).unwrap();
        let address = v.as_obj().unwrap().get("address").unwrap().as_obj().unwrap();
        assert_eq!(address.get("city").unwrap(), &Value::Str("Springfield".to_string()));
        assert_eq!(address.get("zip").unwrap(), &Value::Int(12345));
    }

    #[test]
    fn decodes_object_array_blocks() {
        let text = "users[2]:\n  [0]:\n    id: 1\n  [1]:\n    id: 2\n";
        let v = decode(text, &DecodeOptions::default(), &limits()).unwrap();
        let users = v.as_obj().unwrap().get("users").unwrap().as_list().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].as_obj().unwrap().get("id").unwrap(), &Value::Int(2));
    }

    #[test]
    fn missing_field_is_omitted_quoted_empty_is_retained() {
        let text = "rows[1]{a,b,c}:\n  1,,\"\"\n";
        let v = decode(text, &DecodeOptions::default(), &limits()).unwrap();
        let row = v.as_obj().unwrap().get("rows").unwrap().as_list().unwrap()[0]
            .as_obj()
            .unwrap();
        assert!(!row.contains_key("b"));
        assert_eq!(row.get("c").unwrap(), &Value::Str(String::new()));
    }

    #[test]
    fn strict_mode_rejects_row_count_mismatch() {
        let text = "users[2]{id}:\n  1\n";
        let mut opts = DecodeOptions::default();
        opts.strict = true;
        assert!(decode(text, &opts, &limits()).is_err());
    }

    #[test]
    fn block_line_limit_is_enforced() {
        let mut l = limits();
        l.max_block_lines = 2;
        let text = "a[3]{x}:\n  1\n  2\n  3\n";
        assert!(decode(text, &DecodeOptions::default(), &l).is_err());
    }
}

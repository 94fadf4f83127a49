//! Schema text parser (§4.9).
//!
//! A small line-oriented grammar, not the tabular TONL document grammar:
//! directive lines (`@schema v1`), custom type declarations (`TypeName: obj`
//! followed by an indented field block), and root field lines
//! (`field_name: Type constraint1 constraint2:value …`).

use crate::error::{SchemaError, TonlResult};
use crate::query::regex_guard::named_pattern;
use crate::schema::ast::{Constraint, CustomType, Field, Schema, SchemaType};
use crate::value::infer_from_text;

pub fn parse_schema(text: &str) -> TonlResult<Schema> {
    let mut version = None;
    let mut strict = false;
    let mut description = None;
    let mut types = Vec::new();
    let mut fields = Vec::new();

    let raw_lines: Vec<&str> = text.lines().collect();
    let mut i = 0;
    while i < raw_lines.len() {
        let line = raw_lines[i];
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }
        if indent_of(line) > 0 {
            // Orphaned indented line with no preceding type declaration:
            // fold it in as a root field rather than erroring, mirroring
            // the parser's general leniency on stray indentation.
            fields.push(parse_field_line(trimmed)?);
            i += 1;
            continue;
        }
        if let Some(directive) = trimmed.strip_prefix('@') {
            let (key, value) = split_first_word(directive);
            match key {
                "schema" => version = Some(value.to_string()),
                "strict" => strict = value.trim() == "true",
                "description" => description = Some(value.trim().trim_matches('"').to_string()),
                other => {
                    return Err(SchemaError::SchemaViolation {
                        field: other.to_string(),
                        message: "unrecognized schema directive".to_string(),
                    }
                    .into())
                }
            }
            i += 1;
            continue;
        }
        if let Some((name, rest)) = trimmed.split_once(':') {
            let rest = rest.trim();
            if rest == "obj" {
                let mut block = Vec::new();
                let block_indent = indent_of_next(&raw_lines, i + 1);
                let mut j = i + 1;
                while j < raw_lines.len() {
                    let candidate = raw_lines[j];
                    if candidate.trim().is_empty() {
                        j += 1;
                        continue;
                    }
                    if indent_of(candidate) < block_indent {
                        break;
                    }
                    block.push(candidate.trim());
                    j += 1;
                }
                let mut type_fields = Vec::new();
                for field_line in block {
                    type_fields.push(parse_field_line(field_line)?);
                }
                types.push(CustomType {
                    name: name.trim().to_string(),
                    fields: type_fields,
                });
                i = j;
                continue;
            }
        }
        fields.push(parse_field_line(trimmed)?);
        i += 1;
    }

    Ok(Schema {
        version,
        strict,
        description,
        types,
        fields,
    })
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn indent_of_next(lines: &[&str], from: usize) -> usize {
    lines[from..]
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .unwrap_or(1)
        .max(1)
}

fn split_first_word(s: &str) -> (&str, &str) {
    match s.trim().split_once(char::is_whitespace) {
        Some((a, b)) => (a, b),
        None => (s.trim(), ""),
    }
}

fn parse_field_line(line: &str) -> TonlResult<Field> {
    let (name, rest) = line.split_once(':').ok_or_else(|| SchemaError::SchemaViolation {
        field: line.to_string(),
        message: "expected 'name: Type constraint...'".to_string(),
    })?;
    let mut tokens = rest.split_whitespace();
    let type_token = tokens.next().ok_or_else(|| SchemaError::SchemaViolation {
        field: name.trim().to_string(),
        message: "field declaration is missing a type".to_string(),
    })?;
    let ty = parse_type(type_token);
    let mut constraints = Vec::new();
    for tok in tokens {
        constraints.push(parse_constraint(tok, name.trim())?);
    }
    Ok(Field {
        name: name.trim().to_string(),
        ty,
        constraints,
    })
}

fn parse_type(tok: &str) -> SchemaType {
    if let Some(inner) = tok.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
        return SchemaType::ListOf(Box::new(parse_type(inner)));
    }
    match tok {
        "str" => SchemaType::Str,
        "i32" | "u32" | "int" => SchemaType::Int,
        "f64" | "float" => SchemaType::Float,
        "bool" => SchemaType::Bool,
        "null" => SchemaType::Null,
        "obj" => SchemaType::Obj,
        "list" => SchemaType::List,
        other => SchemaType::Named(other.to_string()),
    }
}

fn parse_constraint(tok: &str, field_name: &str) -> TonlResult<Constraint> {
    let (key, value) = match tok.split_once(':') {
        Some((k, v)) => (k, Some(v)),
        None => (tok, None),
    };
    let err = |message: &str| {
        Err(SchemaError::SchemaViolation {
            field: field_name.to_string(),
            message: message.to_string(),
        }
        .into())
    };
    let need_value = |v: Option<&str>| -> TonlResult<&str> {
        v.ok_or_else(|| schema_err(field_name, &format!("constraint '{key}' requires a value")))
    };
    match key {
        "required" => Ok(Constraint::Required),
        "optional" => Ok(Constraint::Optional),
        "default" => Ok(Constraint::Default(infer_from_text(need_value(value)?.trim_matches('"')))),
        "min" => Ok(Constraint::Min(parse_f64(need_value(value)?, field_name)?)),
        "max" => Ok(Constraint::Max(parse_f64(need_value(value)?, field_name)?)),
        "length" => Ok(Constraint::Length(
            need_value(value)?
                .parse()
                .map_err(|_| schema_err(field_name, "length must be a non-negative integer"))?,
        )),
        "pattern" => {
            let v = need_value(value)?;
            let expanded = named_pattern(v).unwrap_or_else(|| v.to_string());
            Ok(Constraint::Pattern(expanded))
        }
        "trim" => Ok(Constraint::Trim),
        "lowercase" => Ok(Constraint::Lowercase),
        "uppercase" => Ok(Constraint::Uppercase),
        "range" => {
            let v = need_value(value)?;
            let (a, b) = v
                .split_once(',')
                .ok_or_else(|| schema_err(field_name, "range requires 'a,b'"))?;
            Ok(Constraint::Range(
                parse_f64(a, field_name)?,
                parse_f64(b, field_name)?,
            ))
        }
        "multipleOf" => Ok(Constraint::MultipleOf(parse_f64(need_value(value)?, field_name)?)),
        "integer" => Ok(Constraint::Integer),
        "positive" => Ok(Constraint::Positive),
        "negative" => Ok(Constraint::Negative),
        "unique" => Ok(Constraint::Unique),
        "nonempty" => Ok(Constraint::Nonempty),
        "sealed" => Ok(Constraint::Sealed),
        "requiredKeys" => Ok(Constraint::RequiredKeys(
            need_value(value)?.split(',').map(|s| s.trim().to_string()).collect(),
        )),
        _ => err(&format!("unrecognized constraint '{key}'")),
    }
}

fn parse_f64(s: &str, field_name: &str) -> TonlResult<f64> {
    s.parse::<f64>()
        .map_err(|_| schema_err(field_name, &format!("'{s}' is not a number")))
}

fn schema_err(field: &str, message: &str) -> crate::error::TonlError {
    SchemaError::SchemaViolation {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_and_root_field_s7() {
        let schema = parse_schema("@schema v1\nusername: str required min:3 max:20").unwrap();
        assert_eq!(schema.version.as_deref(), Some("v1"));
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.fields[0].name, "username");
        assert!(schema.fields[0].is_required());
    }

    #[test]
    fn parses_custom_type_block() {
        let text = "Address: obj\n  street: str required\n  zip: str pattern:date\nhome: Address required";
        let schema = parse_schema(text).unwrap();
        assert_eq!(schema.types.len(), 1);
        assert_eq!(schema.types[0].fields.len(), 2);
        assert_eq!(schema.fields[0].ty, SchemaType::Named("Address".to_string()));
    }

    #[test]
    fn parses_list_of_named_type() {
        let schema = parse_schema("tags: list<str> nonempty").unwrap();
        assert_eq!(schema.fields[0].ty, SchemaType::ListOf(Box::new(SchemaType::Str)));
    }

    #[test]
    fn strict_directive_sets_flag() {
        let schema = parse_schema("@strict true\nname: str").unwrap();
        assert!(schema.strict);
    }

    #[test]
    fn unknown_constraint_is_rejected() {
        assert!(parse_schema("name: str bogus:1").is_err());
    }
}

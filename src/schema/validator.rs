//! Schema validation (§4.9): `Value` × `Schema` → [`ValidationResult`].

use crate::limits::Limits;
use crate::query::regex_guard::compile_checked;
use crate::schema::ast::{Constraint, Field, Schema, SchemaType};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    fn ok() -> Self {
        ValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

pub fn validate(value: &Value, schema: &Schema) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    validate_fields(value, &schema.fields, schema, schema.strict, "$", &mut errors, &mut warnings);
    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_fields(
    value: &Value,
    declared: &[Field],
    schema: &Schema,
    strict_here: bool,
    path: &str,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationError>,
) {
    let Some(obj) = value.as_obj() else {
        errors.push(ValidationError {
            field: path.to_string(),
            message: "expected an object".to_string(),
            expected: Some("obj".to_string()),
            actual: Some(describe(value)),
        });
        return;
    };

    for field in declared {
        let field_path = format!("{path}.{}", field.name);
        match obj.get(&field.name) {
            None => {
                if field.is_required() && field.default_value().is_none() {
                    errors.push(ValidationError {
                        field: field_path,
                        message: "required field is missing".to_string(),
                        expected: Some("present".to_string()),
                        actual: Some("absent".to_string()),
                    });
                }
            }
            Some(v) => validate_value(v, field, schema, &field_path, errors, warnings),
        }
    }

    let known: std::collections::HashSet<&str> = declared.iter().map(|f| f.name.as_str()).collect();
    for key in obj.keys() {
        if !known.contains(key) {
            let entry = ValidationError {
                field: format!("{path}.{key}"),
                message: "unrecognized field".to_string(),
                expected: None,
                actual: None,
            };
            if strict_here {
                errors.push(entry);
            } else {
                warnings.push(entry);
            }
        }
    }
}

fn validate_value(
    value: &Value,
    field: &Field,
    schema: &Schema,
    path: &str,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationError>,
) {
    if !type_matches(value, &field.ty, schema) {
        errors.push(ValidationError {
            field: path.to_string(),
            message: "value does not match the declared type".to_string(),
            expected: Some(type_name(&field.ty)),
            actual: Some(describe(value)),
        });
        return;
    }

    match &field.ty {
        SchemaType::Named(name) => {
            if let Some(custom) = schema.find_type(name) {
                let strict_here = schema.strict || custom.fields.iter().any(|f| f.is_sealed());
                validate_fields(value, &custom.fields, schema, strict_here, path, errors, warnings);
            }
        }
        SchemaType::ListOf(inner) => {
            if let Value::List(items) = value {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    let synthetic = Field {
                        name: String::new(),
                        ty: (**inner).clone(),
                        constraints: Vec::new(),
                    };
                    validate_value(item, &synthetic, schema, &item_path, errors, warnings);
                }
            }
        }
        _ => {}
    }

    for constraint in &field.constraints {
        if let Some(message) = check_constraint(value, constraint) {
            errors.push(ValidationError {
                field: path.to_string(),
                message,
                expected: Some(format!("{constraint:?}")),
                actual: Some(describe(value)),
            });
        }
    }
}

fn type_matches(value: &Value, ty: &SchemaType, schema: &Schema) -> bool {
    match ty {
        SchemaType::Str => matches!(value, Value::Str(_)),
        SchemaType::Int => matches!(value, Value::Int(_)),
        SchemaType::Float => matches!(value, Value::Float(_) | Value::Int(_)),
        SchemaType::Bool => matches!(value, Value::Bool(_)),
        SchemaType::Null => matches!(value, Value::Null),
        SchemaType::Obj => matches!(value, Value::Obj(_)),
        SchemaType::List => matches!(value, Value::List(_)),
        SchemaType::ListOf(_) => matches!(value, Value::List(_)),
        SchemaType::Named(name) => match schema.find_type(name) {
            Some(_) => matches!(value, Value::Obj(_)),
            // An undeclared reference can't be shape-checked; accept
            // anything rather than failing every field that uses it.
            None => true,
        },
    }
}

fn type_name(ty: &SchemaType) -> String {
    match ty {
        SchemaType::Str => "str".to_string(),
        SchemaType::Int => "i32".to_string(),
        SchemaType::Float => "f64".to_string(),
        SchemaType::Bool => "bool".to_string(),
        SchemaType::Null => "null".to_string(),
        SchemaType::Obj => "obj".to_string(),
        SchemaType::List => "list".to_string(),
        SchemaType::ListOf(inner) => format!("list<{}>", type_name(inner)),
        SchemaType::Named(name) => name.clone(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => format!("\"{s}\""),
        Value::List(_) => "list".to_string(),
        Value::Obj(_) => "obj".to_string(),
    }
}

/// Check a single constraint, returning `Some(message)` on violation.
/// String-typed `min`/`max`/`length` measure character count (§4.9's S7
/// example validates `username` length bounds, not its numeric value).
fn check_constraint(value: &Value, constraint: &Constraint) -> Option<String> {
    match constraint {
        Constraint::Required | Constraint::Optional | Constraint::Default(_) | Constraint::Sealed => None,
        Constraint::Min(n) => match value {
            Value::Str(s) => ((s.chars().count() as f64) < *n)
                .then(|| format!("length {} is below min {n}", s.chars().count())),
            _ => value
                .as_f64()
                .filter(|v| *v < *n)
                .map(|v| format!("{v} is below min {n}")),
        },
        Constraint::Max(n) => match value {
            Value::Str(s) => (s.chars().count() as f64 > *n)
                .then(|| format!("length {} exceeds max {n}", s.chars().count())),
            _ => value
                .as_f64()
                .filter(|v| *v > *n)
                .map(|v| format!("{v} exceeds max {n}")),
        },
        Constraint::Length(n) => match value {
            Value::Str(s) => (s.chars().count() != *n)
                .then(|| format!("length {} does not equal {n}", s.chars().count())),
            Value::List(items) => (items.len() != *n)
                .then(|| format!("length {} does not equal {n}", items.len())),
            _ => None,
        },
        Constraint::Pattern(pattern) => {
            let Value::Str(s) = value else { return None };
            match compile_checked(pattern, &Limits::default()) {
                Ok(re) => (!re.is_match(s)).then(|| format!("does not match pattern '{pattern}'")),
                Err(e) => Some(format!("pattern rejected: {e}")),
            }
        }
        Constraint::Trim => {
            let Value::Str(s) = value else { return None };
            (s != s.trim()).then(|| "value has leading/trailing whitespace".to_string())
        }
        Constraint::Lowercase => {
            let Value::Str(s) = value else { return None };
            (*s != s.to_lowercase()).then(|| "value is not lowercase".to_string())
        }
        Constraint::Uppercase => {
            let Value::Str(s) = value else { return None };
            (*s != s.to_uppercase()).then(|| "value is not uppercase".to_string())
        }
        Constraint::Range(lo, hi) => value
            .as_f64()
            .filter(|v| *v < *lo || *v > *hi)
            .map(|v| format!("{v} is outside range [{lo}, {hi}]")),
        Constraint::MultipleOf(n) => value.as_f64().filter(|v| *n != 0.0 && v % n != 0.0).map(|v| {
            format!("{v} is not a multiple of {n}")
        }),
        Constraint::Integer => value
            .as_f64()
            .filter(|v| v.fract() != 0.0)
            .map(|v| format!("{v} is not an integer")),
        Constraint::Positive => value.as_f64().filter(|v| *v <= 0.0).map(|v| format!("{v} is not positive")),
        Constraint::Negative => value.as_f64().filter(|v| *v >= 0.0).map(|v| format!("{v} is not negative")),
        Constraint::Unique => {
            let Value::List(items) = value else { return None };
            let mut seen = Vec::new();
            for item in items {
                if seen.contains(&item) {
                    return Some("list contains duplicate elements".to_string());
                }
                seen.push(item);
            }
            None
        }
        Constraint::Nonempty => match value {
            Value::List(items) => items.is_empty().then(|| "list is empty".to_string()),
            Value::Str(s) => s.is_empty().then(|| "string is empty".to_string()),
            _ => None,
        },
        Constraint::RequiredKeys(keys) => {
            let Value::Obj(obj) = value else { return None };
            let missing: Vec<&str> = keys.iter().map(String::as_str).filter(|k| !obj.contains_key(k)).collect();
            (!missing.is_empty()).then(|| format!("missing required keys: {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_schema;
    use crate::value::Obj;

    #[test]
    fn length_bounds_violation_and_pass_s7() {
        let schema = parse_schema("username: str required min:3 max:20").unwrap();

        let mut short = Obj::new();
        short.insert("username", Value::Str("ab".to_string()));
        let result = validate(&Value::Obj(short), &schema);
        assert!(!result.valid);

        let mut ok = Obj::new();
        ok.insert("username", Value::Str("john".to_string()));
        let result = validate(&Value::Obj(ok), &schema);
        assert!(result.valid);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = parse_schema("name: str required").unwrap();
        let result = validate(&Value::Obj(Obj::new()), &schema);
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "$.name");
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let schema = parse_schema("@strict true\nname: str").unwrap();
        let mut obj = Obj::new();
        obj.insert("name", Value::Str("a".to_string()));
        obj.insert("extra", Value::Int(1));
        let result = validate(&Value::Obj(obj), &schema);
        assert!(!result.valid);
    }

    #[test]
    fn non_strict_mode_warns_on_unknown_fields() {
        let schema = parse_schema("name: str").unwrap();
        let mut obj = Obj::new();
        obj.insert("name", Value::Str("a".to_string()));
        obj.insert("extra", Value::Int(1));
        let result = validate(&Value::Obj(obj), &schema);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn pattern_alias_validates_email() {
        let schema = parse_schema("email: str required pattern:email").unwrap();
        let mut bad = Obj::new();
        bad.insert("email", Value::Str("not-an-email".to_string()));
        assert!(!validate(&Value::Obj(bad), &schema).valid);

        let mut good = Obj::new();
        good.insert("email", Value::Str("a@b.com".to_string()));
        assert!(validate(&Value::Obj(good), &schema).valid);
    }

    #[test]
    fn nested_custom_type_validates_recursively() {
        let text = "Address: obj\n  zip: str required\nhome: Address required";
        let schema = parse_schema(text).unwrap();
        let mut root = Obj::new();
        root.insert("home", Value::Obj(Obj::new()));
        let result = validate(&Value::Obj(root), &schema);
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "$.home.zip");
    }
}

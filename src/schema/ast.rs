//! Schema AST (§4.9): directives, custom types, fields and constraints.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Obj,
    List,
    ListOf(Box<SchemaType>),
    /// Reference to a custom type declared in the same schema, or to another
    /// schema's root shape when used standalone.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    Optional,
    Default(Value),
    Min(f64),
    Max(f64),
    Length(usize),
    /// Already alias-expanded (`email`/`date`/`url` → a vetted pattern).
    Pattern(String),
    Trim,
    Lowercase,
    Uppercase,
    Range(f64, f64),
    MultipleOf(f64),
    Integer,
    Positive,
    Negative,
    Unique,
    Nonempty,
    Sealed,
    RequiredKeys(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: SchemaType,
    pub constraints: Vec<Constraint>,
}

impl Field {
    pub fn is_required(&self) -> bool {
        self.constraints.iter().any(|c| matches!(c, Constraint::Required))
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Default(v) => Some(v),
            _ => None,
        })
    }

    pub fn is_sealed(&self) -> bool {
        self.constraints.iter().any(|c| matches!(c, Constraint::Sealed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub version: Option<String>,
    pub strict: bool,
    pub description: Option<String>,
    pub types: Vec<CustomType>,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn find_type(&self, name: &str) -> Option<&CustomType> {
        self.types.iter().find(|t| t.name == name)
    }
}

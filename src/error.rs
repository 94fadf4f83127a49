//! Error taxonomy for the TONL core.
//!
//! Each phase of the engine (parse, encode, query, mutate, index, schema)
//! surfaces failures through [`TonlError`], a single enum whose variants
//! group into the categories described by the format specification:
//! parse errors, type errors, security violations, resource-limit
//! violations, query errors and schema errors. Following the same
//! convention the rest of this crate uses for phase errors, there is no
//! derive macro involved — just a manual `Display` and `std::error::Error`
//! implementation.

use std::fmt;

/// Where in the source text an error occurred, when that is knowable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Malformed-text errors raised while decoding TONL source.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken { at: Location, found: String },
    InvalidHeader { at: Location, reason: String },
    UnclosedQuote { at: Location },
    InvalidDelimiter { found: String },
    MalformedLine { at: Location, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { at, found } => {
                write!(f, "unexpected token '{found}' at {at}")
            }
            ParseError::InvalidHeader { at, reason } => {
                write!(f, "invalid header at {at}: {reason}")
            }
            ParseError::UnclosedQuote { at } => write!(f, "unclosed quote starting at {at}"),
            ParseError::InvalidDelimiter { found } => {
                write!(f, "invalid delimiter '{found}'")
            }
            ParseError::MalformedLine { at, reason } => {
                write!(f, "malformed line at {at}: {reason}")
            }
        }
    }
}

/// Value-shape errors: something did not have the type an operation required.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    TypeMismatch { expected: String, found: String },
    NotAnArray { path: String },
    NotAnObject { path: String },
    IndexOutOfBounds { index: i64, length: usize },
    /// A structural constraint (e.g. index uniqueness) was violated.
    ConstraintViolation { message: String },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            TypeError::NotAnArray { path } => write!(f, "'{path}' is not an array"),
            TypeError::NotAnObject { path } => write!(f, "'{path}' is not an object"),
            TypeError::IndexOutOfBounds { index, length } => {
                write!(f, "index {index} out of bounds for length {length}")
            }
            TypeError::ConstraintViolation { message } => write!(f, "{message}"),
        }
    }
}

/// Attempts to subvert the object model or otherwise unsafe constructs.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityViolation {
    PrototypePollution { key: String },
    PathTraversal { path: String },
    DangerousRegex { pattern: String, reason: String },
    Cycle { path: String },
    SelfReference { path: String },
}

impl fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityViolation::PrototypePollution { key } => {
                write!(f, "'{key}' is a reserved property name")
            }
            SecurityViolation::PathTraversal { path } => {
                write!(f, "'{path}' escapes the permitted scope")
            }
            SecurityViolation::DangerousRegex { pattern, reason } => {
                write!(f, "pattern '{pattern}' rejected: {reason}")
            }
            SecurityViolation::Cycle { path } => write!(f, "cycle detected at '{path}'"),
            SecurityViolation::SelfReference { path } => {
                write!(f, "'{path}' references itself")
            }
        }
    }
}

/// A configured resource limit was exceeded.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitExceeded {
    InputTooLarge { limit: usize, found: usize },
    LineTooLong { at: Location, limit: usize, found: usize },
    DepthExceeded { limit: usize },
    BlockLinesExceeded { limit: usize, found: usize },
    BufferOverflow { limit: usize },
    QueryTooDeep { limit: usize },
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitExceeded::InputTooLarge { limit, found } => {
                write!(f, "input of {found} bytes exceeds limit of {limit}")
            }
            LimitExceeded::LineTooLong { at, limit, found } => {
                write!(f, "line at {at} has {found} chars, exceeds limit of {limit}")
            }
            LimitExceeded::DepthExceeded { limit } => {
                write!(f, "nesting depth exceeds limit of {limit}")
            }
            LimitExceeded::BlockLinesExceeded { limit, found } => {
                write!(f, "block has {found} lines, exceeds limit of {limit}")
            }
            LimitExceeded::BufferOverflow { limit } => {
                write!(f, "buffer exceeds limit of {limit} bytes")
            }
            LimitExceeded::QueryTooDeep { limit } => {
                write!(f, "query recursion exceeds limit of {limit}")
            }
        }
    }
}

/// Errors raised while compiling or evaluating a path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    InvalidPath { expression: String, reason: String },
    FilterSyntax { expression: String, reason: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidPath { expression, reason } => {
                write!(f, "invalid path '{expression}': {reason}")
            }
            QueryError::FilterSyntax { expression, reason } => {
                write!(f, "invalid filter '{expression}': {reason}")
            }
        }
    }
}

/// Schema parsing or validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    SchemaViolation { field: String, message: String },
    RequiredField { field: String },
    InvalidEnum { field: String, value: String },
    PatternMismatch { field: String, pattern: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::SchemaViolation { field, message } => {
                write!(f, "field '{field}': {message}")
            }
            SchemaError::RequiredField { field } => {
                write!(f, "field '{field}' is required")
            }
            SchemaError::InvalidEnum { field, value } => {
                write!(f, "field '{field}': '{value}' is not a recognized value")
            }
            SchemaError::PatternMismatch { field, pattern } => {
                write!(f, "field '{field}' does not match pattern '{pattern}'")
            }
        }
    }
}

/// Top-level error type returned by every fallible core operation.
///
/// Message formatting follows the template
/// `"{Operation} failed: {reason}. {context}"` described by the spec;
/// `operation_failed` below is the single place that template is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum TonlError {
    Parse(ParseError),
    Type(TypeError),
    Security(SecurityViolation),
    Limit(LimitExceeded),
    Query(QueryError),
    Schema(SchemaError),
}

impl TonlError {
    /// Render the user-visible message template used across the public API.
    pub fn operation_failed(operation: &str, context: &str) -> String {
        format!("{operation} failed: {context}.")
    }
}

impl fmt::Display for TonlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TonlError::Parse(e) => write!(f, "parse error: {e}"),
            TonlError::Type(e) => write!(f, "type error: {e}"),
            TonlError::Security(e) => write!(f, "security violation: {e}"),
            TonlError::Limit(e) => write!(f, "limit exceeded: {e}"),
            TonlError::Query(e) => write!(f, "query error: {e}"),
            TonlError::Schema(e) => write!(f, "schema error: {e}"),
        }
    }
}

impl std::error::Error for TonlError {}

impl From<ParseError> for TonlError {
    fn from(e: ParseError) -> Self {
        TonlError::Parse(e)
    }
}

impl From<TypeError> for TonlError {
    fn from(e: TypeError) -> Self {
        TonlError::Type(e)
    }
}

impl From<SecurityViolation> for TonlError {
    fn from(e: SecurityViolation) -> Self {
        TonlError::Security(e)
    }
}

impl From<LimitExceeded> for TonlError {
    fn from(e: LimitExceeded) -> Self {
        TonlError::Limit(e)
    }
}

impl From<QueryError> for TonlError {
    fn from(e: QueryError) -> Self {
        TonlError::Query(e)
    }
}

impl From<SchemaError> for TonlError {
    fn from(e: SchemaError) -> Self {
        TonlError::Schema(e)
    }
}

pub type TonlResult<T> = Result<T, TonlError>;

//! Centralized resource limits and the dangerous-name screen.
//!
//! Threaded explicitly through parser, encoder and query contexts rather
//! than kept as hidden globals, per the "explicit limits struct" design
//! note: every context that needs a limit takes a `&Limits`.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Object keys that could subvert a host's object model if ever round-tripped
/// into a dynamically-typed runtime. Rejected uniformly at every entry point
/// that accepts a field name: get, set, delete, index build, aggregate,
/// filter evaluation.
pub static DANGEROUS_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "__proto__",
        "constructor",
        "prototype",
        "__defineGetter__",
        "__defineSetter__",
        "__lookupGetter__",
        "__lookupSetter__",
    ]
    .into_iter()
    .collect()
});

pub fn is_dangerous_name(name: &str) -> bool {
    DANGEROUS_NAMES.contains(name)
}

/// Tunable resource limits, threaded through parse/encode/query contexts.
///
/// All fields have the defaults given by the specification. [`Limits::new`]
/// validates that every value is in a sane, nonzero range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_input_size: usize,
    pub max_line_length: usize,
    pub max_fields_per_line: usize,
    pub max_nesting_depth: usize,
    pub max_encode_depth: usize,
    pub max_block_lines: usize,
    pub max_regex_pattern_length: usize,
    pub max_regex_nesting_depth: usize,
    pub max_query_depth: usize,
    pub max_iterations: usize,
    pub max_string_length: usize,
    pub max_indent: usize,
    pub max_json_size: usize,
    pub max_buffer_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_size: 10 * 1024 * 1024,
            max_line_length: 100_000,
            max_fields_per_line: 10_000,
            max_nesting_depth: 100,
            max_encode_depth: 500,
            max_block_lines: 10_000,
            max_regex_pattern_length: 100,
            max_regex_nesting_depth: 3,
            max_query_depth: 500,
            max_iterations: 1_000_000,
            max_string_length: 10_000,
            max_indent: 10_000,
            max_json_size: 10 * 1024 * 1024,
            max_buffer_size: 10 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Construct limits, rejecting any field set to zero (every limit must
    /// permit at least one unit of work).
    pub fn new(defaults: Limits) -> Result<Self, String> {
        macro_rules! check {
            ($field:ident) => {
                if defaults.$field == 0 {
                    return Err(format!("{} must be greater than zero", stringify!($field)));
                }
            };
        }
        check!(max_input_size);
        check!(max_line_length);
        check!(max_fields_per_line);
        check!(max_nesting_depth);
        check!(max_encode_depth);
        check!(max_block_lines);
        check!(max_regex_pattern_length);
        check!(max_regex_nesting_depth);
        check!(max_query_depth);
        check!(max_iterations);
        check!(max_string_length);
        check!(max_indent);
        check!(max_json_size);
        check!(max_buffer_size);
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_valid() {
        assert!(Limits::new(Limits::default()).is_ok());
    }

    #[test]
    fn zero_limit_rejected() {
        let mut bad = Limits::default();
        bad.max_block_lines = 0;
        assert!(Limits::new(bad).is_err());
    }

    #[test]
    fn dangerous_names_cover_prototype_pollution_vectors() {
        assert!(is_dangerous_name("__proto__"));
        assert!(is_dangerous_name("constructor"));
        assert!(!is_dangerous_name("name"));
    }
}

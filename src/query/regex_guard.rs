//! Bounded regex sub-engine (§4.7).
//!
//! Regex usage in this crate is confined to three call sites: the `matches`
//! filter operator, schema `pattern` constraints, and named pattern aliases.
//! Every pattern passes through [`screen_pattern`] before compilation; a
//! pattern shaped like a classic ReDoS trigger (nested quantifiers over a
//! capturing group, an unbounded `.*` chained into another quantifier,
//! overlapping alternation, unbalanced parens, or simply too long / too
//! deeply nested) is rejected outright rather than compiled.
//!
//! `regex`'s matcher is linear-time by construction (no backtracking), so
//! the watchdog in [`timed_is_match`] is a defense-in-depth measurement
//! rather than the only thing standing between this crate and catastrophic
//! backtracking — but the specification calls for both, and cheap input
//! that never approaches the timeout never pays for the `Instant` calls.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SecurityViolation;
use crate::limits::Limits;

static NESTED_QUANTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^()]*[+*]\)[+*]").unwrap());
static UNBOUNDED_CHAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\*[^)]*[+*]").unwrap());
static OVERLAPPING_ALTERNATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\w+)\|\1\)[+*]").unwrap());

/// Named pattern aliases recognized by the schema `pattern` constraint.
pub fn named_pattern(alias: &str) -> Option<&'static str> {
    match alias {
        "email" => Some(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$"),
        "date" => Some(r"^\d{4}-\d{2}-\d{2}$"),
        "url" => Some(r"^https?://[^\s]+$"),
        _ => None,
    }
}

/// Reject patterns shaped like known catastrophic-backtracking triggers, or
/// that exceed the configured length/nesting limits, before any attempt to
/// compile them (§4.7).
pub fn screen_pattern(pattern: &str, limits: &Limits) -> Result<(), SecurityViolation> {
    if pattern.len() > limits.max_regex_pattern_length {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: format!(
                "pattern length {} exceeds limit of {}",
                pattern.len(),
                limits.max_regex_pattern_length
            ),
        });
    }
    let depth = max_group_nesting_depth(pattern);
    if depth > limits.max_regex_nesting_depth {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: format!(
                "group nesting depth {depth} exceeds limit of {}",
                limits.max_regex_nesting_depth
            ),
        });
    }
    if !parens_balanced(pattern) {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: "unbalanced parentheses".to_string(),
        });
    }
    if NESTED_QUANTIFIER_RE.is_match(pattern) {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: "nested quantifiers over a capturing group".to_string(),
        });
    }
    if UNBOUNDED_CHAIN_RE.is_match(pattern) {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: "unbounded '.*' chained into another quantifier".to_string(),
        });
    }
    if OVERLAPPING_ALTERNATION_RE.is_match(pattern) {
        return Err(SecurityViolation::DangerousRegex {
            pattern: pattern.to_string(),
            reason: "overlapping alternation".to_string(),
        });
    }
    Ok(())
}

fn max_group_nesting_depth(pattern: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    max_depth
}

fn parens_balanced(pattern: &str) -> bool {
    let mut depth = 0i64;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Compile a pattern after screening it, the only path by which a `Regex`
/// should ever be constructed from user-controlled input in this crate.
pub fn compile_checked(pattern: &str, limits: &Limits) -> Result<Regex, SecurityViolation> {
    screen_pattern(pattern, limits)?;
    Regex::new(pattern).map_err(|e| SecurityViolation::DangerousRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Run `re` against `text`, measuring elapsed time. Short inputs (below
/// `min_input_length_for_timeout`) bypass the watchdog entirely. Returns
/// `(is_match, exceeded_timeout)`; a timeout is reported, not enforced —
/// `regex`'s automaton cannot be preempted mid-match, so this is an
/// observability signal a caller may choose to treat as a hard failure.
pub fn timed_is_match(
    re: &Regex,
    text: &str,
    timeout_ms: u64,
    min_input_length_for_timeout: usize,
) -> (bool, bool) {
    if text.chars().count() < min_input_length_for_timeout {
        return (re.is_match(text), false);
    }
    let start = Instant::now();
    let matched = re.is_match(text);
    let exceeded = start.elapsed() > Duration::from_millis(timeout_ms);
    (matched, exceeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn rejects_nested_quantifiers() {
        assert!(screen_pattern("(x+)+", &limits()).is_err());
    }

    #[test]
    fn rejects_overlong_pattern() {
        let pattern = "a".repeat(101);
        assert!(screen_pattern(&pattern, &limits()).is_err());
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(screen_pattern("(abc", &limits()).is_err());
    }

    #[test]
    fn accepts_benign_pattern() {
        assert!(screen_pattern(r"^\d{3}-\d{4}$", &limits()).is_ok());
    }

    #[test]
    fn named_aliases_resolve() {
        assert!(named_pattern("email").is_some());
        assert!(named_pattern("nonexistent").is_none());
    }

    #[test]
    fn short_input_bypasses_watchdog() {
        let re = compile_checked(r"^\d+$", &limits()).unwrap();
        let (matched, exceeded) = timed_is_match(&re, "123", 100, 1000);
        assert!(matched);
        assert!(!exceeded);
    }
}

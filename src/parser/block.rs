//! Indentation-based block grouping.
//!
//! A "block" is a header line plus its contiguous strictly-more-indented
//! lines. Grouping only compares relative indentation (character counts of
//! leading whitespace), so tabs-vs-spaces width never has to be reconciled
//! — only "deeper than the parent" matters.
//!
//! A quoted field may embed a literal newline, so before indentation is
//! even considered, physical lines are merged back into logical lines
//! wherever a quote (or triple quote) was left open at end of line.

use crate::error::{LimitExceeded, ParseError};
use crate::limits::Limits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub indent: usize,
    pub content: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: RawLine,
    pub body: Vec<RawLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Plain,
    InQuote,
    InTripleQuote,
}

/// Track only quote-open/close transitions across a physical line, ignoring
/// field boundaries (the merge pass only needs the terminal state).
fn advance_quote_state(line: &str, mut state: QuoteState) -> QuoteState {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match state {
            QuoteState::Plain => {
                if c == '"' {
                    if chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"') {
                        state = QuoteState::InTripleQuote;
                        i += 2;
                    } else {
                        state = QuoteState::InQuote;
                    }
                }
            }
            QuoteState::InQuote => {
                if c == '\\' {
                    i += 1;
                } else if c == '"' {
                    state = QuoteState::Plain;
                }
            }
            QuoteState::InTripleQuote => {
                if c == '"' && chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"') {
                    state = QuoteState::Plain;
                    i += 2;
                }
            }
        }
        i += 1;
    }
    state
}

/// Turn raw body text into the list of logical lines block grouping works
/// over: leading indentation is stripped into [`RawLine::indent`], and any
/// line left open inside a quote is merged with its continuation lines.
pub fn logical_lines(body: &[&str], start_line_no: usize, limits: &Limits) -> Result<Vec<RawLine>, ParseError> {
    let mut out: Vec<RawLine> = Vec::new();
    let mut state = QuoteState::Plain;
    for (offset, raw) in body.iter().enumerate() {
        let line_no = start_line_no + offset;
        if raw.chars().count() > limits.max_line_length {
            return Err(ParseError::MalformedLine {
                at: crate::error::Location::new(line_no, 0),
                reason: "line exceeds configured max_line_length".to_string(),
            }
            .into());
        }
        if state == QuoteState::Plain {
            let indent = raw.chars().take_while(|c| *c == ' ' || *c == '\t').count();
            if indent > limits.max_indent {
                return Err(LimitExceeded::DepthExceeded {
                    limit: limits.max_indent,
                }
                .into());
            }
            let content: String = raw.chars().skip(indent).collect();
            if content.trim().is_empty() {
                // Blank line: structural separator, not part of any block.
                state = advance_quote_state(raw, state);
                continue;
            }
            out.push(RawLine {
                indent,
                content,
                line_no,
            });
        } else if let Some(last) = out.last_mut() {
            last.content.push('\n');
            last.content.push_str(raw);
        }
        state = advance_quote_state(raw, state);
    }
    if state != QuoteState::Plain {
        return Err(ParseError::UnclosedQuote {
            at: crate::error::Location::new(start_line_no + body.len(), 0),
        });
    }
    Ok(out)
}

/// Group a flat run of same-or-deeper-indented lines into blocks at the
/// shallowest indentation level present in `lines`.
pub fn group_blocks(lines: &[RawLine], limits: &Limits) -> Result<Vec<Block>, ParseError> {
    if lines.len() > limits.max_block_lines {
        return Err(LimitExceeded::BlockLinesExceeded {
            limit: limits.max_block_lines,
            found: lines.len(),
        }
        .into());
    }
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    let level_indent = lines[0].indent;
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let header = lines[i].clone();
        if header.indent != level_indent {
            return Err(ParseError::MalformedLine {
                at: crate::error::Location::new(header.line_no, header.indent),
                reason: "inconsistent indentation at this nesting level".to_string(),
            });
        }
        i += 1;
        let body_start = i;
        while i < lines.len() && lines[i].indent > level_indent {
            i += 1;
        }
        let body = lines[body_start..i].to_vec();
        blocks.push(Block { header, body });
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn groups_simple_nested_blocks() {
        let l = limits();
        let body = vec!["outer:", "  inner: 1", "  inner2: 2"];
        let lines = logical_lines(&body, 1, &l).unwrap();
        let blocks = group_blocks(&lines, &l).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body.len(), 2);
    }

    #[test]
    fn merges_multiline_quoted_field() {
        let l = limits();
        let body = vec![r#"note: "line one"#, r#"line two""#];
        let lines = logical_lines(&body, 1, &l).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].content, "note: \"line one\nline two\"");
    }

    #[test]
    fn blank_lines_are_structural_separators() {
        let l = limits();
        let body = vec!["a: 1", "", "b: 2"];
        let lines = logical_lines(&body, 1, &l).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn unclosed_quote_across_eof_is_an_error() {
        let l = limits();
        let body = vec![r#"note: "unterminated"#];
        assert!(logical_lines(&body, 1, &l).is_err());
    }
}

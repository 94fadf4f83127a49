//! State-machine row tokenizer.
//!
//! A tabular row is split into fields on the active delimiter. A field may
//! be bare, double-quoted (with standard backslash escapes), or
//! triple-quoted (verbatim content, only `\\` is unescaped to `\`). A
//! newline inside a quoted field is legal — the state persists across the
//! call boundary via [`RowTokenizer`], which a caller feeds one physical
//! line at a time.

use crate::error::{LimitExceeded, ParseError};
use crate::limits::Limits;

/// One tokenized field plus whether it was written with quotes. Distinguishing
/// "bare empty" (§4.3's `Missing`-producing case) from `""` (retained empty
/// string) relies on this flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub text: String,
    pub was_quoted: bool,
}

/// Internal tokenizer state, exposed so callers can detect "still inside a
/// quoted field, needs another physical line" without re-parsing from
/// scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerState {
    Plain,
    InQuote,
    InTripleQuote,
}

/// Tokenizes rows that may span multiple physical lines (an embedded
/// newline inside a quoted field).
pub struct RowTokenizer<'a> {
    delimiter: char,
    limits: &'a Limits,
    state: TokenizerState,
    fields: Vec<Field>,
    current: String,
    current_quoted: bool,
    /// Set once a field has been opened with a quote, cleared on close.
    field_started: bool,
    line_no: usize,
}

impl<'a> RowTokenizer<'a> {
    pub fn new(delimiter: char, limits: &'a Limits) -> Self {
        Self {
            delimiter,
            limits,
            state: TokenizerState::Plain,
            fields: Vec::new(),
            current: String::new(),
            current_quoted: false,
            field_started: false,
            line_no: 0,
        }
    }

    pub fn state(&self) -> TokenizerState {
        self.state
    }

    /// Feed one physical line (without its trailing newline). Returns
    /// `Ok(true)` when the row is complete (state returned to `Plain` at
    /// end of line), `Ok(false)` if more lines are needed to close an open
    /// quote.
    pub fn feed_line(&mut self, line: &str) -> Result<bool, ParseError> {
        self.line_no += 1;
        if line.chars().count() > self.limits.max_line_length {
            return Err(ParseError::MalformedLine {
                at: crate::error::Location::new(self.line_no, 0),
                reason: "line exceeds configured max_line_length".to_string(),
            });
        }
        if self.state != TokenizerState::Plain && !self.current.is_empty() {
            // Continuing a quoted field across lines: the newline is part
            // of the field's content.
            self.current.push('\n');
        }
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0usize;
        while i < chars.len() {
            let c = chars[i];
            match self.state {
                TokenizerState::Plain => {
                    if c == self.delimiter {
                        self.close_field();
                    } else if c == '"' && self.current.is_empty() && !self.field_started {
                        if chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"') {
                            self.state = TokenizerState::InTripleQuote;
                            self.field_started = true;
                            self.current_quoted = true;
                            i += 2;
                        } else {
                            self.state = TokenizerState::InQuote;
                            self.field_started = true;
                            self.current_quoted = true;
                        }
                    } else {
                        self.field_started = true;
                        self.current.push(c);
                    }
                }
                TokenizerState::InQuote => {
                    if c == '\\' {
                        if let Some(&next) = chars.get(i + 1) {
                            self.current.push(unescape_char(next));
                            i += 1;
                        } else {
                            self.current.push('\\');
                        }
                    } else if c == '"' {
                        self.state = TokenizerState::Plain;
                    } else {
                        self.current.push(c);
                    }
                }
                TokenizerState::InTripleQuote => {
                    if c == '"' && chars.get(i + 1) == Some(&'"') && chars.get(i + 2) == Some(&'"')
                    {
                        self.state = TokenizerState::Plain;
                        i += 2;
                    } else if c == '\\' && chars.get(i + 1) == Some(&'\\') {
                        self.current.push('\\');
                        i += 1;
                    } else {
                        self.current.push(c);
                    }
                }
            }
            i += 1;
            if self.fields.len() + 1 > self.limits.max_fields_per_line {
                return Err(LimitExceeded::BufferOverflow {
                    limit: self.limits.max_fields_per_line,
                }
                .into());
            }
        }
        Ok(self.state == TokenizerState::Plain)
    }

    fn close_field(&mut self) {
        let text = std::mem::take(&mut self.current);
        let was_quoted = self.current_quoted;
        self.current_quoted = false;
        self.field_started = false;
        self.fields.push(Field { text, was_quoted });
    }

    /// Finish the row (called once `feed_line` returns `Ok(true)`), returning
    /// the accumulated fields.
    pub fn finish(mut self) -> Result<Vec<Field>, ParseError> {
        if self.state != TokenizerState::Plain {
            return Err(ParseError::UnclosedQuote {
                at: crate::error::Location::new(self.line_no, 0),
            });
        }
        self.close_field();
        Ok(self.fields)
    }
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '"' => '"',
        '\\' => '\\',
        other => other,
    }
}

/// Tokenize a single-line row in one call (the common case: no embedded
/// newlines in any field).
pub fn tokenize_row(line: &str, delimiter: char, limits: &Limits) -> Result<Vec<Field>, ParseError> {
    let mut t = RowTokenizer::new(delimiter, limits);
    let complete = t.feed_line(line)?;
    if !complete {
        return Err(ParseError::UnclosedQuote {
            at: crate::error::Location::new(1, 0),
        });
    }
    t.finish()
}

/// Tokenize a row that may span multiple lines, pulling more lines from
/// `lines` as needed until the row closes.
pub fn tokenize_row_multiline<'l, I>(
    first: &str,
    lines: &mut I,
    delimiter: char,
    limits: &Limits,
) -> Result<Vec<Field>, ParseError>
where
    I: Iterator<Item = &'l str>,
{
    let mut t = RowTokenizer::new(delimiter, limits);
    let mut complete = t.feed_line(first)?;
    while !complete {
        match lines.next() {
            Some(next) => complete = t.feed_line(next)?,
            None => {
                return Err(ParseError::UnclosedQuote {
                    at: crate::error::Location::new(t.line_no, 0),
                })
            }
        }
    }
    t.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn splits_plain_fields() {
        let l = limits();
        let fields = tokenize_row("1,Alice,admin", ',', &l).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].text, "1");
        assert_eq!(fields[1].text, "Alice");
        assert_eq!(fields[2].text, "admin");
        assert!(!fields[0].was_quoted);
    }

    #[test]
    fn handles_quoted_field_with_delimiter() {
        let l = limits();
        let fields = tokenize_row(r#"2,"Bob, Jr.",user"#, ',', &l).unwrap();
        assert_eq!(fields[1].text, "Bob, Jr.");
        assert!(fields[1].was_quoted);
    }

    #[test]
    fn distinguishes_missing_from_empty_string() {
        let l = limits();
        let fields = tokenize_row(r#"1,,""#, ',', &l).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(!fields[1].was_quoted && fields[1].text.is_empty());
        assert!(fields[2].was_quoted && fields[2].text.is_empty());
    }

    #[test]
    fn handles_escapes_in_quoted_field() {
        let l = limits();
        let fields = tokenize_row(r#""line\nbreak""#, ',', &l).unwrap();
        assert_eq!(fields[0].text, "line\nbreak");
    }

    #[test]
    fn triple_quote_preserves_newlines_and_unescapes_backslash() {
        let l = limits();
        let mut lines = vec!["second line", r#"more\\text""""#].into_iter();
        let fields =
            tokenize_row_multiline(r#""""first line"#, &mut lines, ',', &l).unwrap();
        assert_eq!(fields[0].text, "first line\nsecond line\nmore\\text");
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        let l = limits();
        assert!(tokenize_row(r#""unterminated"#, ',', &l).is_err());
    }
}

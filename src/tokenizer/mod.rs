//! Line-level tokenizer.
//!
//! Splits a single data row into fields, honoring the active delimiter and
//! the three quoting states described by §4.3.4 of the format
//! specification: `plain`, `inQuote`, `inTripleQuote`. Unlike the block
//! parser (which groups whole lines by indentation), this module only ever
//! sees one already-dedented row at a time — but a quoted field may itself
//! span multiple physical lines, so the state machine is resumable across
//! line boundaries via [`RowTokenizer`].

mod line_tokenizer;

pub use line_tokenizer::{tokenize_row, tokenize_row_multiline, Field, RowTokenizer, TokenizerState};

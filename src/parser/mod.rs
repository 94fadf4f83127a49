//! TONL decoder / parser.
//!
//! This module implements the decode side of the format: text in, a
//! [`crate::value::Value`] tree out. It is structured the same way the
//! encoder is structured in reverse, following a small pipeline of its
//! own:
//!
//! 1. [`directives`] — read the `#version` / `#delimiter` prologue.
//! 2. [`block`] — group the body into an indentation tree of raw lines.
//! 3. [`header`] — classify each block's header line by shape.
//! 4. [`document_parser`] — dispatch each block by shape (tabular, object
//!    array, nested object, inline primitive list, scalar) and coerce field
//!    text through [`crate::value::infer_from_text`] or a column's declared
//!    type hint.
//!
//! Resource limits (§5 of the specification) are enforced at every stage
//! that could otherwise be driven unbounded by adversarial input.

mod block;
mod directives;
mod document_parser;
mod header;

pub use block::{group_blocks, Block, RawLine};
pub use directives::{read_directives, Directives};
pub use document_parser::{decode, DecodeOptions};
pub use header::{parse_header_line, HeaderShape};

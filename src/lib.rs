//! TONL — Token-Optimized Notation Language.
//!
//! A tabular-oriented textual serialization format designed to represent
//! the same data model as JSON while consuming fewer LLM tokens. This crate
//! is the core engine: encoder, decoder, path-expression query engine,
//! mutation engine, secondary indices, and a schema validator. CLI
//! dispatch, file I/O, and stream assembly are host concerns and live
//! outside this crate.
//!
//! The [`Document`] type is the usual entry point: it owns a [`Value`]
//! tree plus a version counter, an LRU query cache, and any secondary
//! indices attached to it, and ties the lower-level modules together into
//! the public API described by the format specification. Callers who only
//! need to encode or decode text can reach for [`encoder::encode`] /
//! [`parser::decode`] directly without a `Document` at all.

pub mod aggregate;
pub mod document;
pub mod encoder;
pub mod error;
pub mod index;
pub mod limits;
pub mod mutate;
pub mod parser;
pub mod path;
pub mod query;
pub mod schema;
pub mod tokenizer;
pub mod value;

pub use document::{Document, GroupEntry, IndexOptions, Stats};
pub use error::{TonlError, TonlResult};
pub use value::{TypeHint, Value};

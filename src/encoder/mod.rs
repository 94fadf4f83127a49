//! TONL encoder: serializes a [`crate::value::Value`] tree back to text.
//!
//! Mirrors the decoder's pipeline in reverse: a per-node layout decision
//! ([`layout`]), a smart delimiter choice when requested ([`delimiter`]),
//! and a recursive writer ([`writer`]) that applies quoting rules and
//! enforces the cycle/depth guards the specification requires.

mod delimiter;
mod layout;
mod options;
mod writer;

pub use delimiter::choose_delimiter;
pub use options::EncodeOptions;
pub use writer::{encode, encode_smart};

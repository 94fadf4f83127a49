//! Mutation engine: path-targeted `get`/`set`/`delete`/`push`/`pop`/`merge`
//! plus snapshot/diff/restore (§4.6).

pub mod engine;
pub mod snapshot;

pub use engine::{delete, exists, get, merge, pop, push, set};
pub use snapshot::{diff, restore, DiffEntry, DiffKind, Snapshot};

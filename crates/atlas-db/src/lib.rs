//! Atlas Database Layer
//!
//! SQLite persistence for regions, languages and their satellite facts.
//! Writes are idempotent merges so that repeated sync runs converge on the
//! same state.

pub mod checkpoint;
pub mod connection;
pub mod migrations;
pub mod queries;

pub use checkpoint::Checkpoint;
pub use connection::{Database, DbError, DbResult};
pub use queries::parents::MergeOutcome;
pub use queries::EntityKind;

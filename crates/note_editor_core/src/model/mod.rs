//! Domain model for notes edited by editor surfaces.
//!
//! # Responsibility
//! - Define the records the editor reads, diffs and persists.
//! - Keep folder and resource shapes limited to what editors display.
//!
//! # Invariants
//! - Every persisted record is identified by a stable `Uuid`.
//! - Records are values; shared state is replaced, never edited in place.

pub mod folder;
pub mod note;
pub mod resource;

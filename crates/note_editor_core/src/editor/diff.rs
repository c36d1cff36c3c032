//! Field differ.
//!
//! # Invariants
//! - Pure and synchronous.
//! - `type_` is never reported as changed.

use crate::model::note::{Note, NoteField};

/// Returns the fields whose values differ between `old` and `new`, in
/// declaration order, excluding the type discriminator.
pub fn diff_fields(old: &Note, new: &Note) -> Vec<NoteField> {
    NoteField::ALL
        .iter()
        .copied()
        .filter(|field| *field != NoteField::ItemType)
        .filter(|field| old.get(*field) != new.get(*field))
        .collect()
}

/// Whether `current` differs from the last persisted snapshot.
///
/// A missing snapshot on either side counts as "not modified".
pub fn is_modified(last_saved: Option<&Note>, current: Option<&Note>) -> bool {
    match (last_saved, current) {
        (Some(last_saved), Some(current)) => !diff_fields(last_saved, current).is_empty(),
        _ => false,
    }
}

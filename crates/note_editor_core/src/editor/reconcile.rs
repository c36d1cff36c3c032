//! State reconciler.
//!
//! Merges the result of a finished save into whatever the live note has
//! become while the save was in flight.
//!
//! # Invariants
//! - A result for a note that is no longer live is `Superseded`.
//! - Title and body typed during the save survive the merge; the title is not
//!   restored when it was auto-assigned by this save.
//! - `last_saved` mirrors storage: it never carries the live overlay.

use crate::model::note::{Note, NoteId};

/// What one save attempt started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveContext {
    /// Note had no id when written (first save or recreation).
    pub is_new: bool,
    /// Live note id when the attempt took its snapshot.
    pub original_id: Option<NoteId>,
    /// Editor generation when the attempt took its snapshot.
    pub generation: u64,
    /// Title was derived from the body by this attempt.
    pub auto_titled: bool,
}

/// Live state as seen when the save completes.
#[derive(Debug, Clone, Copy)]
pub struct LiveView<'a> {
    pub note: Option<&'a Note>,
    pub generation: u64,
}

/// Reconciler verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Editor moved to another note; drop the result.
    Superseded,
    Merged { note: Note, last_saved: Note },
}

pub fn reconcile(live: LiveView<'_>, saved: &Note, ctx: &SaveContext) -> Reconciliation {
    if live.generation != ctx.generation {
        return Reconciliation::Superseded;
    }
    let Some(live_note) = live.note else {
        return Reconciliation::Superseded;
    };
    if !ctx.is_new && live_note.id != saved.id {
        return Reconciliation::Superseded;
    }

    let last_saved = saved.clone();
    let mut note = saved.clone();
    if live_note.id == ctx.original_id {
        if !ctx.auto_titled {
            note.title = live_note.title.clone();
        }
        note.body = live_note.body.clone();
    }

    Reconciliation::Merged { note, last_saved }
}

#[cfg(test)]
mod tests {
    use super::{reconcile, LiveView, Reconciliation, SaveContext};
    use crate::model::note::Note;
    use uuid::Uuid;

    fn saved_note(id: Uuid, title: &str, body: &str) -> Note {
        Note {
            id: Some(id),
            title: title.to_string(),
            body: body.to_string(),
            updated_time: Some(2_000),
            ..Note::default()
        }
    }

    fn ctx(is_new: bool, original_id: Option<Uuid>, auto_titled: bool) -> SaveContext {
        SaveContext {
            is_new,
            original_id,
            generation: 3,
            auto_titled,
        }
    }

    #[test]
    fn update_keeps_text_typed_during_save() {
        let id = Uuid::new_v4();
        let saved = saved_note(id, "t", "old");
        let mut live = saved_note(id, "t2", "newer");
        live.updated_time = Some(1_000);

        let result = reconcile(
            LiveView {
                note: Some(&live),
                generation: 3,
            },
            &saved,
            &ctx(false, Some(id), false),
        );
        let Reconciliation::Merged { note, last_saved } = result else {
            panic!("expected merge");
        };
        assert_eq!(note.body, "newer");
        assert_eq!(note.title, "t2");
        assert_eq!(note.updated_time, Some(2_000));
        assert_eq!(last_saved, saved);
    }

    #[test]
    fn update_for_another_note_is_superseded() {
        let saved = saved_note(Uuid::new_v4(), "a", "b");
        let live = saved_note(Uuid::new_v4(), "c", "d");
        let result = reconcile(
            LiveView {
                note: Some(&live),
                generation: 3,
            },
            &saved,
            &ctx(false, saved.id, false),
        );
        assert_eq!(result, Reconciliation::Superseded);
    }

    #[test]
    fn reload_bumps_generation_and_supersedes_new_note_save() {
        let saved = saved_note(Uuid::new_v4(), "a", "b");
        let live = Note::default();
        let result = reconcile(
            LiveView {
                note: Some(&live),
                generation: 4,
            },
            &saved,
            &ctx(true, None, false),
        );
        assert_eq!(result, Reconciliation::Superseded);
    }

    #[test]
    fn auto_title_is_not_overwritten_by_empty_live_title() {
        let id = Uuid::new_v4();
        let saved = saved_note(id, "Hello", "Hello");
        let live = Note {
            body: "Hello world".to_string(),
            ..Note::default()
        };
        let result = reconcile(
            LiveView {
                note: Some(&live),
                generation: 3,
            },
            &saved,
            &ctx(true, None, true),
        );
        let Reconciliation::Merged { note, last_saved } = result else {
            panic!("expected merge");
        };
        assert_eq!(note.id, Some(id));
        assert_eq!(note.title, "Hello");
        assert_eq!(note.body, "Hello world");
        assert_eq!(last_saved.body, "Hello");
    }
}

//! Single-field edits.
//!
//! # Responsibility
//! - `change_field`: copy-on-write edit of the live note, no I/O.
//! - `save_property`: write one field straight through to storage outside
//!   the full-save lock.
//!
//! # Invariants
//! - A property write for a note that is no longer live never touches the
//!   slot.
//! - Editing the title turns off body-derived titles for that note.

use crate::editor::error::{EditorError, EditorResult};
use crate::editor::NoteEditor;
use crate::model::note::{FieldValue, NoteField, NoteFieldError, NoteId};
use crate::repo::note_repo::SaveOptions;
use log::{debug, info, warn};

/// Where a `save_property` value ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOutcome {
    /// Written to storage and merged into the live note.
    Persisted,
    /// Note not stored (yet); only the live note changed.
    InMemory,
    /// Written, but the editor moved on before the result came back.
    Discarded,
}

impl NoteEditor {
    /// Replaces one field of the live note.
    ///
    /// # Errors
    /// - `NoNoteLoaded` when the slot is empty.
    /// - `Field` for read-only fields or mismatched value kinds.
    pub fn change_field(&self, field: NoteField, value: impl Into<FieldValue>) -> EditorResult<()> {
        let value = value.into();
        let mut state = self.lock_state();
        let Some(current) = state.note.as_ref() else {
            return Err(EditorError::NoNoteLoaded);
        };
        let next = current.with_field(field, value)?;
        state.note = Some(next);
        if field == NoteField::Title {
            state.auto_title_note_id = None;
        }
        Ok(())
    }

    /// Writes one field of the live note directly to storage.
    ///
    /// Unsaved or concurrently deleted notes only get the in-memory update;
    /// the next full save persists it.
    ///
    /// # Errors
    /// - `NoNoteLoaded` when the slot is empty.
    /// - `Field` for read-only fields or mismatched value kinds.
    /// - `Repo` when the write fails.
    pub async fn save_property(
        &self,
        field: NoteField,
        value: impl Into<FieldValue>,
    ) -> EditorResult<PropertyOutcome> {
        if !field.is_writable() {
            return Err(NoteFieldError::ReadOnly(field).into());
        }
        let value = value.into();
        let target = {
            let state = self.lock_state();
            let Some(note) = state.note.as_ref() else {
                return Err(EditorError::NoNoteLoaded);
            };
            note.with_field(field, value.clone())?
        };

        let stored = match target.id {
            Some(id) => self.session.notes().exists(id).await?,
            None => false,
        };
        let Some(id) = target.id.filter(|_| stored) else {
            if !self.apply_property(target.id, field, &value, false)? {
                return Ok(PropertyOutcome::Discarded);
            }
            debug!(
                "event=note_property_save module=editor status=in_memory field={}",
                field
            );
            return Ok(PropertyOutcome::InMemory);
        };

        self.session
            .notes()
            .save(&target, &SaveOptions::only(vec![field]))
            .await?;
        let persisted = match self.session.notes().load(id).await? {
            Some(reloaded) => reloaded.get(field),
            None => {
                warn!(
                    "event=note_property_save module=editor status=reload_missing note_id={} field={}",
                    id, field
                );
                value
            }
        };

        if !self.apply_property(Some(id), field, &persisted, true)? {
            info!(
                "event=note_property_save module=editor status=discarded note_id={} field={}",
                id, field
            );
            return Ok(PropertyOutcome::Discarded);
        }
        info!(
            "event=note_property_save module=editor status=ok note_id={} field={}",
            id, field
        );
        Ok(PropertyOutcome::Persisted)
    }

    /// Applies `value` to the live note (and `last_saved` when persisted)
    /// if the live id is still `id`.
    fn apply_property(
        &self,
        id: Option<NoteId>,
        field: NoteField,
        value: &FieldValue,
        persisted: bool,
    ) -> EditorResult<bool> {
        let mut state = self.lock_state();
        let Some(live) = state.note.as_ref().filter(|note| note.id == id) else {
            return Ok(false);
        };
        let next = live.with_field(field, value.clone())?;
        state.note = Some(next);
        if persisted {
            if let Some(previous) = state.last_saved.as_ref() {
                let next_saved = previous.with_field(field, value.clone())?;
                state.last_saved = Some(next_saved);
            }
        }
        if field == NoteField::Title {
            state.auto_title_note_id = None;
        }
        Ok(true)
    }
}

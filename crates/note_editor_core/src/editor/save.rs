//! Save coordinator.
//!
//! # Responsibility
//! - Persist the live note with a minimal field list under the session save
//!   lock.
//! - Demote saves of concurrently deleted notes to creations.
//! - Publish the reconciled result and kick off enrichment for new notes.
//! - Keep the tracked folder in step with the saved parent.
//!
//! # Invariants
//! - The save lock is acquired before the snapshot is taken and released on
//!   every exit path (guard drop).
//! - Storage failures leave editor state untouched.
//! - An explicit, empty field list skips storage entirely; the snapshot is
//!   then treated as the saved note and timestamps are not bumped.

use crate::editor::diff::diff_fields;
use crate::editor::error::EditorResult;
use crate::editor::events::{EditorEvent, NoteMetadata};
use crate::editor::reconcile::{reconcile, LiveView, Reconciliation, SaveContext};
use crate::editor::title::default_title;
use crate::editor::NoteEditor;
use crate::model::folder::{Folder, FolderId};
use crate::model::note::{Note, NoteField, NoteId};
use crate::repo::note_repo::SaveOptions;
use crate::repo::settings_repo::ACTIVE_FOLDER_ID_KEY;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Result of one `attempt_save` call.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SaveReport),
    Skipped(SkipReason),
}

impl SaveOutcome {
    /// Saved note id, when the save went through.
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Saved(report) => Some(report.note_id),
            Self::Skipped(_) => None,
        }
    }
}

/// Why a save was a no-op. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Editor slot is empty.
    NoNote,
    /// No explicit, own, active or default folder resolved.
    NoFolder,
    /// Editor loaded another note while the write was in flight.
    Superseded,
}

/// Details of a completed save.
#[derive(Debug)]
pub struct SaveReport {
    pub note_id: NoteId,
    /// Note was created (first save or recreation after deletion).
    pub created: bool,
    /// Field list sent to storage; `None` means a full write.
    pub fields: Option<Vec<NoteField>>,
    /// `false` when the field list was empty and storage was skipped.
    pub persisted: bool,
    pub auto_titled: bool,
    /// Background enrichment task. Awaiting it is optional.
    pub enrichment: Option<JoinHandle<()>>,
}

impl NoteEditor {
    /// Saves the live note, optionally into `folder_id`.
    ///
    /// # Errors
    /// - `EditorError::Repo` when storage rejects or fails the write. State
    ///   is left untouched and the save lock is released.
    pub async fn attempt_save(
        self: &Arc<Self>,
        folder_id: Option<FolderId>,
    ) -> EditorResult<SaveOutcome> {
        let _save_guard = self.session.save_lock().lock().await;
        let started_at = Instant::now();

        let (mut note, last_saved, auto_title_note_id, generation, shown_folder_id) = {
            let state = self.lock_state();
            let Some(note) = state.note.clone() else {
                debug!("event=note_save module=editor status=skip reason=no_note");
                return Ok(SaveOutcome::Skipped(SkipReason::NoNote));
            };
            (
                note,
                state.last_saved.clone(),
                state.auto_title_note_id,
                state.generation,
                state.folder.as_ref().map(|folder| folder.id),
            )
        };
        let original_id = note.id;

        if let Some(id) = note.id {
            if !self.session.notes().exists(id).await? {
                info!("event=note_save module=editor status=recreate note_id={id}");
                note.id = None;
            }
        }

        let Some(parent_folder) = self.resolve_folder(folder_id, &note).await? else {
            info!("event=note_save module=editor status=skip reason=no_folder");
            return Ok(SaveOutcome::Skipped(SkipReason::NoFolder));
        };
        note.parent_id = Some(parent_folder);

        let is_new = note.id.is_none();
        let mut save_options = SaveOptions {
            fields: None,
            user_side_validation: true,
        };
        if !is_new {
            save_options.fields = last_saved
                .as_ref()
                .map(|previous| diff_fields(previous, &note));
        }

        let marker_applies = auto_title_note_id.is_some() && auto_title_note_id == original_id;
        let auto_titled =
            self.options.auto_title && (marker_applies || (is_new && note.title.is_empty()));
        if auto_titled {
            note.title = default_title(&note.body);
            if let Some(fields) = save_options.fields.as_mut() {
                if !fields.contains(&NoteField::Title) {
                    fields.push(NoteField::Title);
                }
            }
        }

        let persisted = !matches!(save_options.fields.as_deref(), Some([]));
        let saved = if persisted {
            match self.session.notes().save(&note, &save_options).await {
                Ok(saved) => saved,
                Err(err) => {
                    error!(
                        "event=note_save module=editor status=error created={} duration_ms={} error={}",
                        is_new,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err.into());
                }
            }
        } else {
            debug!("event=note_save module=editor status=noop reason=no_changed_fields");
            note.clone()
        };

        let folder = if is_new || shown_folder_id != Some(parent_folder) {
            self.session.folders().load_folder(parent_folder).await?
        } else {
            None
        };

        let ctx = SaveContext {
            is_new,
            original_id,
            generation,
            auto_titled,
        };
        let (note_id, metadata) = {
            let mut state = self.lock_state();
            let live = LiveView {
                note: state.note.as_ref(),
                generation: state.generation,
            };
            let (merged, snapshot) = match reconcile(live, &saved, &ctx) {
                Reconciliation::Superseded => {
                    info!(
                        "event=note_save module=editor status=skip reason=superseded duration_ms={}",
                        started_at.elapsed().as_millis()
                    );
                    return Ok(SaveOutcome::Skipped(SkipReason::Superseded));
                }
                Reconciliation::Merged { note, last_saved } => (note, last_saved),
            };
            let Some(note_id) = merged.id else {
                return Err(crate::repo::RepoError::InvalidData(
                    "saved note has no id".to_string(),
                )
                .into());
            };

            let metadata = NoteMetadata::of(&merged);
            publish(&mut state, merged, snapshot, folder);
            if is_new && auto_titled {
                state.auto_title_note_id = Some(note_id);
            }
            if !self.options.auto_title {
                state.auto_title_note_id = None;
            }
            (note_id, metadata)
        };

        let enrichment = if is_new {
            self.spawn_enrichment(note_id)
        } else {
            None
        };
        if is_new {
            self.emit(EditorEvent::NoteCreated { id: note_id });
        }
        self.emit(EditorEvent::MetadataRefreshed(metadata));

        info!(
            "event=note_save module=editor status=ok note_id={} created={} fields={} persisted={} duration_ms={}",
            note_id,
            is_new,
            save_options
                .fields
                .as_ref()
                .map_or_else(|| "all".to_string(), |fields| fields.len().to_string()),
            persisted,
            started_at.elapsed().as_millis()
        );

        Ok(SaveOutcome::Saved(SaveReport {
            note_id,
            created: is_new,
            fields: save_options.fields,
            persisted,
            auto_titled,
            enrichment,
        }))
    }

    /// Explicit folder, then the note's own, then the active folder setting,
    /// then the store default.
    async fn resolve_folder(
        &self,
        explicit: Option<FolderId>,
        note: &Note,
    ) -> EditorResult<Option<FolderId>> {
        if let Some(id) = explicit.or(note.parent_id) {
            return Ok(Some(id));
        }

        let active_id = self
            .session
            .settings()
            .get_value(ACTIVE_FOLDER_ID_KEY)
            .await?
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
        if let Some(active_id) = active_id {
            if let Some(folder) = self.session.folders().load_folder(active_id).await? {
                return Ok(Some(folder.id));
            }
        }

        let fallback = self.session.folders().default_folder().await?;
        Ok(fallback.map(|folder| folder.id))
    }
}

fn publish(
    state: &mut crate::editor::state::EditorState,
    note: Note,
    last_saved: Note,
    folder: Option<Folder>,
) {
    state.note = Some(note);
    state.last_saved = Some(last_saved);
    if folder.is_some() {
        state.folder = folder;
    }
}

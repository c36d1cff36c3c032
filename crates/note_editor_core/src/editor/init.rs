//! Editor initialization and note loading.
//!
//! # Responsibility
//! - Build the first editor state for an existing or a new note.
//! - Replace the live note when the surface switches to another note.
//!
//! # Invariants
//! - After open or load, `last_saved` equals the live note, so the editor
//!   reports no modification.
//! - Every load bumps `generation`.

use crate::editor::error::{EditorError, EditorResult};
use crate::editor::session::EditorSession;
use crate::editor::state::{EditorMode, EditorOptions, EditorState};
use crate::editor::NoteEditor;
use crate::model::folder::{folder_by_id, Folder, FolderId};
use crate::model::note::{ItemType, Note, NoteId};
use crate::model::resource::AttachedResource;
use log::info;
use std::sync::Arc;

/// Note an editor is opened on.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenTarget {
    /// Stored note. Provisional notes were just created by the host and keep
    /// a body-derived title until the user edits it.
    Existing { id: NoteId, provisional: bool },
    /// Unsaved note, created on first save.
    New(NewNote),
}

/// Initial values of an unsaved note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub parent_id: Option<FolderId>,
    pub title: String,
    pub body: String,
    pub is_todo: bool,
}

impl NoteEditor {
    /// Opens an editor surface on `target`.
    ///
    /// # Errors
    /// - `NoteNotFound` when an existing note is missing.
    /// - `Repo` when storage lookups fail.
    pub async fn open(
        session: Arc<EditorSession>,
        target: OpenTarget,
        options: EditorOptions,
    ) -> EditorResult<Arc<Self>> {
        let state = initial_state(&session, &target).await?;
        info!(
            "event=editor_open module=editor status=ok target={} mode={:?} resources={}",
            target_kind(&target),
            state.mode,
            state.resources.len()
        );
        Ok(Arc::new(Self::from_state(session, options, state)))
    }

    /// Switches the surface to another note.
    ///
    /// In-flight saves and enrichment for the previous note are dropped when
    /// they complete.
    pub async fn load_note(&self, target: OpenTarget) -> EditorResult<()> {
        let next = initial_state(&self.session, &target).await?;
        let generation = {
            let mut state = self.lock_state();
            let generation = state.generation + 1;
            *state = EditorState {
                generation,
                ..next
            };
            generation
        };
        info!(
            "event=editor_load module=editor status=ok target={} generation={}",
            target_kind(&target),
            generation
        );
        Ok(())
    }

    /// Reloads attachments linked from the live body.
    pub async fn refresh_resources(&self) -> EditorResult<usize> {
        let (id, body) = {
            let state = self.lock_state();
            let Some(note) = state.note.as_ref() else {
                return Err(EditorError::NoNoteLoaded);
            };
            (note.id, note.body.clone())
        };

        let resources = attached_resources(&self.session, &body).await?;
        let count = resources.len();
        let mut state = self.lock_state();
        if state.note_id() == id {
            state.resources = resources;
        }
        Ok(count)
    }
}

async fn initial_state(session: &EditorSession, target: &OpenTarget) -> EditorResult<EditorState> {
    match target {
        OpenTarget::Existing { id, provisional } => {
            let Some(note) = session.notes().load(*id).await? else {
                return Err(EditorError::NoteNotFound(*id));
            };
            let folder = resolve_note_folder(session, note.parent_id).await?;
            let resources = attached_resources(session, &note.body).await?;
            Ok(EditorState {
                last_saved: Some(note.clone()),
                note: Some(note),
                auto_title_note_id: (*provisional).then_some(*id),
                folder,
                resources,
                mode: if *provisional {
                    EditorMode::Edit
                } else {
                    EditorMode::View
                },
                generation: 0,
            })
        }
        OpenTarget::New(new_note) => {
            let note = Note {
                parent_id: new_note.parent_id,
                title: new_note.title.clone(),
                body: new_note.body.clone(),
                is_todo: new_note.is_todo,
                ..Note::default()
            };
            let folder = resolve_note_folder(session, note.parent_id).await?;
            let resources = attached_resources(session, &note.body).await?;
            Ok(EditorState {
                last_saved: Some(note.clone()),
                note: Some(note),
                auto_title_note_id: None,
                folder,
                resources,
                mode: EditorMode::Edit,
                generation: 0,
            })
        }
    }
}

async fn resolve_note_folder(
    session: &EditorSession,
    parent_id: Option<FolderId>,
) -> EditorResult<Option<Folder>> {
    let Some(parent_id) = parent_id else {
        return Ok(None);
    };
    let folders = session.folders().all_folders().await?;
    Ok(folder_by_id(&folders, parent_id).cloned())
}

async fn attached_resources(
    session: &EditorSession,
    body: &str,
) -> EditorResult<Vec<AttachedResource>> {
    let ids = session
        .resources()
        .linked_item_ids(ItemType::Resource, body)
        .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(session.resources().batch_load_resources(&ids).await?)
}

fn target_kind(target: &OpenTarget) -> &'static str {
    match target {
        OpenTarget::Existing {
            provisional: true, ..
        } => "provisional",
        OpenTarget::Existing { .. } => "existing",
        OpenTarget::New(_) => "new",
    }
}

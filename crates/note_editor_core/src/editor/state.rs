//! Editor surface state.
//!
//! # Invariants
//! - `note` (live slot) and `last_saved` are only ever replaced wholesale.
//! - `generation` increases every time a load replaces the slot, so results
//!   computed for an earlier note can be recognised as stale.

use crate::model::folder::Folder;
use crate::model::note::{Note, NoteId};
use crate::model::resource::AttachedResource;

/// How the host surface presents the note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    View,
    Edit,
}

/// Per-editor behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    /// Derive titles from the body for untitled new notes.
    pub auto_title: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self { auto_title: true }
    }
}

/// Everything one editor surface owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    /// Live document slot: what the user sees and edits.
    pub note: Option<Note>,
    /// Last state known to match storage. Only used for diffs.
    pub last_saved: Option<Note>,
    /// Note whose title is still derived from its body on every save,
    /// until the user edits the title.
    pub auto_title_note_id: Option<NoteId>,
    pub folder: Option<Folder>,
    pub resources: Vec<AttachedResource>,
    pub mode: EditorMode,
    pub generation: u64,
}

impl EditorState {
    /// Id of the live note, if persisted.
    pub fn note_id(&self) -> Option<NoteId> {
        self.note.as_ref().and_then(|note| note.id)
    }
}

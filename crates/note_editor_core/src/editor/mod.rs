//! Editor surfaces: live note state kept consistent with storage.
//!
//! # Responsibility
//! - Own the live note slot and the last persisted snapshot of one surface.
//! - Run full saves under the session save lock and reconcile their results
//!   with edits made while the write was in flight.
//! - Merge late enrichment data into whatever note is live when it arrives.
//!
//! # Invariants
//! - At most one full save per session is in flight (`EditorSession` lock).
//! - The state mutex is never held across an `.await`; every write replaces
//!   the slot values wholesale.
//! - Results for a note (or generation) that is no longer live are dropped.

pub mod diff;
pub mod enrich;
pub mod error;
pub mod events;
pub mod init;
pub mod property;
pub mod reconcile;
pub mod save;
pub mod session;
pub mod state;
pub mod title;

use crate::editor::diff::is_modified;
use crate::editor::events::EditorEvent;
use crate::editor::session::EditorSession;
use crate::editor::state::{EditorOptions, EditorState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One editor surface.
///
/// Shared as `Arc<NoteEditor>` between the host UI and background tasks.
pub struct NoteEditor {
    session: Arc<EditorSession>,
    options: EditorOptions,
    state: Mutex<EditorState>,
    events: broadcast::Sender<EditorEvent>,
}

impl NoteEditor {
    fn from_state(session: Arc<EditorSession>, options: EditorOptions, state: EditorState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session,
            options,
            state: Mutex::new(state),
            events,
        }
    }

    /// Copy of the whole editor state.
    pub fn snapshot(&self) -> EditorState {
        self.lock_state().clone()
    }

    /// Whether the live note differs from the last persisted snapshot.
    pub fn is_modified(&self) -> bool {
        let state = self.lock_state();
        is_modified(state.last_saved.as_ref(), state.note.as_ref())
    }

    /// Receives events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    pub fn session(&self) -> &Arc<EditorSession> {
        &self.session
    }

    // State is only replaced wholesale, so a poisoned lock still guards a
    // consistent value.
    fn lock_state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EditorEvent) {
        // Fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

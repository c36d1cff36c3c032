//! Note editor core.
//!
//! Keeps an editable in-memory note consistent with its stored copy while
//! saves, reloads, deletions and late enrichment race with user edits.

pub mod db;
pub mod editor;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_db, open_db_in_memory, DbError, SharedConnection};
pub use editor::enrich::{
    EnrichError, Enricher, FixedLocation, GeolocationEnricher, Location, LocationSource,
};
pub use editor::error::{EditorError, EditorResult};
pub use editor::events::{EditorEvent, NoteMetadata};
pub use editor::init::{NewNote, OpenTarget};
pub use editor::property::PropertyOutcome;
pub use editor::save::{SaveOutcome, SaveReport, SkipReason};
pub use editor::session::{EditorSession, SessionStores};
pub use editor::state::{EditorMode, EditorOptions, EditorState};
pub use editor::NoteEditor;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::folder::{Folder, FolderId};
pub use model::note::{FieldValue, Note, NoteField, NoteId, NotePatch};
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Editor session: collaborators and the save lock shared by every editor
//! opened from it.
//!
//! # Invariants
//! - One `save_lock` per session; it is constructed here and handed to
//!   editors explicitly, never reached through a global.

use crate::db::SharedConnection;
use crate::editor::enrich::Enricher;
use crate::repo::folder_repo::{FolderStore, SqliteFolderStore};
use crate::repo::note_repo::{NoteStore, SqliteNoteStore};
use crate::repo::resource_repo::{ResourceStore, SqliteResourceStore};
use crate::repo::settings_repo::{Settings, SqliteSettingsStore};
use crate::repo::RepoResult;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage collaborators consumed by editors.
#[derive(Clone)]
pub struct SessionStores {
    pub notes: Arc<dyn NoteStore>,
    pub folders: Arc<dyn FolderStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub settings: Arc<dyn Settings>,
}

impl SessionStores {
    /// Builds every store over one shared SQLite connection.
    pub fn sqlite(conn: SharedConnection) -> RepoResult<Self> {
        Ok(Self {
            notes: Arc::new(SqliteNoteStore::try_new(conn.clone())?),
            folders: Arc::new(SqliteFolderStore::try_new(conn.clone())?),
            resources: Arc::new(SqliteResourceStore::try_new(conn.clone())?),
            settings: Arc::new(SqliteSettingsStore::try_new(conn)?),
        })
    }
}

/// Process- or window-scoped editor context.
pub struct EditorSession {
    stores: SessionStores,
    enricher: Option<Arc<dyn Enricher>>,
    save_lock: Mutex<()>,
}

impl EditorSession {
    pub fn new(stores: SessionStores) -> Self {
        Self {
            stores,
            enricher: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Enables late enrichment of newly created notes.
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn notes(&self) -> &Arc<dyn NoteStore> {
        &self.stores.notes
    }

    pub fn folders(&self) -> &Arc<dyn FolderStore> {
        &self.stores.folders
    }

    pub fn resources(&self) -> &Arc<dyn ResourceStore> {
        &self.stores.resources
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.stores.settings
    }

    pub fn enricher(&self) -> Option<&Arc<dyn Enricher>> {
        self.enricher.as_ref()
    }

    /// Serializes full saves across editors of this session.
    pub(crate) fn save_lock(&self) -> &Mutex<()> {
        &self.save_lock
    }
}

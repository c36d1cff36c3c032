//! Folder model used to resolve a note's parent container.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// Folder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub title: String,
    /// Parent folder for nested folders.
    pub parent_id: Option<FolderId>,
    /// Unix epoch milliseconds.
    pub created_time: i64,
    /// Unix epoch milliseconds.
    pub updated_time: i64,
}

impl Folder {
    /// Creates a top-level folder with a fresh id and zero timestamps.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            parent_id: None,
            created_time: 0,
            updated_time: 0,
        }
    }
}

/// Finds one folder in an already loaded list.
pub fn folder_by_id(folders: &[Folder], id: FolderId) -> Option<&Folder> {
    folders.iter().find(|folder| folder.id == id)
}

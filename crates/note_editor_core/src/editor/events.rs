//! Notifications published by editor surfaces.

use crate::model::note::{Note, NoteId};

/// Event delivered to `NoteEditor::subscribe` receivers.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A new note received its storage id; hosts usually select it.
    NoteCreated { id: NoteId },
    /// Timestamps or location of the live note changed.
    MetadataRefreshed(NoteMetadata),
}

/// Display metadata of the live note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMetadata {
    pub id: Option<NoteId>,
    pub created_time: Option<i64>,
    pub updated_time: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

impl NoteMetadata {
    pub fn of(note: &Note) -> Self {
        Self {
            id: note.id,
            created_time: note.created_time,
            updated_time: note.updated_time,
            latitude: note.latitude,
            longitude: note.longitude,
            altitude: note.altitude,
        }
    }

    /// `"lat, long"` with six decimals, when both are known.
    pub fn location_label(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(format!("{latitude:.6}, {longitude:.6}")),
            _ => None,
        }
    }
}

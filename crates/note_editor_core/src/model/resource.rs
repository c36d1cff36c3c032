//! Resource (attachment) model.
//!
//! # Responsibility
//! - Describe attachments referenced from note bodies.
//! - Carry the local download state editors display next to them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable resource identifier.
pub type ResourceId = Uuid;

/// Resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub title: String,
    pub mime: String,
    pub file_extension: String,
    /// Blob size in bytes, `-1` when unknown.
    pub size: i64,
    pub created_time: i64,
    pub updated_time: i64,
}

/// Local blob fetch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Started,
    Done,
    Error,
}

impl FetchStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Started => 1,
            Self::Done => 2,
            Self::Error => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Started),
            2 => Some(Self::Done),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Local state of one resource blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocalState {
    pub fetch_status: FetchStatus,
    /// Last fetch error, if any.
    pub fetch_error: Option<String>,
}

impl Default for ResourceLocalState {
    fn default() -> Self {
        Self {
            fetch_status: FetchStatus::Idle,
            fetch_error: None,
        }
    }
}

/// Resource attached to the note currently shown by an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedResource {
    pub item: Resource,
    pub local_state: ResourceLocalState,
}

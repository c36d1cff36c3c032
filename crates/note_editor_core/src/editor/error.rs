//! Editor error type.

use crate::model::note::{NoteFieldError, NoteId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by editor operations.
///
/// Races (note deleted or replaced mid-save) and unresolved folders are not
/// errors; they are reported through `SaveOutcome`.
#[derive(Debug)]
pub enum EditorError {
    /// Storage failure, including user-correctable validation failures.
    Repo(RepoError),
    /// Rejected field assignment.
    Field(NoteFieldError),
    /// Note requested by an open/load does not exist.
    NoteNotFound(NoteId),
    /// Operation needs a live note but the slot is empty.
    NoNoteLoaded,
}

impl EditorError {
    /// Whether the user can fix this by changing field values.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Validation(_)) | Self::Field(_))
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Field(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::NoNoteLoaded => write!(f, "editor has no note loaded"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Field(err) => Some(err),
            Self::NoteNotFound(_) | Self::NoNoteLoaded => None,
        }
    }
}

impl From<RepoError> for EditorError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<NoteFieldError> for EditorError {
    fn from(value: NoteFieldError) -> Self {
        Self::Field(value)
    }
}

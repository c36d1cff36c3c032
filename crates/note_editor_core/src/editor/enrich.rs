//! Late enrichment of newly created notes.
//!
//! # Responsibility
//! - Define the enrichment contract and the geolocation implementation.
//! - Run one enrichment task per created note and merge its patch into the
//!   live note when it is still the same note.
//!
//! # Invariants
//! - Enrichment never takes the save lock.
//! - A patch for a note that is no longer live is dropped.
//! - Enrichment failures are logged and dropped; they never reach the caller
//!   of `attempt_save`.

use crate::editor::error::EditorResult;
use crate::editor::events::{EditorEvent, NoteMetadata};
use crate::editor::NoteEditor;
use crate::model::note::{NoteField, NoteFieldError, NoteId, NotePatch};
use crate::repo::note_repo::{NoteStore, SaveOptions};
use crate::repo::settings_repo::{setting_enabled, Settings, TRACK_LOCATION_KEY};
use crate::repo::RepoError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Errors raised while computing enrichment data.
#[derive(Debug)]
pub enum EnrichError {
    /// Location provider failed or is unavailable.
    Location(String),
    Repo(RepoError),
    Field(NoteFieldError),
}

impl Display for EnrichError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Location(message) => write!(f, "location unavailable: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Field(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EnrichError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Location(_) => None,
            Self::Repo(err) => Some(err),
            Self::Field(err) => Some(err),
        }
    }
}

impl From<RepoError> for EnrichError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<NoteFieldError> for EnrichError {
    fn from(value: NoteFieldError) -> Self {
        Self::Field(value)
    }
}

/// Computes derived fields for a freshly created note.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns the fields to merge, or `None` when there is nothing to add.
    async fn enrich(&self, id: NoteId) -> Result<Option<NotePatch>, EnrichError>;
}

/// Geographic position in decimal degrees (altitude in metres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Source of the current device position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self) -> Result<Location, EnrichError>;
}

/// Location source that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_location(&self) -> Result<Location, EnrichError> {
        Ok(self.0)
    }
}

/// Stamps new notes with the current location when `trackLocation` is on.
///
/// The location fields are persisted here; the returned patch only updates
/// editor state.
pub struct GeolocationEnricher {
    notes: Arc<dyn NoteStore>,
    settings: Arc<dyn Settings>,
    source: Arc<dyn LocationSource>,
}

impl GeolocationEnricher {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        settings: Arc<dyn Settings>,
        source: Arc<dyn LocationSource>,
    ) -> Self {
        Self {
            notes,
            settings,
            source,
        }
    }
}

#[async_trait]
impl Enricher for GeolocationEnricher {
    async fn enrich(&self, id: NoteId) -> Result<Option<NotePatch>, EnrichError> {
        let tracking = self.settings.get_value(TRACK_LOCATION_KEY).await?;
        if !setting_enabled(tracking.as_deref()) {
            return Ok(None);
        }

        let location = self.source.current_location().await?;
        let Some(note) = self.notes.load(id).await? else {
            return Ok(None);
        };

        let mut patch = NotePatch::new()
            .with(NoteField::Latitude, location.latitude)
            .with(NoteField::Longitude, location.longitude);
        if let Some(altitude) = location.altitude {
            patch.insert(NoteField::Altitude, altitude);
        }

        let located = patch.apply_to(&note)?;
        self.notes
            .save(&located, &SaveOptions::only(patch.field_names()))
            .await?;
        Ok(Some(patch))
    }
}

impl NoteEditor {
    /// Starts the session enricher for `id` on the current tokio runtime.
    ///
    /// Returns `None` when no enricher is configured or no runtime is
    /// available.
    pub(crate) fn spawn_enrichment(self: &Arc<Self>, id: NoteId) -> Option<JoinHandle<()>> {
        let enricher = self.session.enricher()?.clone();
        let Ok(runtime) = Handle::try_current() else {
            warn!("event=note_enrich module=editor status=skip reason=no_runtime note_id={id}");
            return None;
        };
        let editor = Arc::downgrade(self);

        Some(runtime.spawn(async move {
            let patch = match enricher.enrich(id).await {
                Ok(Some(patch)) if !patch.is_empty() => patch,
                Ok(_) => {
                    debug!("event=note_enrich module=editor status=skip reason=empty note_id={id}");
                    return;
                }
                Err(err) => {
                    warn!("event=note_enrich module=editor status=error note_id={id} error={err}");
                    return;
                }
            };
            let Some(editor) = editor.upgrade() else {
                return;
            };
            if let Err(err) = editor.merge_enrichment(id, &patch) {
                warn!("event=note_enrich module=editor status=error note_id={id} error={err}");
            }
        }))
    }

    /// Merges an enrichment patch computed for `id`.
    ///
    /// Returns `false` when the live note is no longer `id`.
    pub fn merge_enrichment(&self, id: NoteId, patch: &NotePatch) -> EditorResult<bool> {
        let metadata = {
            let mut state = self.lock_state();
            let Some(live) = state.note.as_ref().filter(|note| note.id == Some(id)) else {
                info!("event=note_enrich module=editor status=skip reason=stale note_id={id}");
                return Ok(false);
            };
            let next = patch.apply_to(live)?;
            let next_saved = match state.last_saved.as_ref() {
                Some(previous) => Some(patch.apply_to(previous)?),
                None => None,
            };
            let metadata = NoteMetadata::of(&next);
            state.note = Some(next);
            state.last_saved = next_saved;
            metadata
        };

        self.emit(EditorEvent::MetadataRefreshed(metadata));
        info!(
            "event=note_enrich module=editor status=ok note_id={} fields={}",
            id,
            patch.len()
        );
        Ok(true)
    }
}

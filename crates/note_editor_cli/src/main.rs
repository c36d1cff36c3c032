//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one create-then-edit editor cycle against an in-memory database.
//! - Keep output deterministic apart from generated ids.

use note_editor_core::db::{open_db_in_memory, SharedConnection};
use note_editor_core::repo::folder_repo::SqliteFolderStore;
use note_editor_core::repo::settings_repo::{SqliteSettingsStore, TRACK_LOCATION_KEY};
use note_editor_core::{
    EditorOptions, EditorSession, FixedLocation, GeolocationEnricher, Location, NewNote,
    NoteEditor, NoteField, OpenTarget, SaveOutcome, SessionStores,
};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("note_editor_core version={}", note_editor_core::core_version());

    let conn = SharedConnection::new(open_db_in_memory()?);
    let folder = SqliteFolderStore::try_new(conn.clone())?.create_folder("Inbox")?;
    SqliteSettingsStore::try_new(conn.clone())?.set_value(TRACK_LOCATION_KEY, "true")?;

    let stores = SessionStores::sqlite(conn)?;
    let enricher = GeolocationEnricher::new(
        stores.notes.clone(),
        stores.settings.clone(),
        Arc::new(FixedLocation(Location {
            latitude: 0.0,
            longitude: 0.0,
            altitude: None,
        })),
    );
    let session = Arc::new(EditorSession::new(stores).with_enricher(Arc::new(enricher)));

    let editor = NoteEditor::open(
        session,
        OpenTarget::New(NewNote::default()),
        EditorOptions::default(),
    )
    .await?;
    editor.change_field(NoteField::Body, "# Smoke test\nwritten by the CLI")?;

    match editor.attempt_save(None).await? {
        SaveOutcome::Saved(report) => {
            if let Some(enrichment) = report.enrichment {
                enrichment.await?;
            }
            println!(
                "saved note_id={} created={} folder={}",
                report.note_id, report.created, folder.title
            );
        }
        SaveOutcome::Skipped(reason) => println!("save skipped reason={reason:?}"),
    }

    let state = editor.snapshot();
    if let Some(note) = state.note {
        println!(
            "title={:?} located={} modified={}",
            note.title,
            note.latitude.is_some(),
            editor.is_modified()
        );
    }
    Ok(())
}

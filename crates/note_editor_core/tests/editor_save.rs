use async_trait::async_trait;
use note_editor_core::db::{open_db_in_memory, SharedConnection};
use note_editor_core::model::note::NoteValidationError;
use note_editor_core::repo::folder_repo::SqliteFolderStore;
use note_editor_core::repo::note_repo::{NoteStore, SaveOptions, SqliteNoteStore};
use note_editor_core::repo::resource_repo::SqliteResourceStore;
use note_editor_core::repo::settings_repo::{SqliteSettingsStore, ACTIVE_FOLDER_ID_KEY};
use note_editor_core::{
    EditorError, EditorEvent, EditorOptions, EditorSession, NewNote, Note, NoteEditor, NoteField,
    OpenTarget, RepoError, RepoResult, SaveOutcome, SaveReport, SessionStores, SkipReason,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Note store that can hold `save` until the test releases it.
struct GatedNoteStore {
    inner: SqliteNoteStore,
    gated: AtomicBool,
    saves: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl NoteStore for GatedNoteStore {
    async fn exists(&self, id: Uuid) -> RepoResult<bool> {
        self.inner.exists(id).await
    }

    async fn load(&self, id: Uuid) -> RepoResult<Option<Note>> {
        self.inner.load(id).await
    }

    async fn save(&self, note: &Note, options: &SaveOptions) -> RepoResult<Note> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.save(note, options).await
    }
}

struct Fixture {
    notes: SqliteNoteStore,
    folders: SqliteFolderStore,
    settings: SqliteSettingsStore,
    gate: Arc<GatedNoteStore>,
    session: Arc<EditorSession>,
}

fn fixture() -> Fixture {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let notes = SqliteNoteStore::try_new(conn.clone()).unwrap();
    let folders = SqliteFolderStore::try_new(conn.clone()).unwrap();
    let settings = SqliteSettingsStore::try_new(conn.clone()).unwrap();
    let gate = Arc::new(GatedNoteStore {
        inner: notes.clone(),
        gated: AtomicBool::new(false),
        saves: AtomicUsize::new(0),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let stores = SessionStores {
        notes: gate.clone(),
        folders: Arc::new(folders.clone()),
        resources: Arc::new(SqliteResourceStore::try_new(conn).unwrap()),
        settings: Arc::new(settings.clone()),
    };
    Fixture {
        notes,
        folders,
        settings,
        gate,
        session: Arc::new(EditorSession::new(stores)),
    }
}

async fn open_new(fixture: &Fixture, body: &str) -> Arc<NoteEditor> {
    NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::New(NewNote {
            body: body.to_string(),
            ..NewNote::default()
        }),
        EditorOptions::default(),
    )
    .await
    .unwrap()
}

/// Lets every other ready task on the test runtime make progress.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn saved(outcome: SaveOutcome) -> SaveReport {
    match outcome {
        SaveOutcome::Saved(report) => report,
        SaveOutcome::Skipped(reason) => panic!("save skipped: {reason:?}"),
    }
}

#[tokio::test]
async fn first_save_creates_note_in_default_folder() {
    let fixture = fixture();
    let folder = fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "").await;
    let mut events = editor.subscribe();

    editor.change_field(NoteField::Body, "Hello").unwrap();
    assert!(editor.is_modified());

    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(report.created);
    assert!(report.persisted);
    assert!(report.auto_titled);
    assert_eq!(report.fields, None);

    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Hello");
    assert_eq!(stored.body, "Hello");
    assert_eq!(stored.parent_id, Some(folder.id));

    let state = editor.snapshot();
    assert_eq!(state.note.as_ref(), Some(&stored));
    assert_eq!(state.last_saved.as_ref(), Some(&stored));
    assert_eq!(state.auto_title_note_id, Some(report.note_id));
    assert_eq!(state.folder.map(|folder| folder.id), Some(folder.id));
    assert!(!editor.is_modified());

    assert_eq!(
        events.try_recv().unwrap(),
        EditorEvent::NoteCreated {
            id: report.note_id
        }
    );
    assert!(matches!(
        events.try_recv().unwrap(),
        EditorEvent::MetadataRefreshed(metadata) if metadata.id == Some(report.note_id)
    ));
}

#[tokio::test]
async fn reopened_note_round_trips_unmodified() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "round trip").await;
    assert!(!editor.is_modified());
    let report = saved(editor.attempt_save(None).await.unwrap());

    let reopened = NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::Existing {
            id: report.note_id,
            provisional: false,
        },
        EditorOptions::default(),
    )
    .await
    .unwrap();
    let state = reopened.snapshot();
    assert_eq!(state.note, editor.snapshot().last_saved);
    assert_eq!(state.auto_title_note_id, None);
    assert!(!reopened.is_modified());
}

#[tokio::test]
async fn update_writes_only_changed_fields() {
    let fixture = fixture();
    let folder = fixture.folders.create_folder("Inbox").unwrap();
    let stored = fixture
        .notes
        .save(
            &Note {
                title: "Groceries".to_string(),
                body: "milk".to_string(),
                ..Note::new_in(Some(folder.id))
            },
            &SaveOptions::default(),
        )
        .await
        .unwrap();
    let editor = NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::Existing {
            id: stored.id.unwrap(),
            provisional: false,
        },
        EditorOptions::default(),
    )
    .await
    .unwrap();

    editor.change_field(NoteField::Body, "milk, eggs").unwrap();
    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(!report.created);
    assert!(!report.auto_titled);
    assert_eq!(report.fields, Some(vec![NoteField::Body]));

    let loaded = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Groceries");
    assert_eq!(loaded.body, "milk, eggs");
    assert!(!editor.is_modified());
}

#[tokio::test]
async fn unchanged_note_skips_storage() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::New(NewNote {
            title: "Fixed".to_string(),
            body: "same".to_string(),
            ..NewNote::default()
        }),
        EditorOptions::default(),
    )
    .await
    .unwrap();
    let first = saved(editor.attempt_save(None).await.unwrap());
    assert!(!first.auto_titled);
    let before = editor.snapshot().note.unwrap();

    let second = saved(editor.attempt_save(None).await.unwrap());
    assert_eq!(second.note_id, first.note_id);
    assert!(!second.persisted);
    assert_eq!(second.fields, Some(Vec::new()));
    assert_eq!(editor.snapshot().note.unwrap().updated_time, before.updated_time);
}

#[tokio::test]
async fn concurrent_saves_create_a_single_note() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "twice").await;

    fixture.gate.gated.store(true, Ordering::SeqCst);
    let first = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.attempt_save(None).await })
    };
    fixture.gate.entered.notified().await;
    let second = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.attempt_save(None).await })
    };
    settle().await;
    assert_eq!(fixture.gate.saves.load(Ordering::SeqCst), 1);
    assert!(!second.is_finished());

    fixture.gate.gated.store(false, Ordering::SeqCst);
    fixture.gate.release.notify_one();
    let first = saved(first.await.unwrap().unwrap());
    let second = saved(second.await.unwrap().unwrap());

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.note_id, second.note_id);
    assert_eq!(fixture.gate.saves.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.notes.count().unwrap(), 1);
}

#[tokio::test]
async fn deleted_note_is_recreated_on_save() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "first").await;
    let original = saved(editor.attempt_save(None).await.unwrap()).note_id;

    assert!(fixture.notes.delete(original).unwrap());
    editor.change_field(NoteField::Body, "second").unwrap();
    let report = saved(editor.attempt_save(None).await.unwrap());

    assert!(report.created);
    assert_ne!(report.note_id, original);
    assert_eq!(fixture.notes.count().unwrap(), 1);
    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.body, "second");
    assert_eq!(editor.snapshot().note_id(), Some(report.note_id));
}

#[tokio::test]
async fn body_typed_during_save_survives() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "Hello").await;

    fixture.gate.gated.store(true, Ordering::SeqCst);
    let in_flight = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.attempt_save(None).await })
    };
    fixture.gate.entered.notified().await;
    editor.change_field(NoteField::Body, "Hello world").unwrap();
    fixture.gate.gated.store(false, Ordering::SeqCst);
    fixture.gate.release.notify_one();

    let report = saved(in_flight.await.unwrap().unwrap());
    let state = editor.snapshot();
    let live = state.note.as_ref().unwrap();
    assert_eq!(live.id, Some(report.note_id));
    assert_eq!(live.body, "Hello world");
    assert_eq!(live.title, "Hello");
    assert_eq!(state.last_saved.as_ref().unwrap().body, "Hello");
    assert!(editor.is_modified());

    let follow_up = saved(editor.attempt_save(None).await.unwrap());
    assert!(!follow_up.created);
    let fields = follow_up.fields.unwrap();
    assert!(fields.contains(&NoteField::Body));
    assert!(fields.contains(&NoteField::Title));
    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.body, "Hello world");
    assert_eq!(stored.title, "Hello world");
    assert!(!editor.is_modified());
}

#[tokio::test]
async fn save_completing_after_reload_is_superseded() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "draft").await;

    fixture.gate.gated.store(true, Ordering::SeqCst);
    let in_flight = {
        let editor = editor.clone();
        tokio::spawn(async move { editor.attempt_save(None).await })
    };
    fixture.gate.entered.notified().await;
    editor
        .load_note(OpenTarget::New(NewNote::default()))
        .await
        .unwrap();
    fixture.gate.gated.store(false, Ordering::SeqCst);
    fixture.gate.release.notify_one();

    let outcome = in_flight.await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        SaveOutcome::Skipped(SkipReason::Superseded)
    ));
    assert_eq!(fixture.notes.count().unwrap(), 1);
    let state = editor.snapshot();
    assert_eq!(state.note_id(), None);
    assert_eq!(state.note.unwrap().body, "");
    assert_eq!(state.generation, 1);
}

#[tokio::test]
async fn user_title_disables_auto_title() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "Hello").await;
    let id = saved(editor.attempt_save(None).await.unwrap()).note_id;

    editor.change_field(NoteField::Title, "Mine").unwrap();
    editor.change_field(NoteField::Body, "Changed").unwrap();
    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(!report.auto_titled);

    let stored = fixture.notes.load(id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Mine");
    assert_eq!(editor.snapshot().auto_title_note_id, None);
}

#[tokio::test]
async fn auto_title_option_off_keeps_empty_title() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::New(NewNote {
            body: "Hello".to_string(),
            ..NewNote::default()
        }),
        EditorOptions { auto_title: false },
    )
    .await
    .unwrap();

    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(!report.auto_titled);
    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.title, "");
    assert_eq!(editor.snapshot().auto_title_note_id, None);
}

#[tokio::test]
async fn provisional_note_keeps_deriving_its_title() {
    let fixture = fixture();
    let folder = fixture.folders.create_folder("Inbox").unwrap();
    let stored = fixture
        .notes
        .save(&Note::new_in(Some(folder.id)), &SaveOptions::default())
        .await
        .unwrap();
    let id = stored.id.unwrap();
    let editor = NoteEditor::open(
        fixture.session.clone(),
        OpenTarget::Existing {
            id,
            provisional: true,
        },
        EditorOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(editor.snapshot().auto_title_note_id, Some(id));

    editor.change_field(NoteField::Body, "Shopping list").unwrap();
    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(report.auto_titled);
    assert_eq!(
        report.fields,
        Some(vec![NoteField::Body, NoteField::Title])
    );
    let loaded = fixture.notes.load(id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Shopping list");
}

#[tokio::test]
async fn active_folder_setting_wins_over_default() {
    let fixture = fixture();
    let active = fixture.folders.create_folder("Active").unwrap();
    fixture.folders.create_folder("Other").unwrap();
    fixture
        .settings
        .set_value(ACTIVE_FOLDER_ID_KEY, &active.id.to_string())
        .unwrap();
    let editor = open_new(&fixture, "where").await;

    let report = saved(editor.attempt_save(None).await.unwrap());
    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, Some(active.id));
}

#[tokio::test]
async fn explicit_folder_is_used() {
    let fixture = fixture();
    fixture.folders.create_folder("Default").unwrap();
    let chosen = fixture.folders.create_folder("Chosen").unwrap();
    let editor = open_new(&fixture, "here").await;

    let report = saved(editor.attempt_save(Some(chosen.id)).await.unwrap());
    let stored = fixture.notes.load(report.note_id).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, Some(chosen.id));
}

#[tokio::test]
async fn save_without_any_folder_is_skipped() {
    let fixture = fixture();
    let editor = open_new(&fixture, "homeless").await;

    let outcome = editor.attempt_save(None).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Skipped(SkipReason::NoFolder)));
    assert_eq!(fixture.notes.count().unwrap(), 0);
    assert_eq!(editor.snapshot().note_id(), None);
}

#[tokio::test]
async fn validation_error_leaves_state_and_releases_lock() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let editor = open_new(&fixture, "somewhere").await;
    editor.change_field(NoteField::Latitude, 120.0).unwrap();
    let before = editor.snapshot();

    let err = editor.attempt_save(None).await.unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(
        err,
        EditorError::Repo(RepoError::Validation(NoteValidationError::LatitudeOutOfRange(_)))
    ));
    assert_eq!(editor.snapshot(), before);

    editor.change_field(NoteField::Latitude, 45.0).unwrap();
    let report = saved(editor.attempt_save(None).await.unwrap());
    assert!(report.created);
    assert_eq!(fixture.notes.count().unwrap(), 1);
}

#[tokio::test]
async fn editors_of_one_session_share_the_save_lock() {
    let fixture = fixture();
    fixture.folders.create_folder("Inbox").unwrap();
    let left = open_new(&fixture, "left").await;
    let right = open_new(&fixture, "right").await;

    fixture.gate.gated.store(true, Ordering::SeqCst);
    let held = tokio::spawn(async move { left.attempt_save(None).await });
    fixture.gate.entered.notified().await;
    let waiting = tokio::spawn(async move { right.attempt_save(None).await });
    settle().await;
    assert_eq!(fixture.gate.saves.load(Ordering::SeqCst), 1);
    assert!(!waiting.is_finished());

    fixture.gate.gated.store(false, Ordering::SeqCst);
    fixture.gate.release.notify_one();
    let a = saved(held.await.unwrap().unwrap());
    let b = saved(waiting.await.unwrap().unwrap());
    assert_ne!(a.note_id, b.note_id);
    assert_eq!(fixture.notes.count().unwrap(), 2);
}

#[tokio::test]
async fn moving_a_saved_note_updates_its_folder() {
    let fixture = fixture();
    let inbox = fixture.folders.create_folder("Inbox").unwrap();
    let work = fixture.folders.create_folder("Work").unwrap();
    let editor = open_new(&fixture, "meeting notes").await;

    let first = saved(editor.attempt_save(Some(inbox.id)).await.unwrap());
    assert_eq!(editor.snapshot().folder, Some(inbox));

    let moved = saved(editor.attempt_save(Some(work.id)).await.unwrap());
    assert_eq!(moved.note_id, first.note_id);
    assert!(!moved.created);
    assert!(moved.fields.unwrap().contains(&NoteField::ParentId));

    let stored = fixture.notes.load(first.note_id).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, Some(work.id));
    let state = editor.snapshot();
    assert_eq!(state.note.unwrap().parent_id, Some(work.id));
    assert_eq!(state.folder, Some(work));
}

use note_editor_core::db::{open_db_in_memory, SharedConnection};
use note_editor_core::model::resource::{FetchStatus, Resource, ResourceLocalState};
use note_editor_core::repo::folder_repo::SqliteFolderStore;
use note_editor_core::repo::resource_repo::SqliteResourceStore;
use note_editor_core::{
    EditorError, EditorOptions, EditorSession, NewNote, NoteEditor, NoteField, OpenTarget,
    SessionStores,
};
use std::sync::Arc;
use uuid::Uuid;

fn image(title: &str) -> Resource {
    Resource {
        id: Uuid::new_v4(),
        title: title.to_string(),
        mime: "image/jpeg".to_string(),
        file_extension: "jpg".to_string(),
        size: 2048,
        created_time: 1,
        updated_time: 1,
    }
}

#[tokio::test]
async fn open_loads_folder_and_linked_resources() {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let folder = SqliteFolderStore::try_new(conn.clone())
        .unwrap()
        .create_folder("Trips")
        .unwrap();
    let resources = SqliteResourceStore::try_new(conn.clone()).unwrap();
    let beach = image("beach");
    let hotel = image("hotel");
    resources.create_resource(&beach).unwrap();
    resources.create_resource(&hotel).unwrap();
    resources
        .set_local_state(
            hotel.id,
            &ResourceLocalState {
                fetch_status: FetchStatus::Done,
                fetch_error: None,
            },
        )
        .unwrap();
    let session = Arc::new(EditorSession::new(SessionStores::sqlite(conn).unwrap()));

    let editor = NoteEditor::open(
        session,
        OpenTarget::New(NewNote {
            parent_id: Some(folder.id),
            body: format!("![beach](:/{})", beach.id.simple()),
            ..NewNote::default()
        }),
        EditorOptions::default(),
    )
    .await
    .unwrap();
    let state = editor.snapshot();
    assert_eq!(state.folder, Some(folder));
    assert_eq!(state.resources.len(), 1);
    assert_eq!(state.resources[0].item, beach);

    let body = format!(
        "![hotel](:/{})\n![beach](:/{})\n[gone](:/{})",
        hotel.id.simple(),
        beach.id.simple(),
        Uuid::new_v4().simple()
    );
    editor.change_field(NoteField::Body, body).unwrap();
    assert_eq!(editor.refresh_resources().await.unwrap(), 2);

    let state = editor.snapshot();
    assert_eq!(state.resources[0].item.id, hotel.id);
    assert_eq!(state.resources[0].local_state.fetch_status, FetchStatus::Done);
    assert_eq!(state.resources[1].item.id, beach.id);
}

#[tokio::test]
async fn open_with_unknown_folder_has_no_folder() {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let session = Arc::new(EditorSession::new(SessionStores::sqlite(conn).unwrap()));

    let editor = NoteEditor::open(
        session,
        OpenTarget::New(NewNote {
            parent_id: Some(Uuid::new_v4()),
            ..NewNote::default()
        }),
        EditorOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(editor.snapshot().folder, None);
    assert!(!editor.is_modified());
    assert!(matches!(
        editor.change_field(NoteField::Id, "x"),
        Err(EditorError::Field(_))
    ));
}

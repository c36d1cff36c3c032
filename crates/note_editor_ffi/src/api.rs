//! FFI editor API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose editor surfaces to Dart via FRB as integer handles.
//! - Drive async core operations on one process-wide tokio runtime.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every editor of the process shares one session, hence one save lock.
//! - Unknown handles are reported as failures, never as panics.

use log::warn;
use note_editor_core::db::open_db;
use note_editor_core::repo::folder_repo::SqliteFolderStore;
use note_editor_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, EditorOptions,
    EditorSession, NewNote, NoteEditor, NoteField, OpenTarget, SaveOutcome, SessionStores,
    SharedConnection, SkipReason,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

const DB_FILE_NAME: &str = "note_editor.sqlite3";
const DB_PATH_ENV: &str = "NOTE_EDITOR_DB_PATH";
const TEXT_FIELDS: [NoteField; 4] = [
    NoteField::Title,
    NoteField::Body,
    NoteField::SourceUrl,
    NoteField::Author,
];

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static RUNTIME: OnceLock<Runtime> = OnceLock::new();
static CONTEXT: OnceLock<FfiContext> = OnceLock::new();
static EDITORS: OnceLock<Mutex<HashMap<u64, Arc<NoteEditor>>>> = OnceLock::new();
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

struct FfiContext {
    conn: SharedConnection,
    session: Arc<EditorSession>,
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Idempotent for the same arguments; returns an error message otherwise.
/// - Returns an empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Response envelope for editor lifecycle and edit calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorActionResponse {
    pub ok: bool,
    /// Editor handle (open calls) or created id (folder calls), when any.
    pub handle: Option<u64>,
    pub id: Option<String>,
    pub message: String,
}

impl EditorActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            handle: None,
            id: None,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            handle: None,
            id: None,
            message: message.into(),
        }
    }
}

/// Response envelope for `editor_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSaveResponse {
    pub ok: bool,
    /// Saved note id.
    pub note_id: Option<String>,
    pub created: bool,
    /// `no_note|no_folder|superseded` when the save was a no-op.
    pub skipped: Option<String>,
    pub message: String,
}

/// Creates a top-level folder.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Returns the folder id in `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn folder_create(title: String) -> EditorActionResponse {
    let result = context().and_then(|ctx| {
        SqliteFolderStore::try_new(ctx.conn.clone())
            .and_then(|store| store.create_folder(title.trim()))
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(folder) => EditorActionResponse {
            id: Some(folder.id.to_string()),
            ..EditorActionResponse::success("Folder created.")
        },
        Err(err) => EditorActionResponse::failure(format!("folder_create failed: {err}")),
    }
}

/// Opens an editor on a new, unsaved note.
///
/// # FFI contract
/// - `parent_id`: optional folder id; otherwise resolved on first save.
/// - Returns the editor handle in `handle`.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open_new(parent_id: Option<String>, body: String) -> EditorActionResponse {
    let parent_id = match parent_id.as_deref().map(parse_id).transpose() {
        Ok(parent_id) => parent_id,
        Err(err) => return EditorActionResponse::failure(format!("editor_open_new failed: {err}")),
    };
    open_editor(
        "editor_open_new",
        OpenTarget::New(NewNote {
            parent_id,
            body,
            ..NewNote::default()
        }),
    )
}

/// Opens an editor on a stored note.
///
/// # FFI contract
/// - `provisional`: note was just created by the UI; its title keeps
///   following the body until edited.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open_existing(note_id: String, provisional: bool) -> EditorActionResponse {
    match parse_id(&note_id) {
        Ok(id) => open_editor(
            "editor_open_existing",
            OpenTarget::Existing { id, provisional },
        ),
        Err(err) => EditorActionResponse::failure(format!("editor_open_existing failed: {err}")),
    }
}

/// Replaces one text field (`title`, `body`, `source_url`, `author`) of the
/// live note. No I/O.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_change_text(handle: u64, field: String, value: String) -> EditorActionResponse {
    let result = editor(handle).and_then(|editor| {
        let field = NoteField::parse(field.trim())
            .filter(|field| TEXT_FIELDS.contains(field))
            .ok_or_else(|| format!("unknown text field `{}`", field.trim()))?;
        editor
            .change_field(field, value)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(()) => EditorActionResponse::success("Field changed."),
        Err(err) => EditorActionResponse::failure(format!("editor_change_text failed: {err}")),
    }
}

/// Marks the live note as a todo (or not) and writes that flag through.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_todo(handle: u64, is_todo: bool) -> EditorActionResponse {
    let result = editor(handle).and_then(|editor| {
        runtime()?
            .block_on(editor.save_property(NoteField::IsTodo, is_todo))
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(outcome) => EditorActionResponse::success(format!("Todo flag {outcome:?}.")),
        Err(err) => EditorActionResponse::failure(format!("editor_set_todo failed: {err}")),
    }
}

/// Saves the live note.
///
/// # FFI contract
/// - Sync call; blocks on the session save lock.
/// - Skipped saves are `ok` with `skipped` set.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_save(handle: u64) -> EditorSaveResponse {
    let result = editor(handle).and_then(|editor| {
        runtime()?
            .block_on(editor.attempt_save(None))
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(SaveOutcome::Saved(report)) => EditorSaveResponse {
            ok: true,
            note_id: Some(report.note_id.to_string()),
            created: report.created,
            skipped: None,
            message: if report.created {
                "Note created.".to_string()
            } else {
                "Note saved.".to_string()
            },
        },
        Ok(SaveOutcome::Skipped(reason)) => EditorSaveResponse {
            ok: true,
            note_id: None,
            created: false,
            skipped: Some(skip_label(reason).to_string()),
            message: "Nothing saved.".to_string(),
        },
        Err(err) => EditorSaveResponse {
            ok: false,
            note_id: None,
            created: false,
            skipped: None,
            message: format!("editor_save failed: {err}"),
        },
    }
}

/// Whether the live note has unsaved changes. Unknown handles report `false`.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_is_modified(handle: u64) -> bool {
    editor(handle).is_ok_and(|editor| editor.is_modified())
}

/// Drops an editor handle. Returns whether it existed.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_close(handle: u64) -> bool {
    editors()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&handle)
        .is_some()
}

fn open_editor(call: &str, target: OpenTarget) -> EditorActionResponse {
    let result = context().and_then(|ctx| {
        runtime()?
            .block_on(NoteEditor::open(
                ctx.session.clone(),
                target,
                EditorOptions::default(),
            ))
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(editor) => {
            let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            editors()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(handle, editor);
            EditorActionResponse {
                handle: Some(handle),
                ..EditorActionResponse::success("Editor opened.")
            }
        }
        Err(err) => EditorActionResponse::failure(format!("{call} failed: {err}")),
    }
}

fn editor(handle: u64) -> Result<Arc<NoteEditor>, String> {
    editors()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&handle)
        .cloned()
        .ok_or_else(|| format!("unknown editor handle {handle}"))
}

fn editors() -> &'static Mutex<HashMap<u64, Arc<NoteEditor>>> {
    EDITORS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn runtime() -> Result<&'static Runtime, String> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime start failed: {err}"))?;
    // A concurrent caller may have won; its runtime is kept.
    let _ = RUNTIME.set(runtime);
    RUNTIME
        .get()
        .ok_or_else(|| "runtime unavailable".to_string())
}

fn context() -> Result<&'static FfiContext, String> {
    if let Some(ctx) = CONTEXT.get() {
        return Ok(ctx);
    }
    let db_path = resolve_db_path();
    let conn = open_db(&db_path)
        .map(SharedConnection::new)
        .map_err(|err| format!("editor DB open failed: {err}"))?;
    let stores = SessionStores::sqlite(conn.clone())
        .map_err(|err| format!("editor stores init failed: {err}"))?;
    if CONTEXT
        .set(FfiContext {
            conn,
            session: Arc::new(EditorSession::new(stores)),
        })
        .is_err()
    {
        warn!("event=ffi_context module=ffi status=skip reason=already_initialized");
    }
    CONTEXT
        .get()
        .ok_or_else(|| "editor context unavailable".to_string())
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid id `{}`", raw.trim()))
}

fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoNote => "no_note",
        SkipReason::NoFolder => "no_folder",
        SkipReason::Superseded => "superseded",
    }
}

//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes with full or partial (field-list) writes.
//! - Assign ids and timestamps on behalf of callers.
//!
//! # Invariants
//! - `save` returns the full note passed in, with storage-assigned fields
//!   populated, even when only a field subset was written.
//! - Every write bumps `updated_time`; `user_updated_time` too unless the
//!   caller lists it explicitly.
//! - `id` and `type_` are never written through a field list.

use crate::db::SharedConnection;
use crate::model::note::{FieldValue, Note, NoteField, NoteId, NoteValidationError};
use crate::repo::{
    ensure_connection_ready, id_to_db, now_ms, parse_opt_uuid, parse_uuid, RepoError, RepoResult,
};
use async_trait::async_trait;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    parent_id,
    title,
    body,
    created_time,
    updated_time,
    user_created_time,
    user_updated_time,
    latitude,
    longitude,
    altitude,
    is_todo,
    todo_due,
    todo_completed,
    source_url,
    author
FROM notes";

/// Options for one `NoteStore::save` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// When set, only these fields are written for an existing note.
    pub fields: Option<Vec<NoteField>>,
    /// Run checks that need storage access (parent folder exists).
    pub user_side_validation: bool,
}

impl SaveOptions {
    /// Restricts the write to `fields`.
    pub fn only(fields: Vec<NoteField>) -> Self {
        Self {
            fields: Some(fields),
            user_side_validation: false,
        }
    }
}

/// Storage contract consumed by editor surfaces.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn exists(&self, id: NoteId) -> RepoResult<bool>;
    async fn load(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Creates (`id == None`) or updates one note.
    async fn save(&self, note: &Note, options: &SaveOptions) -> RepoResult<Note>;
}

/// SQLite-backed note store.
#[derive(Clone)]
pub struct SqliteNoteStore {
    conn: SharedConnection,
}

impl SqliteNoteStore {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_connection_ready(&*conn.lock()?, &["notes", "folders"])?;
        Ok(Self { conn })
    }

    /// Hard-deletes one note. Returns whether a row was removed.
    pub fn delete(&self, id: NoteId) -> RepoResult<bool> {
        let conn = self.conn.lock()?;
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1;", [id_to_db(id)])?;
        Ok(changed > 0)
    }

    /// Counts stored notes.
    pub fn count(&self) -> RepoResult<u64> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self.conn.lock()?;
        f(&conn)
    }
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn exists(&self, id: NoteId) -> RepoResult<bool> {
        self.with_conn(|conn| note_exists(conn, id))
    }

    async fn load(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.with_conn(|conn| load_note(conn, id))
    }

    async fn save(&self, note: &Note, options: &SaveOptions) -> RepoResult<Note> {
        self.with_conn(|conn| save_note(conn, note, options))
    }
}

fn save_note(conn: &Connection, note: &Note, options: &SaveOptions) -> RepoResult<Note> {
    match (note.id, options.fields.as_deref()) {
        (Some(_), Some(fields)) => note.validate_fields(fields)?,
        _ => note.validate()?,
    }
    let now = now_ms();
    let mut saved = note.clone();

    let Some(id) = note.id else {
        saved.id = Some(Uuid::new_v4());
        stamp_for_insert(&mut saved, now);
        if options.user_side_validation {
            validate_parent_folder(conn, &saved)?;
        }
        insert_note(conn, &saved)?;
        debug!("event=note_store_write module=repo status=ok mode=insert");
        return Ok(saved);
    };

    match options.fields.as_ref() {
        None => {
            if options.user_side_validation {
                validate_parent_folder(conn, &saved)?;
            }
            if note_exists(conn, id)? {
                saved.updated_time = Some(now);
                saved.user_updated_time = Some(now);
                let columns = NoteField::ALL
                    .iter()
                    .copied()
                    .filter(|field| field.is_writable())
                    .collect::<Vec<_>>();
                update_columns(conn, id, &saved, &columns)?;
                debug!("event=note_store_write module=repo status=ok mode=update_all");
            } else {
                stamp_for_insert(&mut saved, now);
                insert_note(conn, &saved)?;
                debug!("event=note_store_write module=repo status=ok mode=insert_with_id");
            }
        }
        Some(fields) => {
            let mut columns = Vec::with_capacity(fields.len() + 2);
            for field in fields {
                if field.is_writable() && !columns.contains(field) {
                    columns.push(*field);
                }
            }
            if options.user_side_validation && columns.contains(&NoteField::ParentId) {
                validate_parent_folder(conn, &saved)?;
            }
            if !columns.contains(&NoteField::UpdatedTime) {
                saved.updated_time = Some(now);
                columns.push(NoteField::UpdatedTime);
            }
            if !columns.contains(&NoteField::UserUpdatedTime) {
                saved.user_updated_time = Some(now);
                columns.push(NoteField::UserUpdatedTime);
            }
            update_columns(conn, id, &saved, &columns)?;
            debug!(
                "event=note_store_write module=repo status=ok mode=update_fields fields={}",
                columns.len()
            );
        }
    }

    Ok(saved)
}

fn stamp_for_insert(note: &mut Note, now: i64) {
    note.created_time.get_or_insert(now);
    note.user_created_time.get_or_insert(now);
    note.updated_time = Some(now);
    note.user_updated_time = Some(now);
}

fn validate_parent_folder(conn: &Connection, note: &Note) -> RepoResult<()> {
    let Some(parent_id) = note.parent_id else {
        return Err(NoteValidationError::MissingParentFolder.into());
    };
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?1);",
        [id_to_db(parent_id)],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(NoteValidationError::ParentFolderNotFound(parent_id).into());
    }
    Ok(())
}

fn insert_note(conn: &Connection, note: &Note) -> RepoResult<()> {
    let id = note
        .id
        .ok_or_else(|| RepoError::InvalidData("cannot insert a note without id".to_string()))?;
    conn.execute(
        "INSERT INTO notes (
            id,
            parent_id,
            title,
            body,
            created_time,
            updated_time,
            user_created_time,
            user_updated_time,
            latitude,
            longitude,
            altitude,
            is_todo,
            todo_due,
            todo_completed,
            source_url,
            author
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
        params![
            id_to_db(id),
            note.parent_id.map(id_to_db),
            note.title.as_str(),
            note.body.as_str(),
            note.created_time,
            note.updated_time,
            note.user_created_time,
            note.user_updated_time,
            note.latitude,
            note.longitude,
            note.altitude,
            i64::from(note.is_todo),
            note.todo_due,
            note.todo_completed,
            note.source_url.as_str(),
            note.author.as_str(),
        ],
    )?;
    Ok(())
}

fn update_columns(
    conn: &Connection,
    id: NoteId,
    note: &Note,
    columns: &[NoteField],
) -> RepoResult<()> {
    let mut assignments = Vec::with_capacity(columns.len());
    let mut bind_values: Vec<Value> = Vec::with_capacity(columns.len() + 1);
    for field in columns {
        assignments.push(format!("{} = ?", field.name()));
        bind_values.push(field_value_to_db(note.get(*field)));
    }
    bind_values.push(Value::Text(id_to_db(id)));

    let sql = format!("UPDATE notes SET {} WHERE id = ?;", assignments.join(", "));
    let changed = conn.execute(&sql, params_from_iter(bind_values))?;
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn field_value_to_db(value: FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Integer(i64::from(flag)),
        FieldValue::Integer(number) => Value::Integer(number),
        FieldValue::Real(number) => Value::Real(number),
        FieldValue::Text(text) => Value::Text(text),
    }
}

fn note_exists(conn: &Connection, id: NoteId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
        [id_to_db(id)],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_note(conn: &Connection, id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id_to_db(id)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_note_row(row)?));
    }
    Ok(None)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let is_todo = match row.get::<_, i64>("is_todo")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_todo value `{other}` in notes.is_todo"
            )));
        }
    };

    Ok(Note {
        id: Some(parse_uuid(&id_text, "notes.id")?),
        parent_id: parse_opt_uuid(row.get("parent_id")?, "notes.parent_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        created_time: row.get("created_time")?,
        updated_time: row.get("updated_time")?,
        user_created_time: row.get("user_created_time")?,
        user_updated_time: row.get("user_updated_time")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        altitude: row.get("altitude")?,
        is_todo,
        todo_due: row.get("todo_due")?,
        todo_completed: row.get("todo_completed")?,
        source_url: row.get("source_url")?,
        author: row.get("author")?,
        ..Note::default()
    })
}

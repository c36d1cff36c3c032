//! Resource store contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve item links found in note bodies to stored ids.
//! - Batch-load attachments together with their local fetch state.
//!
//! # Invariants
//! - `linked_item_ids` keeps first-seen body order and drops ids that do not
//!   resolve to an item of the requested type.
//! - `batch_load_resources` returns resources in request order, skipping
//!   unknown ids.

use crate::db::SharedConnection;
use crate::model::note::{linked_ids_in_body, ItemType};
use crate::model::resource::{
    AttachedResource, FetchStatus, Resource, ResourceId, ResourceLocalState,
};
use crate::repo::{ensure_connection_ready, id_to_db, parse_uuid, RepoError, RepoResult};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use uuid::Uuid;

/// Attachment lookup contract consumed by editor surfaces.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Ids of stored items of `kind` referenced from `body`.
    async fn linked_item_ids(&self, kind: ItemType, body: &str) -> RepoResult<Vec<Uuid>>;
    async fn batch_load_resources(&self, ids: &[ResourceId])
        -> RepoResult<Vec<AttachedResource>>;
}

/// SQLite-backed resource store.
#[derive(Clone)]
pub struct SqliteResourceStore {
    conn: SharedConnection,
}

impl SqliteResourceStore {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_connection_ready(
            &*conn.lock()?,
            &["resources", "resource_local_states", "notes", "folders"],
        )?;
        Ok(Self { conn })
    }

    /// Inserts one resource row with an idle local state.
    pub fn create_resource(&self, resource: &Resource) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO resources (id, title, mime, file_extension, size, created_time, updated_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id_to_db(resource.id),
                resource.title.as_str(),
                resource.mime.as_str(),
                resource.file_extension.as_str(),
                resource.size,
                resource.created_time,
                resource.updated_time,
            ],
        )?;
        conn.execute(
            "INSERT INTO resource_local_states (resource_id, fetch_status, fetch_error)
             VALUES (?1, ?2, NULL);",
            params![id_to_db(resource.id), FetchStatus::Idle.code()],
        )?;
        Ok(())
    }

    /// Replaces the local fetch state of one resource.
    pub fn set_local_state(&self, id: ResourceId, state: &ResourceLocalState) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE resource_local_states
             SET fetch_status = ?2, fetch_error = ?3
             WHERE resource_id = ?1;",
            params![
                id_to_db(id),
                state.fetch_status.code(),
                state.fetch_error.as_deref()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self.conn.lock()?;
        f(&conn)
    }
}

#[async_trait]
impl ResourceStore for SqliteResourceStore {
    async fn linked_item_ids(&self, kind: ItemType, body: &str) -> RepoResult<Vec<Uuid>> {
        let candidates = linked_ids_in_body(body);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                table_for(kind)
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut ids = Vec::new();
            for id in candidates {
                let exists: i64 = stmt.query_row([id_to_db(id)], |row| row.get(0))?;
                if exists == 1 {
                    ids.push(id);
                }
            }
            Ok(ids)
        })
    }

    async fn batch_load_resources(
        &self,
        ids: &[ResourceId],
    ) -> RepoResult<Vec<AttachedResource>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!(
                "SELECT
                    r.id,
                    r.title,
                    r.mime,
                    r.file_extension,
                    r.size,
                    r.created_time,
                    r.updated_time,
                    s.fetch_status,
                    s.fetch_error
                 FROM resources r
                 LEFT JOIN resource_local_states s ON s.resource_id = r.id
                 WHERE r.id IN ({placeholders});"
            );
            let bind_values = ids
                .iter()
                .map(|id| Value::Text(id_to_db(*id)))
                .collect::<Vec<_>>();

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut by_id = HashMap::new();
            while let Some(row) = rows.next()? {
                let attached = parse_attached_row(row)?;
                by_id.insert(attached.item.id, attached);
            }

            Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
        })
    }
}

fn table_for(kind: ItemType) -> &'static str {
    match kind {
        ItemType::Note => "notes",
        ItemType::Folder => "folders",
        ItemType::Resource => "resources",
    }
}

fn parse_attached_row(row: &Row<'_>) -> RepoResult<AttachedResource> {
    let id_text: String = row.get("id")?;
    let status_code: Option<i64> = row.get("fetch_status")?;
    let fetch_status = match status_code {
        None => FetchStatus::Idle,
        Some(code) => FetchStatus::from_code(code).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid fetch status `{code}` in resource_local_states.fetch_status"
            ))
        })?,
    };

    Ok(AttachedResource {
        item: Resource {
            id: parse_uuid(&id_text, "resources.id")?,
            title: row.get("title")?,
            mime: row.get("mime")?,
            file_extension: row.get("file_extension")?,
            size: row.get("size")?,
            created_time: row.get("created_time")?,
            updated_time: row.get("updated_time")?,
        },
        local_state: ResourceLocalState {
            fetch_status,
            fetch_error: row.get("fetch_error")?,
        },
    })
}

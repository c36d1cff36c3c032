//! Folder store contract and SQLite implementation.
//!
//! # Invariants
//! - The default folder is the most recently created one.

use crate::db::SharedConnection;
use crate::model::folder::{Folder, FolderId};
use crate::repo::{
    ensure_connection_ready, id_to_db, now_ms, parse_opt_uuid, parse_uuid, RepoResult,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};

const FOLDER_SELECT_SQL: &str = "SELECT id, title, parent_id, created_time, updated_time FROM folders";

/// Folder resolution contract consumed by editor surfaces.
#[async_trait]
pub trait FolderStore: Send + Sync {
    async fn load_folder(&self, id: FolderId) -> RepoResult<Option<Folder>>;
    /// Fallback folder used when no active folder resolves.
    async fn default_folder(&self) -> RepoResult<Option<Folder>>;
    async fn all_folders(&self) -> RepoResult<Vec<Folder>>;
}

/// SQLite-backed folder store.
#[derive(Clone)]
pub struct SqliteFolderStore {
    conn: SharedConnection,
}

impl SqliteFolderStore {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_connection_ready(&*conn.lock()?, &["folders"])?;
        Ok(Self { conn })
    }

    /// Creates one top-level folder.
    pub fn create_folder(&self, title: impl Into<String>) -> RepoResult<Folder> {
        let mut folder = Folder::new(title);
        let now = now_ms();
        folder.created_time = now;
        folder.updated_time = now;

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO folders (id, title, parent_id, created_time, updated_time)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id_to_db(folder.id),
                folder.title.as_str(),
                folder.parent_id.map(id_to_db),
                folder.created_time,
                folder.updated_time,
            ],
        )?;
        Ok(folder)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self.conn.lock()?;
        f(&conn)
    }
}

#[async_trait]
impl FolderStore for SqliteFolderStore {
    async fn load_folder(&self, id: FolderId) -> RepoResult<Option<Folder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{FOLDER_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id_to_db(id)])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_folder_row(row)?));
            }
            Ok(None)
        })
    }

    async fn default_folder(&self) -> RepoResult<Option<Folder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{FOLDER_SELECT_SQL} ORDER BY created_time DESC, id ASC LIMIT 1;"
            ))?;
            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_folder_row(row)?));
            }
            Ok(None)
        })
    }

    async fn all_folders(&self) -> RepoResult<Vec<Folder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{FOLDER_SELECT_SQL} ORDER BY title COLLATE NOCASE ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            let mut folders = Vec::new();
            while let Some(row) = rows.next()? {
                folders.push(parse_folder_row(row)?);
            }
            Ok(folders)
        })
    }
}

fn parse_folder_row(row: &Row<'_>) -> RepoResult<Folder> {
    let id_text: String = row.get("id")?;
    Ok(Folder {
        id: parse_uuid(&id_text, "folders.id")?,
        title: row.get("title")?,
        parent_id: parse_opt_uuid(row.get("parent_id")?, "folders.parent_id")?,
        created_time: row.get("created_time")?,
        updated_time: row.get("updated_time")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{FolderStore, SqliteFolderStore};
    use crate::db::{open_db_in_memory, SharedConnection};

    #[tokio::test]
    async fn default_folder_is_none_on_empty_db() {
        let conn = SharedConnection::new(open_db_in_memory().unwrap());
        let store = SqliteFolderStore::try_new(conn).unwrap();
        assert!(store.default_folder().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn created_folder_loads_back() {
        let conn = SharedConnection::new(open_db_in_memory().unwrap());
        let store = SqliteFolderStore::try_new(conn).unwrap();
        let folder = store.create_folder("Inbox").unwrap();

        let loaded = store.load_folder(folder.id).await.unwrap().unwrap();
        assert_eq!(loaded, folder);
        assert_eq!(store.all_folders().await.unwrap(), vec![folder.clone()]);
        assert_eq!(store.default_folder().await.unwrap(), Some(folder));
    }
}

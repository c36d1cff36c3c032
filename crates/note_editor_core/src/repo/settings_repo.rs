//! Settings store contract and SQLite implementation.

use crate::db::SharedConnection;
use crate::repo::{ensure_connection_ready, RepoResult};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

/// Folder new notes go to when the editor does not name one.
pub const ACTIVE_FOLDER_ID_KEY: &str = "activeFolderId";
/// Enables geolocation enrichment of newly created notes.
pub const TRACK_LOCATION_KEY: &str = "trackLocation";

/// Key/value settings contract.
#[async_trait]
pub trait Settings: Send + Sync {
    async fn get_value(&self, key: &str) -> RepoResult<Option<String>>;
}

/// Parses boolean-like setting values (`1|true|yes|on`).
pub fn setting_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// SQLite-backed settings store.
#[derive(Clone)]
pub struct SqliteSettingsStore {
    conn: SharedConnection,
}

impl SqliteSettingsStore {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        ensure_connection_ready(&*conn.lock()?, &["settings"])?;
        Ok(Self { conn })
    }

    /// Inserts or replaces one setting.
    pub fn set_value(&self, key: &str, value: &str) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key.trim(), value],
        )?;
        Ok(())
    }

    fn read(&self, key: &str) -> RepoResult<Option<String>> {
        let conn = self.conn.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [key.trim()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[async_trait]
impl Settings for SqliteSettingsStore {
    async fn get_value(&self, key: &str) -> RepoResult<Option<String>> {
        self.read(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{setting_enabled, Settings, SqliteSettingsStore, ACTIVE_FOLDER_ID_KEY};
    use crate::db::{open_db_in_memory, SharedConnection};

    #[tokio::test]
    async fn set_value_overwrites_previous() {
        let conn = SharedConnection::new(open_db_in_memory().unwrap());
        let settings = SqliteSettingsStore::try_new(conn).unwrap();
        assert_eq!(settings.get_value(ACTIVE_FOLDER_ID_KEY).await.unwrap(), None);

        settings.set_value(ACTIVE_FOLDER_ID_KEY, "a").unwrap();
        settings.set_value(ACTIVE_FOLDER_ID_KEY, "b").unwrap();
        assert_eq!(
            settings.get_value(ACTIVE_FOLDER_ID_KEY).await.unwrap().as_deref(),
            Some("b")
        );
    }

    #[test]
    fn setting_enabled_accepts_common_truthy_values() {
        assert!(setting_enabled(Some(" TRUE ")));
        assert!(setting_enabled(Some("1")));
        assert!(!setting_enabled(Some("0")));
        assert!(!setting_enabled(None));
    }
}

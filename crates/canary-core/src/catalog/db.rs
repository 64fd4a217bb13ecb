//! SQLite-backed catalog implementation.
//!
//! Handles connection, the collection table, and timestamp helpers. Entry
//! reads and writes live in `entries`.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{validate_collection, StoreError};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to a SQLite catalog: one database file, one collection table.
///
/// The default database lives under the XDG state directory:
/// `~/.local/state/canary/catalog.db` on Debian.
#[derive(Clone)]
pub struct SqliteCatalog {
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) collection: String,
}

impl SqliteCatalog {
    /// Open the catalog named by config: a `sqlite:` URL, a file path, or the
    /// default location when `database` is None.
    pub async fn open(database: Option<&str>, collection: &str) -> Result<Self, StoreError> {
        match database {
            Some(url) if url.starts_with("sqlite:") => Self::connect(url, collection).await,
            Some(path) => Self::open_at(path, collection).await,
            None => Self::open_default(collection).await,
        }
    }

    /// Open (or create) the default catalog database.
    pub async fn open_default(collection: &str) -> Result<Self, StoreError> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("canary").map_err(|e| {
            StoreError::StateDir {
                path: "$XDG_STATE_HOME".to_string(),
                source: std::io::Error::other(e),
            }
        })?;
        let db_path = xdg_dirs.get_state_home().join("canary").join("catalog.db");
        Self::open_at(db_path, collection).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>, collection: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::StateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        Self::connect(&uri, collection).await
    }

    /// Connect to a `sqlite:` URL as given.
    pub async fn connect(url: &str, collection: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .map_err(|source| StoreError::Connect {
                url: url.to_string(),
                source,
            })?;

        let catalog = SqliteCatalog {
            pool,
            collection: collection.to_string(),
        };
        catalog.migrate().await?;
        tracing::debug!(url, collection, "catalog connected");
        Ok(catalog)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Close the pool. Call once at process end.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        // Table only. Rows are created by whatever populates the catalog.
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id TEXT PRIMARY KEY NOT NULL,
                url TEXT NOT NULL,
                checksum TEXT NOT NULL DEFAULT '',
                updated_at INTEGER
            );
            "#,
            self.collection
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Schema {
                collection: self.collection.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Current time as Unix seconds (for `updated_at`).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory catalog for tests (no disk I/O).
pub(crate) async fn open_memory(collection: &str) -> Result<SqliteCatalog, StoreError> {
    SqliteCatalog::connect_single("sqlite::memory:", collection).await
}

#[cfg(test)]
impl SqliteCatalog {
    // An in-memory database exists per connection, so the pool must hold exactly one.
    async fn connect_single(url: &str, collection: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|source| StoreError::Connect {
                url: url.to_string(),
                source,
            })?;
        let catalog = SqliteCatalog {
            pool,
            collection: collection.to_string(),
        };
        catalog.migrate().await?;
        Ok(catalog)
    }

    /// Seed a row the way an external data-entry process would.
    pub(crate) async fn insert_for_test(&self, id: &str, url: &str, checksum: &str) {
        let sql = format!(
            r#"INSERT INTO "{}" (id, url, checksum) VALUES (?1, ?2, ?3)"#,
            self.collection
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(url)
            .bind(checksum)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

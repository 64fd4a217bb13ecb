//! Entry operations: bulk load and point update.

use async_trait::async_trait;
use sqlx::Row;

use super::db::{unix_timestamp, SqliteCatalog};
use super::types::{CatalogEntry, EntryId, StoreError};
use super::CatalogGateway;

impl SqliteCatalog {
    /// Load every entry in the collection, ordered by id.
    pub async fn load_entries(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let sql = format!(
            r#"
            SELECT CAST(id AS TEXT) AS id, url, COALESCE(checksum, '') AS checksum
            FROM "{}"
            ORDER BY id ASC
            "#,
            self.collection
        );
        let load_err = |source| StoreError::Load {
            collection: self.collection.clone(),
            source,
        };
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(load_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(load_err)?;
            let url: String = row.try_get("url").map_err(load_err)?;
            let checksum: String = row.try_get("checksum").map_err(load_err)?;
            out.push(CatalogEntry {
                id: EntryId::from(id),
                url,
                checksum,
            });
        }
        Ok(out)
    }

    /// Write `entry` back over the row keyed by `id`.
    pub async fn update_entry(&self, id: &EntryId, entry: &CatalogEntry) -> Result<(), StoreError> {
        let now = unix_timestamp();
        let sql = format!(
            r#"
            UPDATE "{}"
            SET url = ?1,
                checksum = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
            self.collection
        );
        let r = sqlx::query(&sql)
            .bind(&entry.url)
            .bind(&entry.checksum)
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Update {
                id: id.clone(),
                source,
            })?;

        if r.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogGateway for SqliteCatalog {
    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        self.load_entries().await
    }

    async fn update_by_id(&self, id: &EntryId, entry: &CatalogEntry) -> Result<(), StoreError> {
        self.update_entry(id, entry).await
    }
}

//! Catalog gateway (SQLite via sqlx).
//!
//! The catalog is owned by an outside process; a run only reads every entry
//! once and writes corrected checksums back by id. `CatalogGateway` is the
//! seam the verifier talks to; `SqliteCatalog` is the shipped store.

mod db;
mod entries;
mod types;

use async_trait::async_trait;

pub use db::SqliteCatalog;
pub use types::{validate_collection, CatalogEntry, EntryId, StoreError};

/// Query-all and update-by-id over a shared catalog handle.
/// Implementations must be safe to call concurrently from many tasks.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    /// Replace the stored entry keyed by `id`. Atomic per call.
    async fn update_by_id(&self, id: &EntryId, entry: &CatalogEntry) -> Result<(), StoreError>;
}

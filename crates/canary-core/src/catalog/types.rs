//! Types used by the catalog gateway.

use serde::Serialize;
use std::fmt;

/// Opaque entry identity assigned by the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

/// One catalog row: a remote asset and its last-known-good checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub url: String,
    /// Lowercase hex digest; empty if never recorded.
    pub checksum: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<EntryId>, url: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            checksum: checksum.into(),
        }
    }
}

/// Catalog store failures. `Connect` and `Load` end a run; `Update` and
/// `NotFound` only affect the entry being corrected.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connect to catalog {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("catalog state dir {path}: {source}")]
    StateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid collection name {0:?}")]
    InvalidCollection(String),
    #[error("prepare collection {collection}: {source}")]
    Schema {
        collection: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("load entries from {collection}: {source}")]
    Load {
        collection: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("update entry {id}: {source}")]
    Update {
        id: EntryId,
        #[source]
        source: sqlx::Error,
    },
    #[error("entry {0} not found")]
    NotFound(EntryId),
}

/// Collection (table) names are spliced into SQL, so only plain identifiers pass.
pub fn validate_collection(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

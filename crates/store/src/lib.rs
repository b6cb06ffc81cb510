//! Embedded object store for the satchel retrieval engine.
//!
//! All persisted state lives in one redb database with a table per
//! collection: `docs`, `chunks` (plus a secondary index on the owning
//! document), `vectors`, `notes`, `lexical_index` (a singleton blob),
//! `metadata`, and `file_blobs`. Values are JSON blobs; the lexical
//! snapshot is opaque to the store and (de)serialized by the lexical layer.
//!
//! A schema version is stamped into `metadata` on first open. When an
//! existing database carries a different version, the derived collections
//! (vectors and the lexical snapshot) are cleared so they get rebuilt by
//! the engine; source collections are never migrated destructively.

mod object_store;

pub use object_store::{ObjectStore, VectorRecord, SCHEMA_VERSION};

use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying redb database failed.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A stored value failed to decode.
    #[error("corrupt record in '{collection}': {detail}")]
    Corrupt {
        collection: &'static str,
        detail: String,
    },
}

impl StoreError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub(crate) fn corrupt(collection: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Corrupt {
            collection,
            detail: err.to_string(),
        }
    }
}

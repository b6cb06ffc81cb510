//! The redb-backed collections.

use std::path::Path;
use std::sync::Arc;

use ingest::Document;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use segment::Chunk;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Bump when a collection's value encoding changes; the open path clears
/// derived collections (vectors, lexical snapshot) on mismatch.
pub const SCHEMA_VERSION: u32 = 1;

const DOCS: TableDefinition<&str, &[u8]> = TableDefinition::new("docs");
const CHUNKS: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");
/// Secondary index: `"{doc_id}\0{chunk_id}" -> chunk_id`.
const CHUNKS_BY_DOC: TableDefinition<&str, &str> = TableDefinition::new("chunks_by_doc");
const VECTORS: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");
const NOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("notes");
const LEXICAL: TableDefinition<&str, &[u8]> = TableDefinition::new("lexical_index");
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");
const FILE_BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("file_blobs");

const LEXICAL_KEY: &str = "current";
const SCHEMA_KEY: &str = "schema_version";

/// A stored chunk embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub embedding: Vec<f32>,
}

/// Handle on the embedded database. Cheap to clone; writes are serialized
/// by redb's single-writer transaction model.
#[derive(Clone)]
pub struct ObjectStore {
    db: Arc<Database>,
}

impl ObjectStore {
    /// Open or create a database file and ensure every table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        store.ensure_schema()?;
        Ok(store)
    }

    /// Fully in-memory store for tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(StoreError::backend)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            txn.open_table(DOCS).map_err(StoreError::backend)?;
            txn.open_table(CHUNKS).map_err(StoreError::backend)?;
            txn.open_table(CHUNKS_BY_DOC).map_err(StoreError::backend)?;
            txn.open_table(VECTORS).map_err(StoreError::backend)?;
            txn.open_table(NOTES).map_err(StoreError::backend)?;
            txn.open_table(LEXICAL).map_err(StoreError::backend)?;
            txn.open_table(METADATA).map_err(StoreError::backend)?;
            txn.open_table(FILE_BLOBS).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)
    }

    /// Stamp or reconcile the schema version. On mismatch the derived
    /// collections are cleared so the engine rebuilds them.
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let stored = self.get_meta(SCHEMA_KEY)?;
        match stored.as_deref().map(str::parse::<u32>) {
            Some(Ok(version)) if version == SCHEMA_VERSION => Ok(()),
            None => self.set_meta(SCHEMA_KEY, &SCHEMA_VERSION.to_string()),
            _ => {
                tracing::warn!(
                    stored = stored.as_deref().unwrap_or("<unreadable>"),
                    current = SCHEMA_VERSION,
                    "schema version mismatch; clearing derived collections"
                );
                self.clear_vectors()?;
                self.clear_lexical()?;
                self.set_meta(SCHEMA_KEY, &SCHEMA_VERSION.to_string())
            }
        }
    }

    // ── documents ──────────────────────────────────────────────────────

    pub fn put_doc(&self, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(doc).map_err(|e| StoreError::corrupt("docs", e))?;
        self.put_raw(DOCS, &doc.id, &bytes)
    }

    pub fn get_doc(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.get_json(DOCS, id, "docs")
    }

    /// All documents, ordered by id (ids embed the upload timestamp, so
    /// this is roughly chronological).
    pub fn list_docs(&self) -> Result<Vec<Document>, StoreError> {
        self.scan_json(DOCS, "docs")
    }

    pub fn doc_count(&self) -> Result<usize, StoreError> {
        self.count(DOCS)
    }

    // ── chunks ─────────────────────────────────────────────────────────

    /// Persist chunks and their doc-id index entries in one transaction.
    pub fn put_chunks(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(CHUNKS).map_err(StoreError::backend)?;
            let mut index = txn.open_table(CHUNKS_BY_DOC).map_err(StoreError::backend)?;
            for chunk in chunks {
                let bytes =
                    serde_json::to_vec(chunk).map_err(|e| StoreError::corrupt("chunks", e))?;
                table
                    .insert(chunk.id.as_str(), bytes.as_slice())
                    .map_err(StoreError::backend)?;
                let index_key = doc_index_key(&chunk.doc_id, &chunk.id);
                index
                    .insert(index_key.as_str(), chunk.id.as_str())
                    .map_err(StoreError::backend)?;
            }
        }
        txn.commit().map_err(StoreError::backend)
    }

    pub fn get_chunk(&self, id: &str) -> Result<Option<Chunk>, StoreError> {
        self.get_json(CHUNKS, id, "chunks")
    }

    /// All chunks, ordered by chunk id.
    pub fn all_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        self.scan_json(CHUNKS, "chunks")
    }

    pub fn chunks_for_doc(&self, doc_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let index = txn.open_table(CHUNKS_BY_DOC).map_err(StoreError::backend)?;
        let chunks = txn.open_table(CHUNKS).map_err(StoreError::backend)?;

        let (start, end) = doc_index_bounds(doc_id);
        let mut result = Vec::new();
        for item in index
            .range::<&str>(start.as_str()..end.as_str())
            .map_err(StoreError::backend)?
        {
            let (_, chunk_id) = item.map_err(StoreError::backend)?;
            if let Some(value) = chunks
                .get(chunk_id.value())
                .map_err(StoreError::backend)?
            {
                let chunk: Chunk = serde_json::from_slice(value.value())
                    .map_err(|e| StoreError::corrupt("chunks", e))?;
                result.push(chunk);
            }
        }
        Ok(result)
    }

    pub fn chunk_count(&self) -> Result<usize, StoreError> {
        self.count(CHUNKS)
    }

    // ── vectors ────────────────────────────────────────────────────────

    pub fn put_vectors(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(VECTORS).map_err(StoreError::backend)?;
            for record in records {
                let bytes =
                    serde_json::to_vec(record).map_err(|e| StoreError::corrupt("vectors", e))?;
                table
                    .insert(record.chunk_id.as_str(), bytes.as_slice())
                    .map_err(StoreError::backend)?;
            }
        }
        txn.commit().map_err(StoreError::backend)
    }

    pub fn get_vector(&self, chunk_id: &str) -> Result<Option<VectorRecord>, StoreError> {
        self.get_json(VECTORS, chunk_id, "vectors")
    }

    pub fn has_vector(&self, chunk_id: &str) -> Result<bool, StoreError> {
        Ok(self.get_vector(chunk_id)?.is_some())
    }

    pub fn all_vectors(&self) -> Result<Vec<VectorRecord>, StoreError> {
        self.scan_json(VECTORS, "vectors")
    }

    pub fn vector_count(&self) -> Result<usize, StoreError> {
        self.count(VECTORS)
    }

    /// Drop every stored vector (embedder swap, schema mismatch).
    pub fn clear_vectors(&self) -> Result<(), StoreError> {
        self.clear_table(VECTORS)
    }

    // ── file blobs ─────────────────────────────────────────────────────

    pub fn put_blob(&self, doc_id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.put_raw(FILE_BLOBS, doc_id, bytes)
    }

    pub fn get_blob(&self, doc_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(FILE_BLOBS).map_err(StoreError::backend)?;
        Ok(table
            .get(doc_id)
            .map_err(StoreError::backend)?
            .map(|v| v.value().to_vec()))
    }

    // ── lexical snapshot (opaque blob) ─────────────────────────────────

    pub fn put_lexical_blob(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.put_raw(LEXICAL, LEXICAL_KEY, bytes)
    }

    pub fn get_lexical_blob(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(LEXICAL).map_err(StoreError::backend)?;
        Ok(table
            .get(LEXICAL_KEY)
            .map_err(StoreError::backend)?
            .map(|v| v.value().to_vec()))
    }

    pub fn clear_lexical(&self) -> Result<(), StoreError> {
        self.clear_table(LEXICAL)
    }

    // ── notes ──────────────────────────────────────────────────────────

    pub fn put_note_json(&self, id: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::corrupt("notes", e))?;
        self.put_raw(NOTES, id, &bytes)
    }

    pub fn get_note_json(&self, id: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.get_json(NOTES, id, "notes")
    }

    pub fn list_note_ids(&self) -> Result<Vec<String>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(NOTES).map_err(StoreError::backend)?;
        let mut ids = Vec::new();
        for item in table.iter().map_err(StoreError::backend)? {
            let (key, _) = item.map_err(StoreError::backend)?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    pub fn delete_note(&self, id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(NOTES).map_err(StoreError::backend)?;
            table.remove(id).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)
    }

    // ── metadata ───────────────────────────────────────────────────────

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(METADATA).map_err(StoreError::backend)?;
        Ok(table
            .get(key)
            .map_err(StoreError::backend)?
            .map(|v| v.value().to_string()))
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(METADATA).map_err(StoreError::backend)?;
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)
    }

    pub fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(METADATA).map_err(StoreError::backend)?;
            table.remove(key).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)
    }

    // ── lifecycle ──────────────────────────────────────────────────────

    /// Delete a document and everything derived from it (chunks, index
    /// entries, vectors, blob) in one transaction. Returns whether the
    /// document existed.
    pub fn delete_doc_cascade(&self, doc_id: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        let existed;
        {
            let mut docs = txn.open_table(DOCS).map_err(StoreError::backend)?;
            existed = docs.remove(doc_id).map_err(StoreError::backend)?.is_some();

            let mut index = txn.open_table(CHUNKS_BY_DOC).map_err(StoreError::backend)?;
            let (start, end) = doc_index_bounds(doc_id);
            let mut entries: Vec<(String, String)> = Vec::new();
            for item in index
                .range::<&str>(start.as_str()..end.as_str())
                .map_err(StoreError::backend)?
            {
                let (key, chunk_id) = item.map_err(StoreError::backend)?;
                entries.push((key.value().to_string(), chunk_id.value().to_string()));
            }

            let mut chunks = txn.open_table(CHUNKS).map_err(StoreError::backend)?;
            let mut vectors = txn.open_table(VECTORS).map_err(StoreError::backend)?;
            for (index_key, chunk_id) in &entries {
                index.remove(index_key.as_str()).map_err(StoreError::backend)?;
                chunks.remove(chunk_id.as_str()).map_err(StoreError::backend)?;
                vectors.remove(chunk_id.as_str()).map_err(StoreError::backend)?;
            }

            let mut blobs = txn.open_table(FILE_BLOBS).map_err(StoreError::backend)?;
            blobs.remove(doc_id).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)?;
        tracing::debug!(doc_id, existed, "cascade delete");
        Ok(existed)
    }

    /// Wipe every collection and re-stamp the schema version.
    pub fn reset(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        for name in [
            "docs",
            "chunks",
            "chunks_by_doc",
            "vectors",
            "notes",
            "lexical_index",
            "metadata",
            "file_blobs",
        ] {
            let def: TableDefinition<&str, &[u8]> = TableDefinition::new(name);
            txn.delete_table(def).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)?;
        self.init_tables()?;
        self.set_meta(SCHEMA_KEY, &SCHEMA_VERSION.to_string())
    }

    // ── generic helpers ────────────────────────────────────────────────

    fn put_raw(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        key: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = txn.open_table(table_def).map_err(StoreError::backend)?;
            table.insert(key, bytes).map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        key: &str,
        collection: &'static str,
    ) -> Result<Option<T>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(table_def).map_err(StoreError::backend)?;
        match table.get(key).map_err(StoreError::backend)? {
            Some(value) => serde_json::from_slice(value.value())
                .map(Some)
                .map_err(|e| StoreError::corrupt(collection, e)),
            None => Ok(None),
        }
    }

    fn scan_json<T: serde::de::DeserializeOwned>(
        &self,
        table_def: TableDefinition<&str, &[u8]>,
        collection: &'static str,
    ) -> Result<Vec<T>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(table_def).map_err(StoreError::backend)?;
        let mut result = Vec::new();
        for item in table.iter().map_err(StoreError::backend)? {
            let (_, value) = item.map_err(StoreError::backend)?;
            let decoded: T = serde_json::from_slice(value.value())
                .map_err(|e| StoreError::corrupt(collection, e))?;
            result.push(decoded);
        }
        Ok(result)
    }

    fn count(&self, table_def: TableDefinition<&str, &[u8]>) -> Result<usize, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(table_def).map_err(StoreError::backend)?;
        let mut count = 0usize;
        for item in table.iter().map_err(StoreError::backend)? {
            item.map_err(StoreError::backend)?;
            count += 1;
        }
        Ok(count)
    }

    fn clear_table(&self, table_def: TableDefinition<&str, &[u8]>) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        txn.delete_table(table_def).map_err(StoreError::backend)?;
        txn.open_table(table_def).map_err(StoreError::backend)?;
        txn.commit().map_err(StoreError::backend)
    }
}

fn doc_index_key(doc_id: &str, chunk_id: &str) -> String {
    format!("{doc_id}\u{0}{chunk_id}")
}

/// Half-open key range covering every index entry of one document.
fn doc_index_bounds(doc_id: &str) -> (String, String) {
    (format!("{doc_id}\u{0}"), format!("{doc_id}\u{1}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::DocKind;

    fn chunk(id: &str, doc_id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.into(),
            doc_id: doc_id.into(),
            page_number: 1,
            text: text.into(),
            start_offset: 0,
            end_offset: text.chars().count(),
            token_estimate: 1,
        }
    }

    #[test]
    fn doc_roundtrip_and_listing() {
        let s = ObjectStore::in_memory().unwrap();
        let doc = Document::new("a.txt", DocKind::Txt, 42);
        s.put_doc(&doc).unwrap();

        assert_eq!(s.get_doc(&doc.id).unwrap(), Some(doc.clone()));
        assert_eq!(s.get_doc("missing").unwrap(), None);
        assert_eq!(s.list_docs().unwrap(), vec![doc]);
        assert_eq!(s.doc_count().unwrap(), 1);
    }

    #[test]
    fn chunk_secondary_index_scopes_by_doc() {
        let s = ObjectStore::in_memory().unwrap();
        s.put_chunks(&[
            chunk("da-chunk-0", "da", "alpha"),
            chunk("da-chunk-1", "da", "beta"),
            chunk("db-chunk-0", "db", "gamma"),
        ])
        .unwrap();

        let for_a = s.chunks_for_doc("da").unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|c| c.doc_id == "da"));

        let for_b = s.chunks_for_doc("db").unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(s.all_chunks().unwrap().len(), 3);
    }

    #[test]
    fn vector_roundtrip() {
        let s = ObjectStore::in_memory().unwrap();
        let record = VectorRecord {
            chunk_id: "c1".into(),
            embedding: vec![0.1, 0.2, 0.3],
        };
        s.put_vectors(&[record.clone()]).unwrap();

        assert_eq!(s.get_vector("c1").unwrap(), Some(record));
        assert!(s.has_vector("c1").unwrap());
        assert!(!s.has_vector("c2").unwrap());
        assert_eq!(s.vector_count().unwrap(), 1);

        s.clear_vectors().unwrap();
        assert_eq!(s.vector_count().unwrap(), 0);
    }

    #[test]
    fn lexical_blob_is_opaque() {
        let s = ObjectStore::in_memory().unwrap();
        assert!(s.get_lexical_blob().unwrap().is_none());
        s.put_lexical_blob(b"opaque-bytes").unwrap();
        assert_eq!(s.get_lexical_blob().unwrap(), Some(b"opaque-bytes".to_vec()));
        s.clear_lexical().unwrap();
        assert!(s.get_lexical_blob().unwrap().is_none());
    }

    #[test]
    fn cascade_delete_removes_everything_derived() {
        let s = ObjectStore::in_memory().unwrap();
        let mut doc = Document::new("a.pdf", DocKind::Pdf, 10);
        doc.id = "da".into();
        s.put_doc(&doc).unwrap();
        s.put_chunks(&[
            chunk("da-chunk-0", "da", "alpha"),
            chunk("da-chunk-1", "da", "beta"),
        ])
        .unwrap();
        s.put_vectors(&[
            VectorRecord {
                chunk_id: "da-chunk-0".into(),
                embedding: vec![1.0],
            },
            VectorRecord {
                chunk_id: "da-chunk-1".into(),
                embedding: vec![2.0],
            },
        ])
        .unwrap();
        s.put_blob("da", &[1, 2, 3]).unwrap();

        assert!(s.delete_doc_cascade("da").unwrap());

        assert!(s.get_doc("da").unwrap().is_none());
        assert!(s.all_chunks().unwrap().is_empty());
        assert!(s.chunks_for_doc("da").unwrap().is_empty());
        assert_eq!(s.vector_count().unwrap(), 0);
        assert!(s.get_blob("da").unwrap().is_none());
    }

    #[test]
    fn cascade_delete_leaves_other_docs_alone() {
        let s = ObjectStore::in_memory().unwrap();
        s.put_chunks(&[
            chunk("da-chunk-0", "da", "alpha"),
            chunk("db-chunk-0", "db", "gamma"),
        ])
        .unwrap();
        s.put_vectors(&[VectorRecord {
            chunk_id: "db-chunk-0".into(),
            embedding: vec![1.0],
        }])
        .unwrap();

        s.delete_doc_cascade("da").unwrap();
        assert_eq!(s.chunks_for_doc("db").unwrap().len(), 1);
        assert!(s.has_vector("db-chunk-0").unwrap());
    }

    #[test]
    fn delete_missing_doc_reports_absent() {
        let s = ObjectStore::in_memory().unwrap();
        assert!(!s.delete_doc_cascade("ghost").unwrap());
    }

    #[test]
    fn metadata_roundtrip() {
        let s = ObjectStore::in_memory().unwrap();
        assert_eq!(s.get_meta("flag").unwrap(), None);
        s.set_meta("flag", "on").unwrap();
        assert_eq!(s.get_meta("flag").unwrap(), Some("on".into()));
        s.delete_meta("flag").unwrap();
        assert_eq!(s.get_meta("flag").unwrap(), None);
    }

    #[test]
    fn schema_version_is_stamped_on_open() {
        let s = ObjectStore::in_memory().unwrap();
        assert_eq!(
            s.get_meta(SCHEMA_KEY).unwrap(),
            Some(SCHEMA_VERSION.to_string())
        );
    }

    #[test]
    fn notes_roundtrip() {
        let s = ObjectStore::in_memory().unwrap();
        let value = serde_json::json!({"title": "t", "body": "b"});
        s.put_note_json("n1", &value).unwrap();
        assert_eq!(s.get_note_json("n1").unwrap(), Some(value));
        assert_eq!(s.list_note_ids().unwrap(), vec!["n1".to_string()]);
        s.delete_note("n1").unwrap();
        assert!(s.get_note_json("n1").unwrap().is_none());
    }

    #[test]
    fn reset_wipes_all_collections() {
        let s = ObjectStore::in_memory().unwrap();
        let doc = Document::new("a.txt", DocKind::Txt, 1);
        s.put_doc(&doc).unwrap();
        s.put_chunks(&[chunk("c", &doc.id, "text")]).unwrap();
        s.put_lexical_blob(b"blob").unwrap();
        s.set_meta("flag", "on").unwrap();

        s.reset().unwrap();

        assert_eq!(s.doc_count().unwrap(), 0);
        assert_eq!(s.chunk_count().unwrap(), 0);
        assert!(s.get_lexical_blob().unwrap().is_none());
        assert_eq!(s.get_meta("flag").unwrap(), None);
        // Schema stamp survives a reset.
        assert_eq!(
            s.get_meta(SCHEMA_KEY).unwrap(),
            Some(SCHEMA_VERSION.to_string())
        );
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satchel.redb");

        {
            let s = ObjectStore::open(&path).unwrap();
            let mut doc = Document::new("a.txt", DocKind::Txt, 5);
            doc.id = "persisted".into();
            s.put_doc(&doc).unwrap();
        }

        let s = ObjectStore::open(&path).unwrap();
        assert!(s.get_doc("persisted").unwrap().is_some());
    }
}

//! Persisted document records and identity minting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported document kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Pdf,
    Txt,
    Md,
}

impl DocKind {
    /// Infer the kind from a file name's extension.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Some(DocKind::Pdf),
            Some("txt") => Some(DocKind::Txt),
            Some("md") | Some("markdown") => Some(DocKind::Md),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Pdf => "pdf",
            DocKind::Txt => "txt",
            DocKind::Md => "md",
        }
    }

    /// Whether the raw bytes are kept in the blob collection for preview.
    pub fn keeps_blob(&self) -> bool {
        matches!(self, DocKind::Pdf)
    }
}

impl std::fmt::Display for DocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion progress flags on a document.
///
/// Flags are monotonic: once set they are only ever cleared by deleting the
/// document. `error` marks a failed ingest; recovery is delete-and-reingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocStatus {
    pub parsed: bool,
    pub indexed_lexical: bool,
    pub indexed_vector: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A persisted document record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Opaque, stable identifier. Upload time participates in the id, so
    /// re-ingesting the same bytes creates a distinct document.
    pub id: String,
    pub name: String,
    pub kind: DocKind,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocStatus,
}

impl Document {
    /// Create a freshly-ingested document record with no status flags set.
    pub fn new(name: impl Into<String>, kind: DocKind, size_bytes: u64) -> Self {
        let uploaded_at = Utc::now();
        Self {
            id: mint_doc_id(uploaded_at),
            name: name.into(),
            kind,
            size_bytes,
            uploaded_at,
            status: DocStatus::default(),
        }
    }
}

/// Mint a document id from the upload instant plus a random component.
///
/// The timestamp keeps ids sortable by upload time; the uuid guards against
/// collisions within one millisecond.
pub fn mint_doc_id(uploaded_at: DateTime<Utc>) -> String {
    format!(
        "doc-{}-{}",
        uploaded_at.timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

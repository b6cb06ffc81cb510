//! Raw ingest inputs and their validation.

use crate::{DocKind, IngestError};

/// A raw file handed to the engine for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestInput {
    pub name: String,
    pub kind: DocKind,
    pub bytes: Vec<u8>,
}

impl IngestInput {
    pub fn new(name: impl Into<String>, kind: DocKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Build an input from a file name, inferring the kind from the extension.
    pub fn from_named_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IngestError> {
        let name = name.into();
        let kind =
            DocKind::from_name(&name).ok_or_else(|| IngestError::UnsupportedKind(name.clone()))?;
        Ok(Self { name, kind, bytes })
    }

    /// Validate the payload before any persisted state is touched.
    ///
    /// Text kinds must be non-empty UTF-8; binary kinds only need bytes.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.bytes.is_empty() {
            return Err(IngestError::EmptyPayload(self.name.clone()));
        }
        match self.kind {
            DocKind::Txt | DocKind::Md => {
                if std::str::from_utf8(&self.bytes).is_err() {
                    return Err(IngestError::InvalidUtf8(self.name.clone()));
                }
                Ok(())
            }
            DocKind::Pdf => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_rejected() {
        let input = IngestInput::new("a.txt", DocKind::Txt, Vec::new());
        assert_eq!(
            input.validate(),
            Err(IngestError::EmptyPayload("a.txt".into()))
        );
    }

    #[test]
    fn invalid_utf8_rejected_for_text_kinds() {
        let input = IngestInput::new("a.md", DocKind::Md, vec![0xff, 0xfe, 0x00]);
        assert_eq!(input.validate(), Err(IngestError::InvalidUtf8("a.md".into())));
    }

    #[test]
    fn binary_pdf_payload_accepted() {
        let input = IngestInput::new("a.pdf", DocKind::Pdf, vec![0x25, 0x50, 0x44, 0x46]);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn kind_inference_from_name() {
        let input = IngestInput::from_named_bytes("notes.md", b"# hi".to_vec()).unwrap();
        assert_eq!(input.kind, DocKind::Md);

        let err = IngestInput::from_named_bytes("data.bin", vec![1]).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedKind(_)));
    }
}

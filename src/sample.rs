//! First-run sample corpus seeding.
//!
//! Seeding happens iff the corpus is empty AND the seeded flag is unset;
//! setting the flag is the seeding ingest's postcondition, so wiping the
//! documents later does not resurrect the samples.

use ingest::IngestInput;

use crate::engine::{Engine, IngestOptions};
use crate::error::EngineError;

/// Metadata flag recording that samples were seeded once.
pub const SAMPLE_SEEDED_FLAG: &str = "sample-seeded";

const SAMPLES: [(&str, &str); 2] = [
    (
        "welcome.md",
        "# Welcome to satchel\n\n\
         Satchel answers questions over your own documents without sending \
         a single byte off the device. Drop in text, markdown, or PDF files \
         and they are chunked, indexed, and ready to query in seconds.\n\n\
         Retrieval runs in three modes. Lexical mode uses BM25 term \
         statistics and shines on exact phrases. Semantic mode compares \
         dense embeddings and finds passages that say the same thing in \
         different words. Hybrid mode blends both rankings and is the \
         default for general use.",
    ),
    (
        "retrieval-notes.txt",
        "Chunking splits each page into overlapping windows aligned to \
         sentence boundaries, so answers quote readable passages instead of \
         fragments. Every chunk remembers its page and character offsets, \
         which is what makes citations precise.\n\n\
         The lexical index is rebuilt over the whole corpus after every \
         ingest. That keeps document frequencies exact at the cost of a \
         little extra work, a good trade at personal-corpus scale.",
    ),
];

/// Seed the bundled sample documents on a fresh corpus.
///
/// Returns the number of documents ingested (0 when the corpus already has
/// content or was seeded before).
pub async fn maybe_seed_samples(engine: &Engine) -> Result<usize, EngineError> {
    if engine.store().doc_count()? > 0 {
        return Ok(0);
    }
    if engine.store().get_meta(SAMPLE_SEEDED_FLAG)?.is_some() {
        return Ok(0);
    }

    let mut seeded = 0;
    for (name, body) in SAMPLES {
        let input = IngestInput::from_named_bytes(name, body.as_bytes().to_vec())?;
        engine.ingest(input, IngestOptions::default()).await?;
        seeded += 1;
    }
    engine.store().set_meta(SAMPLE_SEEDED_FLAG, "true")?;
    tracing::info!(seeded, "seeded sample corpus");
    Ok(seeded)
}

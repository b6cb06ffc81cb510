//! Deterministic stub embedder.
//!
//! Derives sinusoid vector components from a hash of the input text so the
//! engine has reproducible embeddings with no model assets and negligible
//! CPU cost. Texts sharing vocabulary do not land near each other in this
//! space (the stub is for determinism, not semantic quality) but identical
//! texts always collide exactly, which is what the pipeline tests need.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fxhash::hash64;
use serde::{Deserialize, Serialize};

use crate::{l2_normalize_in_place, Embedder, SemanticError};

/// Configuration for [`StubEmbedder`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StubEmbedderConfig {
    /// Identifier persisted next to produced vectors.
    pub id: String,
    /// Vector width.
    pub dimensions: usize,
    /// Emit unit-length vectors.
    pub normalize: bool,
}

impl Default for StubEmbedderConfig {
    fn default() -> Self {
        Self {
            id: "stub-embedder".into(),
            dimensions: 384,
            normalize: true,
        }
    }
}

/// Hash-seeded sinusoid embedder; see the module docs.
#[derive(Debug)]
pub struct StubEmbedder {
    config: StubEmbedderConfig,
    ready: AtomicBool,
}

impl StubEmbedder {
    pub fn new(config: StubEmbedderConfig) -> Self {
        Self {
            config,
            ready: AtomicBool::new(false),
        }
    }

    fn make_vector(&self, text: &str) -> Vec<f32> {
        let seed = hash64(text.as_bytes());
        let mut vector = vec![0f32; self.config.dimensions];
        for (idx, value) in vector.iter_mut().enumerate() {
            let lane = seed.rotate_left((idx % 64) as u32);
            *value = (lane as f32 * 1e-4).sin();
        }
        if self.config.normalize {
            l2_normalize_in_place(&mut vector);
        }
        vector
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(StubEmbedderConfig::default())
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn normalized(&self) -> bool {
        self.config.normalize
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> Result<(), SemanticError> {
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        if !self.is_ready() {
            return Err(SemanticError::NotReady(self.config.id.clone()));
        }
        Ok(self.make_vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ready_stub() -> StubEmbedder {
        let stub = StubEmbedder::default();
        stub.initialize().await.unwrap();
        stub
    }

    #[tokio::test]
    async fn embed_before_initialize_fails() {
        let stub = StubEmbedder::default();
        let err = stub.embed("hello").await.unwrap_err();
        assert!(matches!(err, SemanticError::NotReady(_)));
    }

    #[tokio::test]
    async fn vectors_are_deterministic() {
        let stub = ready_stub().await;
        let a = stub.embed("same text").await.unwrap();
        let b = stub.embed("same text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_different_vector() {
        let stub = ready_stub().await;
        let a = stub.embed("hello").await.unwrap();
        let b = stub.embed("world").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn advertised_dimension_is_honored() {
        let stub = StubEmbedder::new(StubEmbedderConfig {
            dimensions: 64,
            ..Default::default()
        });
        stub.initialize().await.unwrap();
        let v = stub.embed("text").await.unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(stub.dimensions(), 64);
    }

    #[tokio::test]
    async fn normalized_vectors_are_unit_length() {
        let stub = ready_stub().await;
        let v = stub.embed("normalize me").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let stub = ready_stub().await;
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let batch = stub.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(*vector, stub.embed(text).await.unwrap());
        }
    }
}

//! In-memory vector index loaded from the ingested index file

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use super::IndexFile;
use super::KnowledgeChunk;
use super::KnowledgeIndex;
use crate::embeddings::Embedder;
use crate::errors::BarcraftError;
use crate::errors::Result;

/// Read-only cosine-similarity index over embedded chunks
pub struct VectorIndex {
    chunks: Vec<KnowledgeChunk>,
    dimension: usize,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.chunks.len())
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Load and validate the index file
    ///
    /// Any failure here means the service cannot answer grounded prompts, so it is
    /// reported as [`BarcraftError::RetrievalUnavailable`].
    pub fn load(
        path: &Path,
        embedder: Arc<dyn Embedder>,
        expected_dimension: Option<usize>,
    ) -> Result<Self> {
        let file = IndexFile::read(path).map_err(|e| {
            BarcraftError::RetrievalUnavailable(format!(
                "failed to load knowledge index {}: {e}",
                path.display()
            ))
        })?;

        if let Some(expected) = expected_dimension {
            if file.dimension != expected {
                return Err(BarcraftError::RetrievalUnavailable(format!(
                    "index built with dimension {} but embeddings are configured for {expected}",
                    file.dimension
                )));
            }
        }

        let index = Self::from_chunks(file.chunks, embedder)?;
        info!(
            "Loaded knowledge index {} ({} chunks, model {}, dim {})",
            path.display(),
            index.len(),
            file.model,
            index.dimension
        );
        Ok(index)
    }

    pub fn from_chunks(chunks: Vec<KnowledgeChunk>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dimension = chunks
            .first()
            .map(|c| c.embedding.len())
            .ok_or_else(|| {
                BarcraftError::RetrievalUnavailable("knowledge index has no chunks".to_string())
            })?;

        if dimension == 0 {
            return Err(BarcraftError::RetrievalUnavailable(
                "knowledge index has zero-length embeddings".to_string(),
            ));
        }

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
            return Err(BarcraftError::RetrievalUnavailable(format!(
                "chunk {} has dimension {}, expected {dimension}",
                bad.id,
                bad.embedding.len()
            )));
        }

        Ok(Self {
            chunks,
            dimension,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Chunk positions ordered by similarity to `query_embedding`; ties keep index order
    fn rank(&self, query_embedding: &[f32], k: usize) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(pos, chunk)| (pos, cosine_similarity(query_embedding, &chunk.embedding)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        scored.into_iter().take(k).map(|(pos, _)| pos).collect()
    }
}

#[async_trait]
impl KnowledgeIndex for VectorIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| BarcraftError::Retrieval(format!("query embedding failed: {e}")))?;

        if query_embedding.len() != self.dimension {
            return Err(BarcraftError::Retrieval(format!(
                "query embedding has dimension {}, index expects {}",
                query_embedding.len(),
                self.dimension
            )));
        }

        let ranked = self.rank(&query_embedding, k);
        debug!("Similarity search returned {} of {} chunks", ranked.len(), self.len());

        Ok(ranked
            .into_iter()
            .map(|pos| self.chunks[pos].text.clone())
            .collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

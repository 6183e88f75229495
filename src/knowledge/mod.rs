//! Knowledge base: chunked reference text with embeddings
//!
//! - [`chunker`] splits source documents into overlapping chunks
//! - [`ingest`] embeds chunks and writes the index file
//! - [`vector_index`] loads the index file and answers similarity queries

pub mod chunker;
pub mod ingest;
pub mod vector_index;

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use chunker::TextSplitter;
pub use ingest::build_index;
pub use ingest::IngestOptions;
pub use vector_index::VectorIndex;

use crate::errors::Result;

/// Nearest-neighbour lookup over the knowledge base
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Up to `k` chunk texts, most similar first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

/// One embedded piece of a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: usize,
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// On-disk layout of the knowledge index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFile {
    pub model: String,
    pub dimension: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub chunks: Vec<KnowledgeChunk>,
}

impl IndexFile {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes through a temp file so a crashed ingest never leaves a torn index
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&serde_json::to_vec(self)?)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_file_save_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("codex.index.json");
        let index = IndexFile {
            model: "nomic-embed-text".to_string(),
            dimension: 2,
            created_at: chrono::Utc::now(),
            chunks: vec![KnowledgeChunk {
                id: 0,
                source: "codex.pdf".to_string(),
                text: "Daiquiri: rum, lime, sugar".to_string(),
                embedding: vec![0.5, 0.5],
            }],
        };

        index.save(&path).unwrap();

        assert_eq!(IndexFile::read(&path).unwrap(), index);
        assert!(!path.with_extension("json.tmp").exists());
    }
}

//! Embeddings generation module
//!
//! Text embeddings are produced by an HTTP provider:
//! - OpenAI-compatible endpoints (`/embeddings`)
//! - Ollama (local models, `/api/embeddings`)
//!
//! The retriever only depends on the [`Embedder`] trait, so tests can substitute a
//! deterministic in-process implementation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use barcraft::config::AppConfig;
//! use barcraft::embeddings::EmbeddingClient;
//! use barcraft::embeddings::Embedder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_app_config(&config)?;
//!
//!     let embedding = client.embed("Classic daiquiri ratios").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;

use crate::errors::Result;

/// Turns text into a dense vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds several texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

//! RAG (Retrieval-Augmented Generation) module
//!
//! This module turns a raw user prompt into a grounded model request:
//! - Semantic retrieval of reference chunks from the knowledge index
//! - Composition of the labelled concept/context/prompt block
//! - Replay of prior turns behind a fixed system instruction
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use barcraft::config::AppConfig;
//! use barcraft::embeddings::EmbeddingClient;
//! use barcraft::knowledge::VectorIndex;
//! use barcraft::rag::PromptComposer;
//! use barcraft::rag::Retriever;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let embedder = Arc::new(EmbeddingClient::from_app_config(&config)?);
//!     let index = VectorIndex::load(config.index_path(), embedder, None)?;
//!     let retriever = Retriever::new(Arc::new(index), config.top_k());
//!
//!     let context = retriever.retrieve("What is the ratio for a sour?").await?;
//!     let composer = PromptComposer::new("You are a bar manager.", "Cocktail Codex");
//!     let prompt = composer.compose("speakeasy bar", &context, "suggest a gin cocktail", &[]);
//!     println!("{}", prompt.user_block);
//!
//!     Ok(())
//! }
//! ```

pub mod composer;
pub mod retriever;

pub use composer::compose;
pub use composer::ComposedPrompt;
pub use composer::PromptComposer;
pub use retriever::Retriever;

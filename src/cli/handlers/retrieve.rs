//! Ad-hoc retrieval against the knowledge index

use std::sync::Arc;

use crate::cli::output::print_info;
use crate::cli::output::print_warning;
use crate::cli::output::truncate_str;
use crate::embeddings::EmbeddingClient;
use crate::knowledge::KnowledgeIndex;
use crate::knowledge::VectorIndex;
use crate::AppConfig;
use crate::Result;

pub async fn handle_retrieve(config: &AppConfig, query: String, k: Option<usize>) -> Result<()> {
    let k = k.unwrap_or_else(|| config.top_k());
    let embedder = Arc::new(EmbeddingClient::from_app_config(config)?);
    let index = VectorIndex::load(
        config.index_path(),
        embedder,
        Some(config.embedding_dimension()),
    )?;

    print_info(&format!("Top {k} chunks for: {query}"));
    let chunks = index.similarity_search(&query, k).await?;
    if chunks.is_empty() {
        print_warning("No matching chunks");
        return Ok(());
    }

    for (rank, chunk) in chunks.iter().enumerate() {
        println!();
        println!("#{} {}", rank + 1, "-".repeat(40));
        println!("{}", truncate_str(chunk, 600));
    }
    Ok(())
}

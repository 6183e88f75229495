//! Knowledge index build handler

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::embeddings::EmbeddingClient;
use crate::knowledge::build_index;
use crate::knowledge::IngestOptions;
use crate::knowledge::TextSplitter;
use crate::AppConfig;
use crate::Result;

pub async fn handle_ingest(
    config: &AppConfig,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| config.index_path().to_path_buf());
    let splitter = TextSplitter::new(config.knowledge.chunk_size, config.knowledge.chunk_overlap);
    let embedder = EmbeddingClient::from_app_config(config)?;
    let options = IngestOptions {
        model: config.embedding_model().to_string(),
        dimension: config.embedding_dimension(),
        batch_size: config.embeddings.batch_size,
    };

    print_info(&format!(
        "Ingesting {} document(s) with {} ({} dims)",
        sources.len(),
        options.model,
        options.dimension
    ));

    let started = Instant::now();
    let index = build_index(&sources, &splitter, &embedder, &options).await?;
    index.save(&output)?;

    info!(
        "Index written to {} in {:.1}s",
        output.display(),
        started.elapsed().as_secs_f64()
    );
    print_success(&format!(
        "Wrote {} chunks to {}",
        index.chunks.len(),
        output.display()
    ));
    Ok(())
}

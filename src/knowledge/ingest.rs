//! Offline ingestion: load documents, chunk, embed, persist

use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;

use super::IndexFile;
use super::KnowledgeChunk;
use super::TextSplitter;
use crate::embeddings::Embedder;
use crate::errors::BarcraftError;
use crate::errors::Result;

/// Options for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed font tables instead of returning an error
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| {
            BarcraftError::Validation(format!("{}: PDF text extraction aborted", path.display()))
        })?;
    extracted.map_err(|e| {
        BarcraftError::Validation(format!("{}: cannot extract PDF text: {e}", path.display()))
    })
}

/// Text of a source document: PDFs by extension, everything else as UTF-8
fn load_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    if is_pdf(path) {
        let text = extract_pdf_text(path, &bytes)?;
        debug!("Extracted {} chars of text from {}", text.len(), path.display());
        return Ok(text);
    }

    String::from_utf8(bytes).map_err(|_| {
        BarcraftError::Validation(format!("{} is neither a PDF nor UTF-8 text", path.display()))
    })
}

/// Build an index from PDF and plain-text sources
pub async fn build_index(
    sources: &[PathBuf],
    splitter: &TextSplitter,
    embedder: &dyn Embedder,
    options: &IngestOptions,
) -> Result<IndexFile> {
    if sources.is_empty() {
        return Err(BarcraftError::Validation(
            "at least one source document is required".to_string(),
        ));
    }

    let mut pending: Vec<(String, String)> = Vec::new();
    for path in sources {
        info!("📚 Loading {}", path.display());
        let text = load_document(path)?;
        let source = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let pieces = splitter.split(&text);
        info!("✂️ {} split into {} chunks", source, pieces.len());
        pending.extend(pieces.into_iter().map(|p| (source.clone(), p)));
    }

    if pending.is_empty() {
        return Err(BarcraftError::Validation(
            "source documents contain no text".to_string(),
        ));
    }

    info!("🧠 Embedding {} chunks with {}", pending.len(), options.model);
    let mut chunks = Vec::with_capacity(pending.len());
    for batch in pending.chunks(options.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != batch.len() {
            return Err(BarcraftError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        for ((source, text), embedding) in batch.iter().zip(embeddings) {
            if embedding.len() != options.dimension {
                return Err(BarcraftError::Config(format!(
                    "embedding model returned dimension {}, configured dimension is {}",
                    embedding.len(),
                    options.dimension
                )));
            }
            chunks.push(KnowledgeChunk {
                id: chunks.len(),
                source: source.clone(),
                text: text.clone(),
                embedding,
            });
        }
    }

    Ok(IndexFile {
        model: options.model.clone(),
        dimension: options.dimension,
        created_at: chrono::Utc::now(),
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::ExportConfig;
    use crate::export::PdfExporter;
    use crate::models::Turn;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn options(dimension: usize) -> IngestOptions {
        IngestOptions {
            model: "length".to_string(),
            dimension,
            batch_size: 2,
        }
    }

    #[tokio::test]
    async fn test_build_index_from_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let codex = dir.path().join("codex.txt");
        std::fs::write(
            &codex,
            "The Old Fashioned template.\n\nThe Martini template.\n\nThe Daiquiri template.",
        )
        .unwrap();

        let index = build_index(
            &[codex],
            &TextSplitter::new(30, 0),
            &LengthEmbedder,
            &options(2),
        )
        .await
        .unwrap();

        assert_eq!(index.chunks.len(), 3);
        assert_eq!(index.chunks[1].text, "The Martini template.");
        assert_eq!(index.chunks[2].id, 2);
        assert!(index.chunks.iter().all(|c| c.source == "codex.txt"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let codex = dir.path().join("codex.txt");
        std::fs::write(&codex, "Negroni: equal parts.").unwrap();

        let err = build_index(&[codex], &TextSplitter::new(800, 100), &LengthEmbedder, &options(384))
            .await
            .unwrap_err();
        assert!(matches!(err, BarcraftError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_index_from_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let codex = dir.path().join("Cocktail Codex.pdf");
        let bytes = PdfExporter::new(&ExportConfig::default())
            .render(&[
                Turn::user("Negroni template"),
                Turn::assistant("Stir gin Campari vermouth"),
            ])
            .unwrap();
        std::fs::write(&codex, bytes).unwrap();

        let index = build_index(
            &[codex],
            &TextSplitter::new(800, 100),
            &LengthEmbedder,
            &options(2),
        )
        .await
        .unwrap();

        let text: String = index.chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(text.contains("Negroni"));
        assert!(text.contains("Campari"));
        assert!(index.chunks.iter().all(|c| c.source == "Cocktail Codex.pdf"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("codex.PDF");
        std::fs::write(&pdf, b"%PDF-1.3 truncated").unwrap();

        let err = build_index(&[pdf], &TextSplitter::new(800, 100), &LengthEmbedder, &options(2))
            .await
            .unwrap_err();
        assert!(matches!(err, BarcraftError::Validation(_)));
    }

    #[tokio::test]
    async fn test_binary_text_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("codex.bin");
        std::fs::write(&blob, [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let err = build_index(&[blob], &TextSplitter::new(800, 100), &LengthEmbedder, &options(2))
            .await
            .unwrap_err();
        assert!(matches!(err, BarcraftError::Validation(_)));
    }

    #[tokio::test]
    async fn test_no_sources() {
        let err = build_index(&[], &TextSplitter::new(800, 100), &LengthEmbedder, &options(2))
            .await
            .unwrap_err();
        assert!(matches!(err, BarcraftError::Validation(_)));
    }
}

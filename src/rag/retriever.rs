//! Retrieval of grounding context for a user prompt

use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::knowledge::KnowledgeIndex;

/// Separator between retrieved chunks in the assembled context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Turns a free-text query into concatenated top-k context
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn KnowledgeIndex>,
    default_k: usize,
}

impl Retriever {
    /// Create a new retriever over an already loaded index
    pub fn new(index: Arc<dyn KnowledgeIndex>, default_k: usize) -> Self {
        Self {
            index,
            default_k: default_k.max(1),
        }
    }

    /// Retrieve with the configured `k`
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        self.retrieve_k(query, self.default_k).await
    }

    /// Top-`k` chunk texts in rank order, separated by a blank line
    ///
    /// An empty query yields empty context without consulting the index.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<String> {
        if query.trim().is_empty() {
            return Ok(String::new());
        }

        debug!("Retrieving top {} chunks for: {}", k, query);
        let chunks = self.index.similarity_search(query, k).await?;
        Ok(chunks.join(CONTEXT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FixedIndex {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KnowledgeIndex for FixedIndex {
        async fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(["first", "second", "third", "fourth"]
                .iter()
                .take(k)
                .map(|s| (*s).to_string())
                .collect())
        }
    }

    #[tokio::test]
    async fn test_chunks_joined_with_blank_line() {
        let retriever = Retriever::new(Arc::new(FixedIndex::default()), 3);
        let context = retriever.retrieve("sour ratio").await.unwrap();
        assert_eq!(context, "first\n\nsecond\n\nthird");
    }

    #[tokio::test]
    async fn test_explicit_k() {
        let retriever = Retriever::new(Arc::new(FixedIndex::default()), 3);
        assert_eq!(retriever.retrieve_k("sour", 1).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_empty_query_does_not_hit_index() {
        let index = Arc::new(FixedIndex::default());
        let retriever = Retriever::new(index.clone(), 3);

        assert_eq!(retriever.retrieve("").await.unwrap(), "");
        assert_eq!(retriever.retrieve(" \n ").await.unwrap(), "");
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }
}

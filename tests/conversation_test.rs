//! End-to-end turn flow: ingest a small codex, load it, converse over a file-backed store

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use barcraft::conversation::ConversationOrchestrator;
use barcraft::conversation::ConversationStore;
use barcraft::conversation::FileConversationStore;
use barcraft::embeddings::Embedder;
use barcraft::knowledge::build_index;
use barcraft::knowledge::IngestOptions;
use barcraft::knowledge::TextSplitter;
use barcraft::knowledge::VectorIndex;
use barcraft::llm::CompletionClient;
use barcraft::llm::CompletionError;
use barcraft::models::Role;
use barcraft::models::SessionId;
use barcraft::models::Turn;
use barcraft::rag::PromptComposer;
use barcraft::rag::Retriever;
use barcraft::BarcraftError;
use barcraft::Result;

const CODEX: &str = "Gin Rickey: gin, lime juice, soda water. A speakeasy staple.\n\n\
Daiquiri: white rum, lime juice, simple syrup. Shake hard.\n\n\
Whiskey Sour: bourbon, lemon juice, sugar, egg white.";

struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(["gin", "rum", "sour"]
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect())
    }
}

/// Echoes the last user block back so tests can see what was retrieved
#[derive(Default)]
struct EchoCompletion {
    requests: Mutex<Vec<Vec<Turn>>>,
}

#[async_trait]
impl CompletionClient for EchoCompletion {
    async fn complete(&self, messages: &[Turn]) -> std::result::Result<String, CompletionError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok("Menu idea #1: the Bathtub Rickey".to_string())
    }
}

async fn write_index(dir: &Path) -> std::path::PathBuf {
    let source = dir.join("codex.txt");
    std::fs::write(&source, CODEX).unwrap();

    let options = IngestOptions {
        model: "keyword".to_string(),
        dimension: 3,
        batch_size: 2,
    };
    // Small chunks so each recipe lands in its own chunk
    let index = build_index(&[source], &TextSplitter::new(80, 0), &KeywordEmbedder, &options)
        .await
        .unwrap();

    let path = dir.join("index").join("index.json");
    index.save(&path).unwrap();
    path
}

fn build_orchestrator(
    index_path: &Path,
    sessions: &Path,
    completion: Arc<EchoCompletion>,
) -> ConversationOrchestrator {
    let index = VectorIndex::load(index_path, Arc::new(KeywordEmbedder), Some(3)).unwrap();
    let store: Arc<dyn ConversationStore> = Arc::new(FileConversationStore::new(sessions).unwrap());
    ConversationOrchestrator::new(
        store,
        Retriever::new(Arc::new(index), 1),
        PromptComposer::new("You are the bar manager at Raise the Bar.", "Cocktail Codex"),
        completion,
    )
}

#[tokio::test]
async fn test_grounded_turn_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = write_index(dir.path()).await;
    let sessions = dir.path().join("sessions");
    let completion = Arc::new(EchoCompletion::default());
    let id = SessionId::generate();

    {
        let orchestrator = build_orchestrator(&index_path, &sessions, completion.clone());
        let outcome = orchestrator
            .submit(&id, Some("speakeasy bar"), Some("suggest a gin cocktail"))
            .await
            .unwrap();

        assert_eq!(outcome.turns.len(), 2);
        let block = &outcome.turns[0].content;
        assert!(block.starts_with("Venue Concept: speakeasy bar"));
        assert!(block.contains("Relevant context from Cocktail Codex:\nGin Rickey"));
        assert!(!block.contains("Daiquiri"));
        assert!(block.ends_with("User Prompt:\nsuggest a gin cocktail\n"));
        assert_eq!(outcome.turns[1].content, "Menu idea #1: the Bathtub Rickey");
    }

    // New process, same session directory
    let orchestrator = build_orchestrator(&index_path, &sessions, completion.clone());
    let reply = orchestrator.ask(&id, "now something with rum").await.unwrap();
    assert!(reply.is_some());

    let second = completion.requests.lock().unwrap().last().cloned().unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].role, Role::System);
    assert!(second[3].content.contains("Daiquiri"));

    let state = orchestrator.snapshot(&id).await.unwrap();
    assert_eq!(state.turns.len(), 4);
    assert_eq!(state.concept.as_deref(), Some("speakeasy bar"));
}

#[tokio::test]
async fn test_concept_survives_restart_and_reset_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = write_index(dir.path()).await;
    let sessions = dir.path().join("sessions");
    let id = SessionId::generate();

    build_orchestrator(&index_path, &sessions, Arc::default())
        .set_concept(&id, "tiki lounge")
        .await
        .unwrap();

    let orchestrator = build_orchestrator(&index_path, &sessions, Arc::default());
    let err = orchestrator.set_concept(&id, "wine bar").await.unwrap_err();
    assert!(matches!(err, BarcraftError::AlreadySet(_)));

    orchestrator.reset(&id).await.unwrap();
    assert!(orchestrator.snapshot(&id).await.unwrap().is_empty());
    assert!(std::fs::read_dir(&sessions).unwrap().next().is_none());
}

#[tokio::test]
async fn test_missing_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = VectorIndex::load(&dir.path().join("nope.json"), Arc::new(KeywordEmbedder), None)
        .unwrap_err();
    assert!(matches!(err, BarcraftError::RetrievalUnavailable(_)));
    assert!(!err.is_recoverable());
}

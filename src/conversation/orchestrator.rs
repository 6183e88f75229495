//! Per-turn control flow: retrieve, compose, complete, commit

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::store::ConversationStore;
use crate::errors::BarcraftError;
use crate::errors::Result;
use crate::llm::CompletionClient;
use crate::llm::CompletionError;
use crate::models::SessionId;
use crate::models::SessionState;
use crate::models::Turn;
use crate::rag::PromptComposer;
use crate::rag::Retriever;

const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Conversation phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationPhase {
    /// No venue concept yet; prompts are ignored
    Empty,
    /// Concept pinned; prompts run full turns
    ConceptSet,
}

impl ConversationPhase {
    pub fn of(state: &SessionState) -> Self {
        Self::for_concept(state.concept.as_deref())
    }

    pub fn for_concept(concept: Option<&str>) -> Self {
        if concept.is_some() {
            Self::ConceptSet
        } else {
            Self::Empty
        }
    }
}

/// Result of one submission from the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Reply produced by this submission, if a turn ran
    pub reply: Option<String>,
    pub concept: Option<String>,
    pub turns: Vec<Turn>,
}

impl TurnOutcome {
    fn unchanged(state: SessionState) -> Self {
        Self {
            reply: None,
            concept: state.concept,
            turns: state.turns,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Ties retrieval, composition and completion to the conversation store
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStore>,
    retriever: Retriever,
    composer: PromptComposer,
    completion: Arc<dyn CompletionClient>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
    retrieval_timeout: Duration,
    completion_timeout: Duration,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        retriever: Retriever,
        composer: PromptComposer,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            store,
            retriever,
            composer,
            completion,
            locks: DashMap::new(),
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }

    /// Upper bounds for the two external calls of a turn
    #[must_use]
    pub fn with_timeouts(mut self, retrieval: Duration, completion: Duration) -> Self {
        self.retrieval_timeout = retrieval;
        self.completion_timeout = completion;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    async fn lock(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drop lock entries nobody is holding or waiting on
    pub fn release_idle_locks(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    /// Drop sessions idle for longer than `max_idle_secs`
    ///
    /// Each candidate is re-checked under its session lock, so a turn that is
    /// still running keeps its session.
    pub async fn purge_idle(&self, max_idle_secs: u64) -> Result<usize> {
        let mut purged = 0;
        for state in self.store.list().await? {
            if !state.is_idle(max_idle_secs, chrono::Utc::now().timestamp()) {
                continue;
            }
            let id = state.session_id;
            let _guard = self.lock(&id).await;
            let now = chrono::Utc::now().timestamp();
            if self.store.remove_if_idle(&id, max_idle_secs, now).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }

    pub async fn snapshot(&self, id: &SessionId) -> Result<SessionState> {
        self.store.snapshot(id).await
    }

    /// Handle one page submission
    ///
    /// A concept is only taken while the session has none. Without a concept the
    /// submission is a no-op, and so is a blank prompt. Neither is an error.
    #[instrument(skip(self, concept, prompt), fields(session = %id))]
    pub async fn submit(
        &self,
        id: &SessionId,
        concept: Option<&str>,
        prompt: Option<&str>,
    ) -> Result<TurnOutcome> {
        let _guard = self.lock(id).await;
        let mut state = self.store.snapshot(id).await?;

        let pinned = match (state.concept.clone(), non_blank(concept)) {
            (Some(existing), incoming) => {
                if incoming.is_some_and(|c| c != existing) {
                    debug!("Ignoring new concept, session already has one");
                }
                existing
            }
            (None, Some(incoming)) => {
                self.store.set_concept(id, incoming).await?;
                info!("Venue concept set");
                state.concept = Some(incoming.to_string());
                incoming.to_string()
            }
            (None, None) => return Ok(TurnOutcome::unchanged(state)),
        };

        let Some(prompt) = non_blank(prompt) else {
            return Ok(TurnOutcome::unchanged(state));
        };

        let reply = self.run_turn(id, &pinned, prompt, &state.turns).await?;
        let state = self.store.snapshot(id).await?;
        Ok(TurnOutcome {
            reply: Some(reply),
            concept: state.concept,
            turns: state.turns,
        })
    }

    /// Pin the venue concept
    pub async fn set_concept(&self, id: &SessionId, concept: &str) -> Result<()> {
        let concept = non_blank(Some(concept))
            .ok_or_else(|| BarcraftError::Validation("concept is empty".to_string()))?;
        let _guard = self.lock(id).await;
        self.store.set_concept(id, concept).await
    }

    /// Run one turn; `None` when there is no concept yet or the prompt is blank
    pub async fn ask(&self, id: &SessionId, prompt: &str) -> Result<Option<String>> {
        let Some(prompt) = non_blank(Some(prompt)) else {
            return Ok(None);
        };

        let _guard = self.lock(id).await;
        let state = self.store.snapshot(id).await?;
        let Some(concept) = state.concept.as_deref() else {
            return Ok(None);
        };

        self.run_turn(id, concept, prompt, &state.turns).await.map(Some)
    }

    /// Back to an empty session
    #[instrument(skip(self), fields(session = %id))]
    pub async fn reset(&self, id: &SessionId) -> Result<()> {
        let _guard = self.lock(id).await;
        self.store.reset(id).await?;
        info!("Session reset");
        Ok(())
    }

    /// Steps 1-4 of a turn; nothing is written unless every external call succeeded
    async fn run_turn(
        &self,
        id: &SessionId,
        concept: &str,
        prompt: &str,
        history: &[Turn],
    ) -> Result<String> {
        debug!("Step 1: Retrieving context");
        let context = tokio::time::timeout(self.retrieval_timeout, self.retriever.retrieve(prompt))
            .await
            .map_err(|_| {
                BarcraftError::Retrieval(format!(
                    "retrieval timed out after {}s",
                    self.retrieval_timeout.as_secs()
                ))
            })?
            .map_err(|e| match e {
                e @ (BarcraftError::Retrieval(_) | BarcraftError::RetrievalUnavailable(_)) => e,
                other => BarcraftError::Retrieval(other.to_string()),
            })
            .inspect_err(|e| warn!("Turn aborted before completion: {e}"))?;

        debug!("Step 2: Composing prompt ({} prior turns)", history.len());
        let composed = self.composer.compose(concept, &context, prompt, history);

        debug!("Step 3: Requesting completion");
        let reply = tokio::time::timeout(
            self.completion_timeout,
            self.completion.complete(&composed.messages),
        )
        .await
        .map_err(|_| CompletionError::Timeout(self.completion_timeout.as_secs()))
        .and_then(|r| r)
        .inspect_err(|e| warn!("Completion failed, conversation left unchanged: {e}"))?;

        debug!("Step 4: Committing exchange");
        self.store
            .append_exchange(id, Turn::user(composed.user_block), Turn::assistant(reply.clone()))
            .await?;

        info!("Turn completed ({} chars)", reply.len());
        Ok(reply)
    }
}

//! Session-scoped conversation storage
//!
//! Backends only implement load/save/remove/list; the conversation operations
//! (write-once concept, ordered appends, reset) are provided on top so both
//! backends share one set of semantics.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing::warn;

use crate::errors::BarcraftError;
use crate::errors::Result;
use crate::models::Role;
use crate::models::SessionId;
use crate::models::SessionState;
use crate::models::Turn;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Stored state, `None` for a session that was never written or was reset
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>>;

    /// Persist the whole state before returning
    async fn save(&self, state: &SessionState) -> Result<()>;

    async fn remove(&self, id: &SessionId) -> Result<()>;

    async fn list(&self) -> Result<Vec<SessionState>>;

    /// Current state, or a fresh empty one
    async fn snapshot(&self, id: &SessionId) -> Result<SessionState> {
        Ok(self
            .load(id)
            .await?
            .unwrap_or_else(|| SessionState::new(id.clone())))
    }

    async fn get_concept(&self, id: &SessionId) -> Result<Option<String>> {
        Ok(self.load(id).await?.and_then(|s| s.concept))
    }

    /// Write-once: fails with [`BarcraftError::AlreadySet`] until the session is reset
    async fn set_concept(&self, id: &SessionId, concept: &str) -> Result<()> {
        let mut state = self.snapshot(id).await?;
        if state.concept.is_some() {
            return Err(BarcraftError::AlreadySet(id.to_string()));
        }
        state.concept = Some(concept.to_string());
        state.touch();
        self.save(&state).await
    }

    async fn append_turn(&self, id: &SessionId, role: Role, text: &str) -> Result<()> {
        let mut state = self.snapshot(id).await?;
        state.turns.push(Turn::new(role, text));
        state.touch();
        self.save(&state).await
    }

    /// Appends a user turn and its reply with a single write
    ///
    /// The session must still exist with its concept; an exchange is never
    /// written into a session that was reset or purged while the turn ran.
    async fn append_exchange(&self, id: &SessionId, user: Turn, assistant: Turn) -> Result<()> {
        let mut state = self
            .load(id)
            .await?
            .filter(|s| s.concept.is_some())
            .ok_or_else(|| {
                BarcraftError::SessionStore(format!("session {id} has no concept, exchange dropped"))
            })?;
        state.turns.push(user);
        state.turns.push(assistant);
        state.touch();
        self.save(&state).await
    }

    async fn get_turns(&self, id: &SessionId) -> Result<Vec<Turn>> {
        Ok(self.load(id).await?.map(|s| s.turns).unwrap_or_default())
    }

    /// Clears concept and turns together
    async fn reset(&self, id: &SessionId) -> Result<()> {
        self.remove(id).await
    }

    /// Removes the session if it has been idle for longer than `max_idle_secs`
    ///
    /// Callers serialize this with turns on the same session.
    async fn remove_if_idle(&self, id: &SessionId, max_idle_secs: u64, now: i64) -> Result<bool> {
        match self.load(id).await? {
            Some(state) if state.is_idle(max_idle_secs, now) => {
                self.remove(id).await?;
                info!("Cleaned up expired session: {id}");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Process-local store, lost on restart
#[derive(Default, Clone)]
pub struct MemoryConversationStore {
    sessions: Arc<DashMap<SessionId, SessionState>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        self.sessions.insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionState>> {
        Ok(self.sessions.iter().map(|e| e.value().clone()).collect())
    }
}

/// One JSON document per session under a directory
#[derive(Debug, Clone)]
pub struct FileConversationStore {
    dir: PathBuf,
}

impl FileConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            BarcraftError::SessionStore(format!(
                "cannot create session directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.path_for(&state.session_id);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(state)?;

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<SessionState>> {
        let mut states = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<SessionState>(&bytes) {
                    Ok(state) => states.push(state),
                    Err(e) => warn!("Skipping unreadable session file {}: {e}", path.display()),
                },
                Err(e) => warn!("Skipping session file {}: {e}", path.display()),
            }
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise_contract(store: &dyn ConversationStore) {
        let id = SessionId::generate();

        assert_eq!(store.get_concept(&id).await.unwrap(), None);
        assert!(store.get_turns(&id).await.unwrap().is_empty());

        store.set_concept(&id, "speakeasy bar").await.unwrap();
        let err = store.set_concept(&id, "beach club").await.unwrap_err();
        assert!(matches!(err, BarcraftError::AlreadySet(_)));
        assert_eq!(
            store.get_concept(&id).await.unwrap().as_deref(),
            Some("speakeasy bar")
        );

        store.append_turn(&id, Role::User, "q1").await.unwrap();
        store.append_turn(&id, Role::Assistant, "a1").await.unwrap();
        store
            .append_exchange(&id, Turn::user("q2"), Turn::assistant("a2"))
            .await
            .unwrap();

        let turns = store.get_turns(&id).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(turns[2].role, Role::User);
        assert_eq!(turns[3].role, Role::Assistant);

        store.reset(&id).await.unwrap();
        let state = store.snapshot(&id).await.unwrap();
        assert!(state.is_empty());

        // Write-once again after reset
        store.set_concept(&id, "beach club").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        exercise_contract(&MemoryConversationStore::new()).await;
    }

    #[tokio::test]
    async fn test_file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise_contract(&FileConversationStore::new(dir.path()).unwrap()).await;
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = SessionId::generate();
        {
            let store = FileConversationStore::new(dir.path()).unwrap();
            store.set_concept(&id, "rooftop bar").await.unwrap();
            store
                .append_exchange(&id, Turn::user("q"), Turn::assistant("a"))
                .await
                .unwrap();
        }

        let reopened = FileConversationStore::new(dir.path()).unwrap();
        let state = reopened.snapshot(&id).await.unwrap();
        assert_eq!(state.concept.as_deref(), Some("rooftop bar"));
        assert_eq!(state.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_of_unknown_session_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path()).unwrap();
        store.reset(&SessionId::generate()).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_if_idle() {
        let store = MemoryConversationStore::new();
        let fresh = SessionId::generate();
        let stale = SessionId::generate();
        let now = chrono::Utc::now().timestamp();

        store.set_concept(&fresh, "wine bar").await.unwrap();
        let mut old = SessionState::new(stale.clone());
        old.concept = Some("dive bar".to_string());
        old.updated_at -= 10_000;
        store.save(&old).await.unwrap();

        assert!(!store.remove_if_idle(&fresh, 3_600, now).await.unwrap());
        assert!(store.remove_if_idle(&stale, 3_600, now).await.unwrap());
        assert!(!store.remove_if_idle(&stale, 3_600, now).await.unwrap());
        assert_eq!(store.session_count(), 1);
        assert!(store.load(&stale).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_exchange_needs_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path()).unwrap();
        let id = SessionId::generate();

        let err = store
            .append_exchange(&id, Turn::user("q"), Turn::assistant("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, BarcraftError::SessionStore(_)));
        assert!(store.load(&id).await.unwrap().is_none());

        store.set_concept(&id, "wine bar").await.unwrap();
        store.reset(&id).await.unwrap();
        assert!(store
            .append_exchange(&id, Turn::user("q"), Turn::assistant("a"))
            .await
            .is_err());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_list_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConversationStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("junk.json"), "not json").unwrap();
        store.set_concept(&SessionId::generate(), "cafe").await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}

//! Conversation state and the per-turn pipeline
//!
//! Each browser session owns one [`SessionState`](crate::models::SessionState):
//! a write-once venue concept plus an ordered list of turns. The
//! [`ConversationOrchestrator`] is the only writer during normal operation.

pub mod orchestrator;
pub mod store;

pub use orchestrator::ConversationOrchestrator;
pub use orchestrator::ConversationPhase;
pub use orchestrator::TurnOutcome;
pub use store::ConversationStore;
pub use store::FileConversationStore;
pub use store::MemoryConversationStore;

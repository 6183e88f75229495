//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::conversation::ConversationPhase;
use crate::conversation::TurnOutcome;
use crate::models::SessionState;
use crate::models::Turn;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Failure that still carries the unchanged view for the page to render
    pub fn error_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mail_enabled: bool,
}

/// Combined concept/prompt form submission
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// What the page shows for a session
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatView {
    pub phase: ConversationPhase,
    pub concept: Option<String>,
    pub turns: Vec<Turn>,
    /// Reply produced by the request that returned this view
    pub reply: Option<String>,
}

impl From<SessionState> for ChatView {
    fn from(state: SessionState) -> Self {
        Self {
            phase: ConversationPhase::of(&state),
            concept: state.concept,
            turns: state.turns,
            reply: None,
        }
    }
}

impl From<TurnOutcome> for ChatView {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            phase: ConversationPhase::for_concept(outcome.concept.as_deref()),
            concept: outcome.concept,
            turns: outcome.turns,
            reply: outcome.reply,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailSent {
    pub recipient: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_view_phase_follows_concept() {
        let view = ChatView::from(TurnOutcome {
            reply: Some("Try a Gimlet".to_string()),
            concept: Some("speakeasy bar".to_string()),
            turns: vec![Turn::user("gin"), Turn::assistant("Try a Gimlet")],
        });
        assert_eq!(view.phase, ConversationPhase::ConceptSet);
        assert_eq!(view.reply.as_deref(), Some("Try a Gimlet"));

        let empty = ChatView::from(TurnOutcome {
            reply: None,
            concept: None,
            turns: Vec::new(),
        });
        assert_eq!(empty.phase, ConversationPhase::Empty);
        assert_eq!(
            serde_json::to_value(&empty).unwrap()["phase"],
            serde_json::json!("EMPTY")
        );
    }
}

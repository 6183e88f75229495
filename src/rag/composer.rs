//! Prompt composition for one conversational turn

use crate::models::Role;
use crate::models::Turn;

/// A model request plus the user block that will be stored for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// System instruction, replayed history, then the new user block
    pub messages: Vec<Turn>,
    /// Labelled concept/context/prompt block, stored verbatim as the user turn
    pub user_block: String,
}

/// Builds model requests from a fixed system instruction
#[derive(Debug, Clone)]
pub struct PromptComposer {
    system_prompt: String,
    knowledge_label: String,
    history_char_budget: Option<usize>,
}

impl PromptComposer {
    pub fn new(system_prompt: impl Into<String>, knowledge_label: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            knowledge_label: knowledge_label.into(),
            history_char_budget: None,
        }
    }

    /// Cap the characters of history replayed per request
    #[must_use]
    pub fn with_history_budget(mut self, budget: Option<usize>) -> Self {
        self.history_char_budget = budget;
        self
    }

    /// The labelled block: concept, retrieved context, raw user text, in that order
    pub fn user_block(&self, concept: &str, context: &str, user_text: &str) -> String {
        format!(
            "Venue Concept: {concept}\n\nRelevant context from {label}:\n{context}\n\nUser Prompt:\n{user_text}\n",
            label = self.knowledge_label
        )
    }

    pub fn compose(
        &self,
        concept: &str,
        context: &str,
        user_text: &str,
        history: &[Turn],
    ) -> ComposedPrompt {
        let user_block = self.user_block(concept, context, user_text);
        let replayed = self.replayable_history(history);

        let mut messages = Vec::with_capacity(replayed.len() + 2);
        messages.push(Turn::new(Role::System, self.system_prompt.clone()));
        messages.extend(replayed.iter().cloned());
        messages.push(Turn::user(user_block.clone()));

        ComposedPrompt {
            messages,
            user_block,
        }
    }

    /// Suffix of `history` that fits the budget, cut on exchange boundaries
    fn replayable_history<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        let Some(budget) = self.history_char_budget else {
            return history;
        };

        let mut start = history.len();
        let mut used = 0usize;
        // Walk backwards one user/assistant pair at a time
        while start >= 2 {
            let pair = &history[start - 2..start];
            let cost: usize = pair.iter().map(|t| t.content.chars().count()).sum();
            if used + cost > budget {
                break;
            }
            used += cost;
            start -= 2;
        }

        &history[start..]
    }
}

/// Compose with an explicit system prompt, without a long-lived composer
pub fn compose(
    system_prompt: &str,
    concept: &str,
    context: &str,
    user_text: &str,
    history: &[Turn],
    knowledge_label: &str,
) -> ComposedPrompt {
    PromptComposer::new(system_prompt, knowledge_label).compose(concept, context, user_text, history)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> PromptComposer {
        PromptComposer::new("You are a bar manager.", "Cocktail Codex")
    }

    #[test]
    fn test_block_fields_in_order() {
        let block = composer().user_block("speakeasy bar", "Gin sours use 2:1:1", "suggest a gin cocktail");

        let concept_at = block.find("Venue Concept: speakeasy bar").unwrap();
        let context_at = block.find("Relevant context from Cocktail Codex:\nGin sours").unwrap();
        let prompt_at = block.find("User Prompt:\nsuggest a gin cocktail").unwrap();
        assert!(concept_at < context_at && context_at < prompt_at);
    }

    #[test]
    fn test_first_turn_messages() {
        let composed = composer().compose("tiki lounge", "ctx", "rum ideas", &[]);

        assert_eq!(composed.messages.len(), 2);
        assert_eq!(composed.messages[0].role, Role::System);
        assert_eq!(composed.messages[0].content, "You are a bar manager.");
        assert_eq!(composed.messages[1], Turn::user(composed.user_block.clone()));
    }

    #[test]
    fn test_history_replayed_verbatim_between_system_and_new_block() {
        let history = vec![Turn::user("old block"), Turn::assistant("old reply")];
        let composed = composer().compose("tiki lounge", "ctx", "more", &history);

        assert_eq!(composed.messages.len(), 4);
        assert_eq!(composed.messages[1], history[0]);
        assert_eq!(composed.messages[2], history[1]);
        assert!(composed.messages[3].content.contains("User Prompt:\nmore"));
    }

    #[test]
    fn test_budget_drops_oldest_pairs_only() {
        let history = vec![
            Turn::user("a".repeat(50)),
            Turn::assistant("b".repeat(50)),
            Turn::user("c".repeat(10)),
            Turn::assistant("d".repeat(10)),
        ];
        let composed = composer()
            .with_history_budget(Some(30))
            .compose("bar", "ctx", "next", &history);

        // system + newest pair + new block
        assert_eq!(composed.messages.len(), 4);
        assert_eq!(composed.messages[1].content, "c".repeat(10));
        assert_eq!(composed.messages[1].role, Role::User);
    }

    #[test]
    fn test_tiny_budget_keeps_no_history() {
        let history = vec![Turn::user("abc"), Turn::assistant("def")];
        let composed = composer()
            .with_history_budget(Some(1))
            .compose("bar", "ctx", "next", &history);
        assert_eq!(composed.messages.len(), 2);
    }

    #[test]
    fn test_free_function_matches_composer() {
        let a = compose("sys", "c", "x", "p", &[], "Codex");
        let b = PromptComposer::new("sys", "Codex").compose("c", "x", "p", &[]);
        assert_eq!(a, b);
    }
}

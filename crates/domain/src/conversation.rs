//! Conversation history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One completed turn, recorded when the corresponding transcript finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub transcript: String,
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_index: Option<u32>,
}

impl ConversationTurn {
    pub fn user(transcript: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            transcript: transcript.into(),
            item_id: item_id.into(),
            timestamp: Utc::now(),
            output_index: None,
            content_index: None,
        }
    }

    pub fn assistant(
        transcript: impl Into<String>,
        item_id: impl Into<String>,
        output_index: Option<u32>,
        content_index: Option<u32>,
    ) -> Self {
        Self {
            role: TurnRole::Assistant,
            transcript: transcript.into(),
            item_id: item_id.into(),
            timestamp: Utc::now(),
            output_index,
            content_index,
        }
    }
}

/// Everything the agent observed during one session, returned by `stop()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentHistory {
    pub turns: Vec<ConversationTurn>,
}

impl AgentHistory {
    /// Render the history as `[ROLE]: transcript` lines.
    pub fn format(&self) -> String {
        if self.turns.is_empty() {
            return "(no conversation yet)".into();
        }
        self.turns
            .iter()
            .map(|turn| format!("[{}]: {}", turn.role.as_str().to_uppercase(), turn.transcript))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_empty_history() {
        assert_eq!(AgentHistory::default().format(), "(no conversation yet)");
    }

    #[test]
    fn format_interleaves_roles() {
        let history = AgentHistory {
            turns: vec![
                ConversationTurn::user("hi", "i1"),
                ConversationTurn::assistant("hello!", "i2", Some(0), Some(0)),
            ],
        };
        assert_eq!(history.format(), "[USER]: hi\n[ASSISTANT]: hello!");
    }

    #[test]
    fn turn_serializes_role_lowercase() {
        let turn = ConversationTurn::user("hey", "i1");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("output_index").is_none());
    }
}

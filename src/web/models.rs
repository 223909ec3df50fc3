use serde::{Deserialize, Serialize};

use crate::error::RelayError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub content: String,
    #[serde(default)]
    pub is_user: bool,
}

/// Body of `POST /chat`. Every field is optional on the wire so that
/// validation, not the JSON decoder, reports what is missing.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub user_name: Option<String>,
    pub chat_history: Option<Vec<HistoryEntry>>,
    pub personality: Option<String>,
}

/// A chat request that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidChat {
    pub user_name: String,
    pub message: String,
    pub history: Vec<HistoryEntry>,
    pub personality: Option<String>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

impl ChatRequest {
    pub fn validate(self, require_personality: bool) -> Result<ValidChat, RelayError> {
        let user_name = present(self.user_name);
        let message = present(self.message);
        let personality = present(self.personality);

        let mut missing = Vec::new();
        if user_name.is_none() {
            missing.push("userName");
        }
        if message.is_none() {
            missing.push("message");
        }
        if require_personality && personality.is_none() {
            missing.push("personality");
        }

        match (user_name, message) {
            (Some(user_name), Some(message)) if missing.is_empty() => Ok(ValidChat {
                user_name,
                message,
                history: self.chat_history.unwrap_or_default(),
                personality,
            }),
            _ => Err(RelayError::MissingParameters(missing.join(", "))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub details: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Suffix appended to every archived chat object key.
pub const CHAT_KEY_SUFFIX: &str = "-chat.json";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// One archived prompt/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub timestamp: String,
    pub user_prompt: String,
    pub ai_response: String,
}

impl ChatRecord {
    pub fn new(user_prompt: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self::at(Utc::now(), user_prompt, ai_response)
    }

    pub fn at(
        when: DateTime<Utc>,
        user_prompt: impl Into<String>,
        ai_response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: when.to_rfc3339_opts(SecondsFormat::Micros, true),
            user_prompt: user_prompt.into(),
            ai_response: ai_response.into(),
        }
    }

    /// `<prefix><timestamp>-chat.json`. Two records stamped in the same
    /// microsecond map to the same key and the later write wins.
    pub fn object_key(&self, prefix: &str) -> String {
        format!("{}{}{}", prefix, self.timestamp, CHAT_KEY_SUFFIX)
    }
}

use crate::domain::query::QueryResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const GREETING: &str = "Ask me a question, and I'll generate a SQL query!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(default)]
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content.into())
    }

    pub fn answer(sql: String, result: QueryResult) -> Self {
        let mut message = Self::new(ChatRole::Assistant, sql.clone());
        message.sql = Some(sql);
        message.result = Some(result);
        message
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        let mut msg = Self::new(ChatRole::Assistant, format!("Error: {}", message));
        msg.is_error = true;
        msg
    }

    fn new(role: ChatRole, content: String) -> Self {
        Self {
            role,
            content,
            sql: None,
            result: None,
            is_error: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4096))]
    pub question: String,
}

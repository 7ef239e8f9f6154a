use crate::application::use_cases::prompt_builder::{PromptBuilder, SQL_SYSTEM_PROMPT};
use crate::domain::chat::{ChatMessage, GREETING};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::query::QueryResult;
use crate::infrastructure::db::QueryExecutor;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::extract_sql;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Linear history of one conversation, oldest first.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}

pub struct TextToSqlUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    llm_config: LLMConfig,
    prompt_builder: PromptBuilder,
    executor: QueryExecutor,
}

impl TextToSqlUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        llm_config: LLMConfig,
        prompt_builder: PromptBuilder,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            llm_client,
            llm_config,
            prompt_builder,
            executor,
        }
    }

    /// Ask the model for a SQL statement answering `question`.
    pub async fn generate_sql(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InputError("Question is empty".to_string()));
        }

        let prompt = self.prompt_builder.build(question)?;
        let raw = self
            .llm_client
            .generate(&self.llm_config, SQL_SYSTEM_PROMPT, &prompt)
            .await?;

        let sql = extract_sql(&raw);
        if sql.is_empty() {
            return Err(AppError::LLMError("Model returned no SQL".to_string()));
        }
        info!(question, sql = %sql, "Generated SQL");
        Ok(sql)
    }

    pub async fn execute(&self, question: &str) -> Result<(String, QueryResult)> {
        let sql = self.generate_sql(question).await?;
        let result = self.executor.execute(&sql).await?;
        Ok((sql, result))
    }

    /// Record the question and the answer (or the error) in `session`.
    ///
    /// The lock is only held while the history is updated, never across the
    /// model call or the query.
    pub async fn ask(&self, session: &Mutex<ChatSession>, question: &str) -> Result<ChatMessage> {
        with_session(session, |s| s.push(ChatMessage::user(question)))?;

        match self.execute(question).await {
            Ok((sql, result)) => {
                let answer = ChatMessage::answer(sql, result);
                with_session(session, |s| s.push(answer.clone()))?;
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "Question could not be answered");
                with_session(session, |s| s.push(ChatMessage::error(&e)))?;
                Err(e)
            }
        }
    }
}

pub fn with_session<T>(
    session: &Mutex<ChatSession>,
    f: impl FnOnce(&mut ChatSession) -> T,
) -> Result<T> {
    let mut guard = session
        .lock()
        .map_err(|_| AppError::Internal("Chat session lock poisoned".to_string()))?;
    Ok(f(&mut guard))
}

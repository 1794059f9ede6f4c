//! Grounded answer generation from an assembled context block.

use std::sync::Arc;

use ragline_llm::{ChatOptions, LlmError, LlmProvider, Message};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    Pending,
    Sent,
    Completed,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("answer request already {0:?}")]
    InvalidState(AnswerState),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl AnswerError {
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_transport())
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_malformed())
    }
}

/// Completion text returned verbatim. May be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

impl Answer {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Parse the answer strictly as JSON.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MalformedResponse` if the text is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, LlmError> {
        serde_json::from_str(&self.text).map_err(|e| LlmError::MalformedResponse {
            provider: "answer",
            reason: format!("answer is not valid JSON: {e}"),
        })
    }
}

#[must_use]
pub fn user_message(query: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}

/// One completion call. Moves `Pending -> Sent -> Completed | Failed` and can
/// only be sent once.
#[derive(Debug)]
pub struct AnswerRequest {
    messages: Vec<Message>,
    options: ChatOptions,
    state: AnswerState,
}

impl AnswerRequest {
    #[must_use]
    pub fn new(system_instruction: &str, query: &str, context: &str, options: ChatOptions) -> Self {
        Self {
            messages: vec![
                Message::system(system_instruction),
                Message::user(user_message(query, context)),
            ],
            options,
            state: AnswerState::Pending,
        }
    }

    #[must_use]
    pub fn state(&self) -> AnswerState {
        self.state
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// # Errors
    ///
    /// Returns `AnswerError::InvalidState` if the request was already sent, or
    /// the provider error if the completion call fails.
    pub async fn send<P: LlmProvider>(&mut self, provider: &P) -> Result<Answer, AnswerError> {
        if self.state != AnswerState::Pending {
            return Err(AnswerError::InvalidState(self.state));
        }
        self.state = AnswerState::Sent;
        tracing::debug!(
            "sending answer request to {} ({} context chars)",
            provider.name(),
            self.messages.last().map_or(0, |m| m.content.len())
        );

        match provider.chat(&self.messages, &self.options).await {
            Ok(text) => {
                self.state = AnswerState::Completed;
                if text.trim().is_empty() {
                    tracing::warn!("completion returned an empty answer");
                }
                Ok(Answer { text })
            }
            Err(e) => {
                self.state = AnswerState::Failed;
                Err(e.into())
            }
        }
    }
}

pub struct AnswerGenerator<P> {
    provider: Arc<P>,
    json_mode: bool,
}

impl<P: LlmProvider> AnswerGenerator<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            json_mode: false,
        }
    }

    #[must_use]
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    /// # Errors
    ///
    /// Returns the provider error; an empty answer is not an error.
    pub async fn answer(
        &self,
        system_instruction: &str,
        query: &str,
        context: &str,
        model_id: &str,
        temperature: f32,
    ) -> Result<Answer, AnswerError> {
        let options = ChatOptions::new(model_id, temperature).with_json_mode(self.json_mode);
        let mut request = AnswerRequest::new(system_instruction, query, context, options);
        request.send(self.provider.as_ref()).await
    }
}

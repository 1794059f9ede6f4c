use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-request completion settings.
///
/// `None` fields fall back to the provider's configured defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Ask the service for a JSON object response instead of free text.
    pub json_mode: bool,
}

impl ChatOptions {
    #[must_use]
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: Some(model.into()),
            temperature: Some(temperature),
            json_mode: false,
        }
    }

    #[must_use]
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the completion service and return the assistant text verbatim.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the service is unreachable or answers with a
    /// non-success status, and `LlmError::MalformedResponse` if the body lacks the
    /// expected fields. An empty but well-formed answer is `Ok(String::new())`.
    fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text with the provider's embedding model.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::EmbedUnsupported` when no embedding model is configured,
    /// otherwise the same transport and malformed-response errors as [`Self::chat`].
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Whether [`Self::embed`] can succeed. Checked before a pipeline is built.
    fn supports_embeddings(&self) -> bool;

    /// Identifier of the embedding model, used to tag a corpus.
    fn embedding_model(&self) -> Option<&str>;

    fn name(&self) -> &str;
}

//! Test-only mock provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::provider::{ChatOptions, LlmProvider, Message};

/// A chat call captured by [`MockProvider`].
#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub messages: Vec<Message>,
    pub options: ChatOptions,
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    chats: Arc<Mutex<Vec<RecordedChat>>>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    /// Returned for texts missing from `embeddings`.
    pub embedding: Vec<f32>,
    /// Exact text to vector lookup.
    pub embeddings: HashMap<String, Vec<f32>>,
    /// Texts whose embedding call fails.
    pub failing_texts: Vec<String>,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    pub malformed_chat: bool,
    /// Milliseconds to sleep before answering an embedding call.
    pub embed_delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            chats: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            embedding: vec![0.0, 0.0, 1.0],
            embeddings: HashMap::new(),
            failing_texts: Vec::new(),
            supports_embeddings: true,
            fail_chat: false,
            malformed_chat: false,
            embed_delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.push(text.into());
        self
    }

    #[must_use]
    pub fn with_embed_delay(mut self, ms: u64) -> Self {
        self.embed_delay_ms = ms;
        self
    }

    /// Chat calls received so far, oldest first.
    #[must_use]
    pub fn recorded_chats(&self) -> Vec<RecordedChat> {
        self.chats.lock().unwrap().clone()
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<String, crate::LlmError> {
        self.chats.lock().unwrap().push(RecordedChat {
            messages: messages.to_vec(),
            options: options.clone(),
        });
        if self.fail_chat {
            return Err(crate::LlmError::Status {
                provider: "mock",
                status: 500,
            });
        }
        if self.malformed_chat {
            return Err(crate::LlmError::MalformedResponse {
                provider: "mock",
                reason: "missing choices".into(),
            });
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.embed_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.embed_delay_ms)).await;
        }
        if !self.supports_embeddings {
            return Err(crate::LlmError::EmbedUnsupported { provider: "mock" });
        }
        if self.failing_texts.iter().any(|t| t == text) {
            return Err(crate::LlmError::Status {
                provider: "mock",
                status: 503,
            });
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.embedding.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn embedding_model(&self) -> Option<&str> {
        self.supports_embeddings.then_some("mock-embedding")
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

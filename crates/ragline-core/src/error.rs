use ragline_llm::LlmError;
use ragline_memory::RankError;
use ragline_memory::document::DocumentError;

use crate::answer::AnswerError;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] DocumentError),

    #[error("query embedding failed: {0}")]
    QueryEmbedding(#[source] LlmError),

    #[error(transparent)]
    Ranking(#[from] RankError),

    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error("ingestion incomplete: {embedded} of {total} chunks embedded")]
    Incomplete { embedded: usize, total: usize },

    #[error("no documents were ingested, nothing to search")]
    EmptyCorpus,
}

impl RagError {
    /// Pipeline stage that failed.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Ingest(DocumentError::Embedding(_)) => "embedding",
            Self::Ingest(_) => "ingest",
            Self::QueryEmbedding(_) => "query embedding",
            Self::Ranking(_) => "ranking",
            Self::Answer(_) => "answer",
            Self::Incomplete { .. } => "incomplete",
            Self::EmptyCorpus => "retrieval",
        }
    }
}

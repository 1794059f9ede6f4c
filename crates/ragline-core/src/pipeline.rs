use std::sync::Arc;

use ragline_llm::LlmProvider;
use ragline_memory::document::{
    Document, IngestReport, IngestionPipeline, SkippedChunk, TextSplitter,
};
use ragline_memory::{
    BatchStatus, BruteForceRanker, Corpus, Embedder, Ranker, ScoredChunk, assemble,
};
use tokio_util::sync::CancellationToken;

use crate::answer::{Answer, AnswerGenerator};
use crate::config::{Config, ConfigError};
use crate::error::RagError;

#[derive(Debug)]
pub struct RagAnswer {
    pub answer: Answer,
    /// Chunks the answer was grounded on, best first. Rank `n` is `<chunk> n` in the prompt.
    pub sources: Vec<ScoredChunk>,
}

/// Result of a full ingest-then-ask run.
#[derive(Debug)]
pub struct RagOutcome {
    pub answer: RagAnswer,
    pub chunk_count: usize,
    pub skipped: Vec<SkippedChunk>,
}

/// Chunk, embed, rank, and answer for one session.
pub struct RagPipeline<P, R = BruteForceRanker> {
    ingestion: IngestionPipeline<P>,
    ranker: R,
    answers: AnswerGenerator<P>,
    top_k: usize,
    system_instruction: String,
    completion_model: String,
    temperature: f32,
}

impl<P: LlmProvider> RagPipeline<P> {
    /// # Errors
    ///
    /// Returns `RagError::Config` if `config` fails validation or `provider` cannot
    /// embed text.
    pub fn from_config(config: &Config, provider: Arc<P>) -> Result<Self, RagError> {
        config.validate()?;
        if !provider.supports_embeddings() {
            return Err(ConfigError::Invalid(format!(
                "provider {} has no embedding model configured",
                provider.name()
            ))
            .into());
        }
        let splitter = TextSplitter::new(config.splitter_config())?;
        let embedder = Embedder::new(Arc::clone(&provider), config.embedder_config());

        Ok(Self {
            ingestion: IngestionPipeline::new(splitter, embedder),
            ranker: BruteForceRanker,
            answers: AnswerGenerator::new(provider).with_json_mode(config.llm.json_mode),
            top_k: config.retrieval.top_k,
            system_instruction: config.prompt.system_instruction.clone(),
            completion_model: config.llm.completion_model.clone(),
            temperature: config.llm.temperature,
        })
    }
}

impl<P: LlmProvider, R: Ranker> RagPipeline<P, R> {
    #[must_use]
    pub fn with_ranker<R2: Ranker>(self, ranker: R2) -> RagPipeline<P, R2> {
        RagPipeline {
            ingestion: self.ingestion,
            ranker,
            answers: self.answers,
            top_k: self.top_k,
            system_instruction: self.system_instruction,
            completion_model: self.completion_model,
            temperature: self.temperature,
        }
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Chunk and embed `documents` into a fresh corpus.
    ///
    /// Chunks dropped under the skip policy are listed in the report.
    ///
    /// # Errors
    ///
    /// Returns `RagError::Incomplete` if `cancel` fired before every chunk was
    /// embedded, or the ingestion error.
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, RagError> {
        let report = self.ingestion.ingest(documents, cancel).await?;
        if report.status == BatchStatus::Incomplete {
            return Err(RagError::Incomplete {
                embedded: report.corpus.len(),
                total: report.chunk_count,
            });
        }
        Ok(report)
    }

    /// Rank the corpus against `query`. An empty corpus returns no chunks
    /// without embedding the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be embedded or ranked.
    pub async fn retrieve(&self, query: &str, corpus: &Corpus) -> Result<Vec<ScoredChunk>, RagError> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self
            .ingestion
            .embedder()
            .embed(query)
            .await
            .map_err(RagError::QueryEmbedding)?;
        let ranked = self.ranker.rank(&vector, corpus.chunks(), self.top_k)?;
        tracing::info!("retrieved {} of {} chunks", ranked.len(), corpus.len());
        Ok(ranked)
    }

    /// Retrieve, assemble the context and generate an answer.
    ///
    /// # Errors
    ///
    /// Returns `RagError::EmptyCorpus` without any provider call when the corpus
    /// is empty, otherwise the failing stage's error.
    pub async fn ask(&self, query: &str, corpus: &Corpus) -> Result<RagAnswer, RagError> {
        if corpus.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        let sources = self.retrieve(query, corpus).await?;
        let texts: Vec<&str> = sources.iter().map(|c| c.content.as_str()).collect();
        let context = assemble(&texts);

        let answer = self
            .answers
            .answer(
                &self.system_instruction,
                query,
                &context,
                &self.completion_model,
                self.temperature,
            )
            .await?;
        Ok(RagAnswer { answer, sources })
    }

    /// Ingest `documents` and answer `query` against them.
    ///
    /// # Errors
    ///
    /// See [`Self::ingest`] and [`Self::ask`].
    pub async fn run(
        &self,
        documents: Vec<Document>,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<RagOutcome, RagError> {
        let report = self.ingest(documents, cancel).await?;
        let answer = self.ask(query, &report.corpus).await?;
        Ok(RagOutcome {
            answer,
            chunk_count: report.chunk_count,
            skipped: report.skipped,
        })
    }
}

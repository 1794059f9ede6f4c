use ragline_llm::LlmProvider;
use tokio_util::sync::CancellationToken;

use super::{Document, DocumentError, DocumentLoader, TextSplitter};
use crate::corpus::{Corpus, EmbeddedChunk};
use crate::embedder::{BatchEmbedding, BatchStatus, EmbedError, Embedder};

/// A chunk left out of the corpus because its embedding failed under the skip policy.
#[derive(Debug)]
pub struct SkippedChunk {
    pub source: String,
    pub chunk_index: usize,
    pub error: EmbedError,
}

#[derive(Debug)]
pub struct IngestReport {
    pub corpus: Corpus,
    /// Chunks produced by the splitter, embedded or not.
    pub chunk_count: usize,
    pub skipped: Vec<SkippedChunk>,
    pub status: BatchStatus,
}

impl IngestReport {
    /// Every produced chunk is in the corpus.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Complete && self.corpus.len() == self.chunk_count
    }
}

pub struct IngestionPipeline<P> {
    splitter: TextSplitter,
    embedder: Embedder<P>,
}

impl<P: LlmProvider> IngestionPipeline<P> {
    #[must_use]
    pub fn new(splitter: TextSplitter, embedder: Embedder<P>) -> Self {
        Self { splitter, embedder }
    }

    #[must_use]
    pub fn embedder(&self) -> &Embedder<P> {
        &self.embedder
    }

    /// Split every document, embed every chunk and collect them into a fresh corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding aborts or a vector is rejected by the corpus.
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, DocumentError> {
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| self.splitter.split(doc))
            .collect();
        tracing::info!(
            "split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let BatchEmbedding {
            vectors,
            failures,
            status,
        } = self.embedder.embed_batch(&texts, cancel).await?;

        let mut corpus = Corpus::new(self.embedder.embedding_model().map(str::to_owned));
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if let Some(vector) = vector {
                corpus.push(EmbeddedChunk::new(
                    chunk.content.clone(),
                    chunk.metadata.source.clone(),
                    chunk.chunk_index,
                    vector,
                ))?;
            }
        }

        let skipped: Vec<SkippedChunk> = failures
            .into_iter()
            .filter_map(|error| {
                let chunk = chunks.get(error.index()?)?;
                Some(SkippedChunk {
                    source: chunk.metadata.source.clone(),
                    chunk_index: chunk.chunk_index,
                    error,
                })
            })
            .collect();
        for s in &skipped {
            tracing::warn!("chunk {} of {} skipped: {}", s.chunk_index, s.source, s.error);
        }

        tracing::info!(
            "ingested {} of {} chunks into corpus",
            corpus.len(),
            chunks.len()
        );
        Ok(IngestReport {
            corpus,
            chunk_count: chunks.len(),
            skipped,
            status,
        })
    }

    /// # Errors
    ///
    /// Returns an error if loading, embedding, or corpus insertion fails.
    pub async fn load_and_ingest(
        &self,
        loader: &(dyn DocumentLoader + '_),
        path: &std::path::Path,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, DocumentError> {
        let documents = loader.load(path).await?;
        self.ingest(documents, cancel).await
    }
}

//! In-memory collection of embedded chunks.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CorpusError {
    #[error("vector dimension {found} does not match corpus dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("empty embedding vector")]
    EmptyVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub content: String,
    pub source: String,
    pub chunk_index: usize,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        chunk_index: usize,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            chunk_index,
            vector,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Chunks embedded with a single model. Every vector has the same dimension,
/// fixed by the first chunk pushed.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    embedding_model: Option<String>,
    dimension: Option<usize>,
    chunks: Vec<EmbeddedChunk>,
}

impl Corpus {
    #[must_use]
    pub fn new(embedding_model: Option<String>) -> Self {
        Self {
            embedding_model,
            dimension: None,
            chunks: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `CorpusError::EmptyVector` for a zero-length vector and
    /// `CorpusError::DimensionMismatch` when it disagrees with earlier chunks.
    pub fn push(&mut self, chunk: EmbeddedChunk) -> Result<(), CorpusError> {
        let found = chunk.dimension();
        if found == 0 {
            return Err(CorpusError::EmptyVector);
        }
        match self.dimension {
            Some(expected) if expected != found => {
                return Err(CorpusError::DimensionMismatch { expected, found });
            }
            Some(_) => {}
            None => self.dimension = Some(found),
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// # Errors
    ///
    /// Stops at the first chunk [`Self::push`] rejects; earlier chunks stay in the corpus.
    pub fn extend(
        &mut self,
        chunks: impl IntoIterator<Item = EmbeddedChunk>,
    ) -> Result<(), CorpusError> {
        for chunk in chunks {
            self.push(chunk)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn chunks(&self) -> &[EmbeddedChunk] {
        &self.chunks
    }

    #[must_use]
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

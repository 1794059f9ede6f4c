use crate::corpus::CorpusError;
use crate::embedder::EmbedError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("invalid chunk configuration: size {chunk_size}, overlap {chunk_overlap} (need size > 0 and overlap < size)")]
    InvalidChunkConfig {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

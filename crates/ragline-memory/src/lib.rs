//! Chunking, embedding, and brute-force similarity ranking over an in-memory corpus.

pub mod context;
pub mod corpus;
pub mod document;
pub mod embedder;
pub mod ranker;

pub use context::assemble;
pub use corpus::{Corpus, CorpusError, EmbeddedChunk};
pub use embedder::{BatchEmbedding, BatchStatus, EmbedError, Embedder, EmbedderConfig, FailurePolicy};
pub use ranker::{BruteForceRanker, RankError, Ranker, ScoredChunk, cosine_similarity};

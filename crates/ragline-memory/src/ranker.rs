//! Cosine-similarity ranking over an in-memory corpus.

use std::cmp::Ordering;

use crate::corpus::EmbeddedChunk;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RankError {
    #[error("query dimension {found} does not match chunk {index} dimension {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when the lengths differ, either norm is zero, or the result
/// is not finite.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    // Accumulate in f64 so large components do not overflow and tiny ones do
    // not vanish before the division.
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let score = (dot / (norm_a * norm_b)) as f32;
    score.is_finite().then_some(score)
}

pub trait Ranker: Send + Sync {
    /// Score every chunk against `query` and return at most `top_k`, best first.
    ///
    /// # Errors
    ///
    /// Returns `RankError::DimensionMismatch` if `query` and a chunk vector differ in length.
    fn rank(
        &self,
        query: &[f32],
        corpus: &[EmbeddedChunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RankError>;
}

/// Linear scan over every chunk.
///
/// Degenerate vectors score `f32::NEG_INFINITY` and sink to the bottom. Equal
/// scores keep corpus order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceRanker;

impl BruteForceRanker {
    /// Same as [`Ranker::rank`] but yields chunk texts only.
    ///
    /// # Errors
    ///
    /// See [`Ranker::rank`].
    pub fn rank_texts(
        &self,
        query: &[f32],
        corpus: &[EmbeddedChunk],
        top_k: usize,
    ) -> Result<Vec<String>, RankError> {
        Ok(self
            .rank(query, corpus, top_k)?
            .into_iter()
            .map(|c| c.content)
            .collect())
    }
}

impl Ranker for BruteForceRanker {
    fn rank(
        &self,
        query: &[f32],
        corpus: &[EmbeddedChunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RankError> {
        if let Some((index, chunk)) = corpus
            .iter()
            .enumerate()
            .find(|(_, c)| c.dimension() != query.len())
        {
            return Err(RankError::DimensionMismatch {
                index,
                expected: chunk.dimension(),
                found: query.len(),
            });
        }
        if top_k == 0 || corpus.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = corpus
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let score = cosine_similarity(query, &c.vector).unwrap_or(f32::NEG_INFINITY);
                (i, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        tracing::debug!(
            "ranked {} chunks, kept {} (best score {:?})",
            corpus.len(),
            scored.len(),
            scored.first().map(|(_, s)| *s)
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let chunk = &corpus[i];
                ScoredChunk {
                    content: chunk.content.clone(),
                    source: chunk.source.clone(),
                    chunk_index: chunk.chunk_index,
                    score,
                }
            })
            .collect())
    }
}

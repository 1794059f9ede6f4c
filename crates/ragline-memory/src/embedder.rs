//! Batch embedding with bounded concurrency and explicit partial results.

use std::sync::Arc;

use futures::StreamExt;
use ragline_llm::{LlmError, LlmProvider};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// What to do when a single text in a batch fails to embed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The first failure ends the batch.
    #[default]
    Abort,
    /// Leave the slot empty, record the failure and keep going.
    Skip,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding text {index} failed: {source}")]
    Failed {
        index: usize,
        #[source]
        source: LlmError,
    },

    #[error("embedding for text {index} has dimension {found}, expected {expected}")]
    Dimension {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("embedding batch incomplete: {embedded} of {total} texts embedded")]
    Incomplete { embedded: usize, total: usize },
}

impl EmbedError {
    /// Position of the offending text in the batch, if the error concerns one text.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Failed { index, .. } | Self::Dimension { index, .. } => Some(*index),
            Self::Incomplete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Complete,
    /// Cancelled before every text was attempted.
    Incomplete,
}

/// Result of [`Embedder::embed_batch`]. `vectors` has exactly one slot per input
/// text, in input order; a `None` slot was skipped or never attempted.
#[derive(Debug)]
pub struct BatchEmbedding {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub failures: Vec<EmbedError>,
    pub status: BatchStatus,
}

impl BatchEmbedding {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Complete && self.failures.is_empty()
    }

    #[must_use]
    pub fn embedded_count(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_some()).count()
    }

    /// Unwrap every slot.
    ///
    /// # Errors
    ///
    /// Returns `EmbedError::Incomplete` if any slot is empty.
    pub fn into_vectors(self) -> Result<Vec<Vec<f32>>, EmbedError> {
        let total = self.vectors.len();
        let embedded = self.embedded_count();
        if embedded != total {
            return Err(EmbedError::Incomplete { embedded, total });
        }
        Ok(self.vectors.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedderConfig {
    /// Maximum embedding requests in flight.
    pub concurrency: usize,
    /// Expected vector length. `None` lets the first vector of a batch decide.
    ///
    /// With [`FailurePolicy::Skip`] and no dimension set, a wrong-length first
    /// vector becomes the reference and every correct vector after it is skipped.
    /// Set this whenever skipping is enabled.
    pub dimension: Option<usize>,
    pub failure_policy: FailurePolicy,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dimension: None,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

pub struct Embedder<P> {
    provider: Arc<P>,
    config: EmbedderConfig,
}

impl<P: LlmProvider> Embedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: EmbedderConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn config(&self) -> EmbedderConfig {
        self.config
    }

    #[must_use]
    pub fn embedding_model(&self) -> Option<&str> {
        self.provider.embedding_model()
    }

    /// Embed a single text, typically a query.
    ///
    /// # Errors
    ///
    /// Propagates the provider error unchanged.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.provider.embed(text).await
    }

    /// Embed every text, keeping input order and length.
    ///
    /// Once `cancel` fires no further requests are started and the batch is
    /// returned with [`BatchStatus::Incomplete`].
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], the first failed or wrong-sized embedding.
    pub async fn embed_batch<T>(
        &self,
        texts: &[T],
        cancel: &CancellationToken,
    ) -> Result<BatchEmbedding, EmbedError>
    where
        T: AsRef<str> + Sync,
    {
        let total = texts.len();
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; total];
        let mut failures = Vec::new();
        let mut status = BatchStatus::Complete;
        let mut dimension = self.config.dimension;

        let provider = &self.provider;
        let results = futures::stream::iter(texts.iter().enumerate())
            .map(|(index, text)| async move { (index, provider.embed(text.as_ref()).await) })
            .buffered(self.config.concurrency.max(1));
        let mut results = std::pin::pin!(results);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    status = BatchStatus::Incomplete;
                    break;
                }
                next = results.next() => next,
            };
            let Some((index, result)) = next else {
                break;
            };

            let outcome = result
                .map_err(|source| EmbedError::Failed { index, source })
                .and_then(|vector| match dimension {
                    Some(expected) if vector.len() != expected => Err(EmbedError::Dimension {
                        index,
                        expected,
                        found: vector.len(),
                    }),
                    Some(_) => Ok(vector),
                    None => {
                        dimension = Some(vector.len());
                        Ok(vector)
                    }
                });

            match (outcome, self.config.failure_policy) {
                (Ok(vector), _) => vectors[index] = Some(vector),
                (Err(e), FailurePolicy::Abort) => return Err(e),
                (Err(e), FailurePolicy::Skip) => {
                    tracing::warn!("skipping text {index}: {e}");
                    failures.push(e);
                }
            }
        }

        let batch = BatchEmbedding {
            vectors,
            failures,
            status,
        };
        if status == BatchStatus::Incomplete {
            tracing::warn!(
                "embedding cancelled after {} of {total} texts",
                batch.embedded_count()
            );
        } else {
            tracing::debug!("embedded {} of {total} texts", batch.embedded_count());
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ragline_llm::mock::MockProvider;

    use super::*;

    fn embedder(mock: MockProvider, config: EmbedderConfig) -> Embedder<MockProvider> {
        Embedder::new(Arc::new(mock), config)
    }

    fn abc_mock() -> MockProvider {
        MockProvider::default()
            .with_embedding("a", vec![1.0, 0.0, 0.0])
            .with_embedding("b", vec![0.0, 1.0, 0.0])
            .with_embedding("c", vec![0.0, 0.0, 1.0])
    }

    #[tokio::test]
    async fn batch_preserves_order_and_length() {
        let embedder = embedder(
            abc_mock(),
            EmbedderConfig {
                concurrency: 3,
                ..EmbedderConfig::default()
            },
        );
        let batch = embedder
            .embed_batch(&["a", "b", "c"], &CancellationToken::new())
            .await
            .unwrap();
        assert!(batch.is_complete());
        let vectors = batch.into_vectors().unwrap();
        assert_eq!(
            vectors,
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0]
            ]
        );
    }

    #[tokio::test]
    async fn empty_batch_is_complete() {
        let embedder = embedder(MockProvider::default(), EmbedderConfig::default());
        let texts: [&str; 0] = [];
        let batch = embedder
            .embed_batch(&texts, &CancellationToken::new())
            .await
            .unwrap();
        assert!(batch.is_complete());
        assert!(batch.vectors.is_empty());
    }

    #[tokio::test]
    async fn abort_reports_failing_index() {
        let embedder = embedder(abc_mock().failing_on("b"), EmbedderConfig::default());
        let err = embedder
            .embed_batch(&["a", "b", "c"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::Failed { index: 1, ref source } if source.is_transport()));
        assert_eq!(err.index(), Some(1));
    }

    #[tokio::test]
    async fn skip_leaves_slot_empty_and_records_failure() {
        let embedder = embedder(
            abc_mock().failing_on("b"),
            EmbedderConfig {
                failure_policy: FailurePolicy::Skip,
                ..EmbedderConfig::default()
            },
        );
        let batch = embedder
            .embed_batch(&["a", "b", "c"], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Complete);
        assert!(!batch.is_complete());
        assert_eq!(batch.vectors.len(), 3);
        assert!(batch.vectors[1].is_none());
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].index(), Some(1));
        assert!(matches!(
            batch.into_vectors(),
            Err(EmbedError::Incomplete {
                embedded: 2,
                total: 3
            })
        ));
    }

    #[tokio::test]
    async fn configured_dimension_is_enforced() {
        let embedder = embedder(
            abc_mock(),
            EmbedderConfig {
                dimension: Some(1536),
                ..EmbedderConfig::default()
            },
        );
        let err = embedder
            .embed_batch(&["a"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbedError::Dimension {
                index: 0,
                expected: 1536,
                found: 3
            }
        ));
    }

    #[tokio::test]
    async fn skip_without_dimension_follows_first_vector() {
        let mock = abc_mock().with_embedding("short", vec![1.0, 0.0]);
        let skip = EmbedderConfig {
            failure_policy: FailurePolicy::Skip,
            ..EmbedderConfig::default()
        };

        let batch = embedder(mock.clone(), skip)
            .embed_batch(&["short", "a", "b"], &CancellationToken::new())
            .await
            .unwrap();
        let skipped: Vec<_> = batch.failures.iter().filter_map(EmbedError::index).collect();
        assert_eq!(skipped, vec![1, 2]);

        let batch = embedder(
            mock,
            EmbedderConfig {
                dimension: Some(3),
                ..skip
            },
        )
        .embed_batch(&["short", "a", "b"], &CancellationToken::new())
        .await
        .unwrap();
        let skipped: Vec<_> = batch.failures.iter().filter_map(EmbedError::index).collect();
        assert_eq!(skipped, vec![0]);
    }

    #[tokio::test]
    async fn first_vector_fixes_dimension() {
        let mock = abc_mock().with_embedding("short", vec![1.0, 0.0]);
        let embedder = embedder(mock, EmbedderConfig::default());
        let err = embedder
            .embed_batch(&["a", "short"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbedError::Dimension {
                index: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[tokio::test]
    async fn cancelled_before_start_issues_no_requests() {
        let mock = abc_mock();
        let embedder = embedder(mock.clone(), EmbedderConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let batch = embedder.embed_batch(&["a", "b"], &cancel).await.unwrap();
        assert_eq!(batch.status, BatchStatus::Incomplete);
        assert_eq!(batch.embedded_count(), 0);
        assert_eq!(batch.vectors.len(), 2);
        assert_eq!(mock.embed_calls(), 0);
    }

    #[tokio::test]
    async fn cancel_mid_batch_returns_partial_result() {
        let mock = abc_mock().with_embed_delay(50);
        let embedder = embedder(
            mock.clone(),
            EmbedderConfig {
                concurrency: 1,
                ..EmbedderConfig::default()
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            trigger.cancel();
        });

        let texts: Vec<String> = (0..20).map(|i| format!("text {i}")).collect();
        let batch = embedder.embed_batch(&texts, &cancel).await.unwrap();
        assert_eq!(batch.status, BatchStatus::Incomplete);
        assert_eq!(batch.vectors.len(), 20);
        assert!(batch.embedded_count() < 20);
        assert!(mock.embed_calls() < 20);
        assert!(matches!(
            batch.into_vectors(),
            Err(EmbedError::Incomplete { total: 20, .. })
        ));
    }

    #[tokio::test]
    async fn single_embed_passes_through() {
        let embedder = embedder(abc_mock(), EmbedderConfig::default());
        assert_eq!(embedder.embed("b").await.unwrap(), vec![0.0, 1.0, 0.0]);
        assert_eq!(embedder.embedding_model(), Some("mock-embedding"));
    }

    #[test]
    fn default_policy_aborts() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
        assert_eq!(EmbedderConfig::default().concurrency, 4);
    }
}

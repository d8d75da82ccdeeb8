//! Stage 5, `Batch-embed` (§4.8): groups chunks into `EmbeddingBatchSize`
//! batches, retries a failed batch with exponential backoff, and persists
//! chunks that still fail as `completion_status = incomplete` rather than
//! aborting the job.

use crate::config::PipelineConfig;
use crate::embedding::Embedder;
use crate::model::{CompletionStatus, KnowledgeChunk};

/// Outcome of embedding one job's full chunk set.
pub struct EmbedOutcome {
    /// Chunks with `completion_status = complete` and a stamped vector.
    pub complete: Vec<KnowledgeChunk>,
    /// Chunks that exhausted retries; persisted `incomplete`, no vector.
    pub incomplete: Vec<KnowledgeChunk>,
}

/// Embeds `chunks` in batches of `config.embedding_batch_size`, retrying a
/// failed batch up to `config.max_embedding_retries` times with exponential
/// backoff based on `config.retry_backoff_base`. A batch that still fails
/// after retries is persisted incomplete rather than aborting the job.
pub async fn embed_chunks(embedder: &dyn Embedder, chunks: Vec<KnowledgeChunk>, config: &PipelineConfig) -> EmbedOutcome {
    let mut complete = Vec::with_capacity(chunks.len());
    let mut incomplete = Vec::new();

    for batch in chunks.chunks(config.embedding_batch_size.max(1)).map(<[_]>::to_vec) {
        match embed_batch_with_retry(embedder, &batch, config).await {
            Ok(vectors) => {
                for (mut chunk, vector) in batch.into_iter().zip(vectors) {
                    chunk.completion_status = CompletionStatus::Complete;
                    chunk.embedding_model = Some(embedder.model().to_string());
                    chunk.embedding_version = Some(format!("{}:{}", embedder.model(), embedder.dimension()));
                    chunk.embedding_vector = Some(vector);
                    complete.push(chunk);
                }
            }
            Err(_) => {
                for mut chunk in batch {
                    chunk.completion_status = CompletionStatus::Incomplete;
                    chunk.embedding_vector = None;
                    incomplete.push(chunk);
                }
            }
        }
    }

    EmbedOutcome { complete, incomplete }
}

async fn embed_batch_with_retry(
    embedder: &dyn Embedder,
    batch: &[KnowledgeChunk],
    config: &PipelineConfig,
) -> crate::error::Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
    let mut attempt = 0;
    loop {
        match embedder.embed(&texts).await {
            Ok(vectors) => return Ok(vectors),
            Err(err) if attempt < config.max_embedding_retries => {
                attempt += 1;
                let backoff = config.retry_backoff_base * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
                let _ = err;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestionError, Result};
    use crate::model::{ChunkType, ProductId, TenantId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEmbedder {
        fail_times: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_times {
                return Err(IngestionError::EmbeddingBatchFailed {
                    attempts: call as u32 + 1,
                    reason: "simulated failure".to_string(),
                }
                .into());
            }
            Ok(texts.iter().map(|_| vec![0.1_f32; 4]).collect())
        }

        fn model(&self) -> &str {
            "flaky-test-embedder"
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct AlwaysFailsEmbedder;

    #[async_trait]
    impl Embedder for AlwaysFailsEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(IngestionError::EmbeddingBatchFailed {
                attempts: 1,
                reason: "always fails".to_string(),
            }
            .into())
        }

        fn model(&self) -> &str {
            "always-fails"
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    fn chunk() -> KnowledgeChunk {
        KnowledgeChunk::new(TenantId::new(), ProductId::new(), None, ChunkType::Global, "hello")
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_retry_budget() {
        let embedder = FlakyEmbedder {
            fail_times: 2,
            calls: AtomicUsize::new(0),
        };
        let config = PipelineConfig {
            retry_backoff_base: std::time::Duration::from_millis(1),
            ..PipelineConfig::new()
        };
        let outcome = embed_chunks(&embedder, vec![chunk()], &config).await;
        assert_eq!(outcome.complete.len(), 1);
        assert!(outcome.incomplete.is_empty());
        assert_eq!(outcome.complete[0].completion_status, CompletionStatus::Complete);
    }

    #[tokio::test]
    async fn persists_incomplete_after_exhausting_retries() {
        let embedder = AlwaysFailsEmbedder;
        let config = PipelineConfig {
            max_embedding_retries: 1,
            retry_backoff_base: std::time::Duration::from_millis(1),
            ..PipelineConfig::new()
        };
        let outcome = embed_chunks(&embedder, vec![chunk(), chunk()], &config).await;
        assert!(outcome.complete.is_empty());
        assert_eq!(outcome.incomplete.len(), 2);
        assert!(outcome.incomplete.iter().all(|c| c.completion_status == CompletionStatus::Incomplete));
        assert!(outcome.incomplete.iter().all(|c| c.embedding_vector.is_none()));
    }

    #[tokio::test]
    async fn partial_batch_failure_does_not_abort_other_batches() {
        let embedder = FlakyEmbedder {
            fail_times: 1,
            calls: AtomicUsize::new(0),
        };
        let mut config = PipelineConfig::new();
        config.embedding_batch_size = 50;
        config.retry_backoff_base = std::time::Duration::from_millis(1);
        let chunks: Vec<_> = (0..60).map(|_| chunk()).collect();
        let outcome = embed_chunks(&embedder, chunks, &config).await;
        assert_eq!(outcome.complete.len() + outcome.incomplete.len(), 60);
    }
}

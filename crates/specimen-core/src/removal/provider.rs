//! Background remover trait and the best-effort removal stage built on it.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::PipelineError;

/// A service that replaces an image's background with solid white.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the processor holds an `Arc<dyn BackgroundRemover>`).
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remover name for logging (e.g., "remove.bg").
    fn name(&self) -> &str;

    /// Replace the background of an encoded image, returning the new encoded bytes.
    async fn remove(&self, image: &[u8]) -> Result<Vec<u8>, PipelineError>;

    /// Upper bound on a single call.
    fn timeout(&self) -> Duration;
}

/// Outcome of the removal stage.
#[derive(Debug)]
pub enum RemovalOutcome {
    /// The service returned a replacement image
    Removed(Vec<u8>),
    /// No remover is configured, so nothing was attempted
    NotConfigured,
    /// The call was attempted and failed
    Failed(String),
}

impl RemovalOutcome {
    /// The replacement bytes, if removal succeeded.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Removed(bytes) => Some(bytes),
            Self::NotConfigured | Self::Failed(_) => None,
        }
    }
}

/// Run one removal attempt. Never fails: every problem becomes an outcome.
///
/// There are no retries; a single failure is final for this image.
pub async fn remove_background(
    remover: Option<&dyn BackgroundRemover>,
    image: &[u8],
) -> RemovalOutcome {
    let Some(remover) = remover else {
        tracing::warn!("Background removal not configured, keeping original background");
        return RemovalOutcome::NotConfigured;
    };

    let limit = remover.timeout();
    match tokio::time::timeout(limit, remover.remove(image)).await {
        Ok(Ok(bytes)) => {
            tracing::info!("Background removed successfully via {}", remover.name());
            RemovalOutcome::Removed(bytes)
        }
        Ok(Err(e)) => {
            tracing::error!("{} error: {e}", remover.name());
            RemovalOutcome::Failed(e.to_string())
        }
        Err(_) => {
            let e = PipelineError::Timeout {
                stage: "background removal".to_string(),
                timeout_ms: limit.as_millis() as u64,
            };
            tracing::error!("{} error: {e}", remover.name());
            RemovalOutcome::Failed(e.to_string())
        }
    }
}

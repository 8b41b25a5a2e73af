//! remove.bg background remover.
//!
//! Uploads the image as multipart form data and asks the service to backfill
//! the removed background with white, so the result can go straight into the
//! whitespace normalizer.

use super::provider::BackgroundRemover;
use crate::error::PipelineError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Client for the remove.bg HTTP API.
pub struct RemoveBgRemover {
    endpoint: String,
    api_key: String,
    size: String,
    bg_color: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoveBgRemover {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            size: "auto".to_string(),
            bg_color: "white".to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Override the requested output size and backfill color.
    pub fn with_options(mut self, size: &str, bg_color: &str) -> Self {
        self.size = size.to_string();
        self.bg_color = bg_color.to_string();
        self
    }

    fn form(&self, image: &[u8]) -> Form {
        Form::new()
            .part(
                "image_file",
                Part::bytes(image.to_vec()).file_name("image.png"),
            )
            .text("size", self.size.clone())
            .text("bg_color", self.bg_color.clone())
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgRemover {
    fn name(&self) -> &str {
        "remove.bg"
    }

    async fn remove(&self, image: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .timeout(self.timeout)
            .multipart(self.form(image))
            .send()
            .await
            .map_err(|e| PipelineError::Removal {
                message: format!("remove.bg request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Removal {
                message: format!("remove.bg HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let body = resp.bytes().await.map_err(|e| PipelineError::Removal {
            message: format!("Failed to read remove.bg response: {e}"),
            status_code: None,
        })?;

        if body.is_empty() {
            return Err(PipelineError::Removal {
                message: "remove.bg returned an empty body".to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        Ok(body.to_vec())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_request_auto_size_and_white_backfill() {
        let remover =
            RemoveBgRemover::new("http://localhost", "key", Duration::from_secs(30));
        assert_eq!(remover.size, "auto");
        assert_eq!(remover.bg_color, "white");
        assert_eq!(remover.timeout(), Duration::from_secs(30));
        assert_eq!(remover.name(), "remove.bg");
    }

    #[test]
    fn test_with_options_overrides() {
        let remover = RemoveBgRemover::new("http://localhost", "key", Duration::from_secs(1))
            .with_options("preview", "f0f0f0");
        assert_eq!(remover.size, "preview");
        assert_eq!(remover.bg_color, "f0f0f0");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_removal_error() {
        // Port 9 (discard) is closed on loopback, so the connect is refused
        let remover =
            RemoveBgRemover::new("http://127.0.0.1:9/v1.0/removebg", "key", Duration::from_secs(5));
        let err = remover.remove(&[0xFF, 0xD8, 0xFF]).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Removal {
                status_code: None,
                ..
            }
        ));
    }
}

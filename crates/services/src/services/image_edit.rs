//! Image-edit collaborator: given an addressable source image and an edit
//! instruction, return fresh image bytes.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum ImageEditError {
    #[error("Image edit API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Response parse error: {0}")]
    Parse(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Everything the provider needs to re-render an existing image.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub base_image_url: String,
    pub original_description: String,
    pub edit_prompt: String,
    pub aspect_ratio: String,
    pub model: Option<String>,
}

/// External image-editing collaborator. Calls may fail or time out; callers
/// surface that as a fatal error for the operation, no retries here.
#[async_trait]
pub trait ImageEditProvider: Send + Sync {
    async fn edit(&self, request: &ImageEditRequest) -> Result<Bytes, ImageEditError>;
}

/// Gemini-backed image editing.
///
/// Fetches the source image, then asks the model to re-render it under the
/// edit instruction, returning the inline image part of the response.
pub struct GeminiImageEdit {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiImageEdit {
    pub fn new() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").ok();

        if api_key.is_some() {
            tracing::info!("Gemini image-edit provider initialized with API key");
        } else {
            tracing::warn!(
                "Gemini image-edit provider created without API key - GEMINI_API_KEY env var not found"
            );
        }

        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: GEMINI_ENDPOINT.to_string(),
        }
    }

    /// Point the provider at a different endpoint (e.g. a local mock).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.endpoint = endpoint.into();
        provider
    }

    async fn fetch_source_image(&self, url: &str) -> Result<Bytes, ImageEditError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageEditError::Api {
                status: status.as_u16(),
                message: format!("Failed to fetch source image from {url}"),
            });
        }
        Ok(response.bytes().await?)
    }
}

impl Default for GeminiImageEdit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageEditProvider for GeminiImageEdit {
    async fn edit(&self, request: &ImageEditRequest) -> Result<Bytes, ImageEditError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ImageEditError::NotConfigured("GEMINI_API_KEY is not set".to_string())
        })?;

        let source = self.fetch_source_image(&request.base_image_url).await?;

        let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let prompt = format!(
            "Edit this image: {}. Original content: {}. Keep the {} aspect ratio.",
            request.edit_prompt, request.original_description, request.aspect_ratio
        );

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    {
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": BASE64.encode(&source)
                        }
                    }
                ]
            }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let url = format!("{}/{}:generateContent", self.endpoint, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageEditError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let parts = payload
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| ImageEditError::Parse("response has no content parts".to_string()))?;

        let encoded = parts
            .iter()
            .find_map(|part| part.pointer("/inlineData/data").and_then(|d| d.as_str()))
            .ok_or_else(|| ImageEditError::Parse("response has no inline image".to_string()))?;

        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| ImageEditError::Parse(format!("inline image is not valid base64: {e}")))?;

        tracing::info!(
            "Gemini edit produced {} bytes for prompt '{}'",
            bytes.len(),
            request.edit_prompt
        );
        Ok(Bytes::from(bytes))
    }
}

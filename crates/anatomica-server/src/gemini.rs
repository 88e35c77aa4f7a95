//! Label generation through the Gemini `generateContent` endpoint

use anatomica_core::{extract_label_array, generation_prompt, LabelEntry, LabelError, LabelGenerator, OrganKey};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateRequest {
    fn prompt(text: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        }
    }
}

impl GenerateResponse {
    /// Text of the first part of the first candidate
    fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .first()
            .map(|part| part.text.as_str())
    }
}

/// HTTP client for the text-generation service
pub struct GeminiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client; `timeout` bounds each whole request
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}:generateContent?key={}", self.api_url, self.api_key)
    }
}

impl LabelGenerator for GeminiClient {
    async fn generate(&self, organ: OrganKey) -> Result<Vec<LabelEntry>, LabelError> {
        debug!(%organ, url = %self.api_url, "Requesting generated labels");

        let response = self
            .client
            .post(self.endpoint())
            .json(&GenerateRequest::prompt(generation_prompt(organ)))
            .send()
            .await
            .map_err(|e| LabelError::Request(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(LabelError::Status(response.status().as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LabelError::Request(e.without_url().to_string()))?;

        let text = body.text().ok_or(LabelError::NoJsonArray)?;
        extract_label_array(text)
    }
}

//! Embedding provider abstraction and the OpenAI implementation.
//!
//! Defines the [`Embedder`] trait used by the store and query workflows and
//! [`OpenAIEmbedder`], which calls `POST {base_url}/embeddings`.
//!
//! Also provides vector utilities:
//! - [`cosine_similarity`] / [`cosine_distance`]: the same measure pgvector's `<=>` uses
//! - [`to_pgvector_literal`]: render a vector as a pgvector text literal (`[1,2,3]`)
//! - [`format_embedding`]: console preview of a vector
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Number of leading dimensions shown by [`format_embedding`] in preview mode.
pub const PREVIEW_DIMS: usize = 10;

/// An embedding vector plus the tokens the API billed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub total_tokens: u64,
}

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// One text per request; the store workflow embeds chunks sequentially.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI provider from configuration.
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let embedding = parse_openai_response(&json)?;
                        check_dims(&embedding.vector, self.dims)?;
                        tracing::debug!(
                            model = %self.model,
                            tokens = embedding.total_tokens,
                            "embedding received"
                        );
                        return Ok(embedding);
                    }

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

/// Parse an OpenAI embeddings response.
///
/// Reads `data[0].embedding` and `usage.total_tokens` (0 when absent).
pub fn parse_openai_response(json: &serde_json::Value) -> Result<Embedding> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let values = first
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

    let vector = values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: non-numeric embedding"))
        })
        .collect::<Result<Vec<f32>>>()?;

    let total_tokens = json
        .pointer("/usage/total_tokens")
        .and_then(|t| t.as_u64())
        .unwrap_or(0);

    Ok(Embedding {
        vector,
        total_tokens,
    })
}

/// Fail when a vector does not match the column dimensionality.
pub fn check_dims(vector: &[f32], dims: usize) -> Result<()> {
    if vector.len() != dims {
        bail!(
            "Embedding has {} dimensions, expected {}",
            vector.len(),
            dims
        );
    }
    Ok(())
}

/// Render a vector as a pgvector text literal, e.g. `[0.1,-2,3.5]`.
pub fn to_pgvector_literal(vec: &[f32]) -> String {
    let parts: Vec<String> = vec.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Format a vector for the console.
///
/// Preview mode prints the first [`PREVIEW_DIMS`] values and the total;
/// `full` prints every value as pretty JSON.
pub fn format_embedding(vec: &[f32], full: bool) -> String {
    if full {
        return serde_json::to_string_pretty(vec).unwrap_or_else(|_| format!("{:?}", vec));
    }
    let preview = &vec[..vec.len().min(PREVIEW_DIMS)];
    format!("{:?} ... ({} total dimensions)", preview, vec.len())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance as computed by pgvector's `<=>`: `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

//! Gemini `generateContent` client. The endpoint is consumed behind the
//! [`GenerationBackend`] trait so the classifier can run against a scripted
//! backend in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::{AppError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Low temperature keeps folder picks stable across retriggers.
pub const CLASSIFY_TEMPERATURE: f32 = 0.1;
/// A single decision is one folder name; a handful of tokens is enough.
pub const SINGLE_MAX_TOKENS: u32 = 10;
/// Batch replies carry a JSON array covering every note in the group.
pub const BATCH_MAX_TOKENS: u32 = 1024;

const VERIFY_PROMPT: &str = "Reply with exactly: OK";
const VERIFY_MARKER: &str = "OK";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl GenerateOptions {
    pub fn single(timeout: Duration) -> Self {
        Self {
            temperature: CLASSIFY_TEMPERATURE,
            max_output_tokens: SINGLE_MAX_TOKENS,
            timeout,
        }
    }

    pub fn batch(timeout: Duration) -> Self {
        Self {
            temperature: CLASSIFY_TEMPERATURE,
            max_output_tokens: BATCH_MAX_TOKENS,
            timeout,
        }
    }
}

/// Candidate texts returned by the endpoint. Only the first is consulted
/// downstream, but the full list is kept for logging.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub candidates: Vec<String>,
}

impl GenerateResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str, opts: GenerateOptions) -> Result<GenerateResponse>;
}

// --- wire types -----------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireReplyContent>,
}

#[derive(Deserialize)]
struct WireReplyContent {
    #[serde(default)]
    parts: Vec<WireReplyPart>,
}

#[derive(Deserialize)]
struct WireReplyPart {
    #[serde(default)]
    text: String,
}

impl<'a> WireRequest<'a> {
    fn new(prompt: &'a str, opts: GenerateOptions) -> Self {
        WireRequest {
            contents: vec![WireContent {
                parts: vec![WirePart { text: prompt }],
            }],
            generation_config: WireGenerationConfig {
                temperature: opts.temperature,
                max_output_tokens: opts.max_output_tokens,
            },
        }
    }
}

impl From<WireReply> for GenerateResponse {
    fn from(reply: WireReply) -> Self {
        let candidates = reply
            .candidates
            .into_iter()
            .map(|candidate| {
                candidate
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .map(|part| part.text)
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .unwrap_or_default()
            })
            .collect();
        Self { candidates }
    }
}

// --- client ---------------------------------------------------------------

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            model,
            api_key,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.base_url.clone(),
            settings.model.clone(),
            settings.resolved_api_key(),
        )
    }

    /// Probe the credential with a minimal fixed prompt. Returns whether the
    /// reply carried the expected marker.
    pub async fn verify_credential(&self) -> Result<bool> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::MissingCredential);
        }
        let opts = GenerateOptions {
            temperature: 0.0,
            max_output_tokens: SINGLE_MAX_TOKENS,
            timeout: VERIFY_TIMEOUT,
        };
        let reply = self.generate(VERIFY_PROMPT, opts).await?;
        Ok(reply
            .first_text()
            .is_some_and(|text| text.to_uppercase().contains(VERIFY_MARKER)))
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str, opts: GenerateOptions) -> Result<GenerateResponse> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::MissingCredential);
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = WireRequest::new(prompt, opts);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::Timeout {
                        ms: opts.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let reply: WireReply = response
            .json()
            .await
            .map_err(|err| AppError::Transport(format!("failed to decode reply: {err}")))?;
        let reply = GenerateResponse::from(reply);
        debug!(candidates = reply.candidates.len(), "model reply received");
        Ok(reply)
    }
}

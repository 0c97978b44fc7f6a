//! Google Gemini `generateContent` over blocking HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use newsqa_core::config::LlmConfig;
use newsqa_core::traits::Generator;

use crate::prompt::build_prompt;

#[derive(Debug, Error)]
pub enum GeminiError {
    /// Neither `llm.api_key` nor `GEMINI_API_KEY` is set.
    #[error("API key not found. Set llm.api_key or the GEMINI_API_KEY environment variable")]
    MissingApiKey,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The model answered without any text (e.g. blocked by safety filters).
    #[error("Model returned no text{}", finish_reason_suffix(.reason))]
    EmptyResponse { reason: Option<String> },
}

fn finish_reason_suffix(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(" (finish reason {r})")).unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GeminiGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
}

impl GeminiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self, GeminiError> {
        let api_key = config.resolve_api_key().ok_or(GeminiError::MissingApiKey)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| GeminiError::Network { message: e.to_string() })?;
        info!(model = %config.model, "gemini generator ready");
        Ok(Self {
            client,
            endpoint: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn call(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let request = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: self.temperature.map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GeminiError::Network { message: e.to_string() })?;

        let status = response.status();
        let body = response.text().map_err(|e| GeminiError::Network { message: e.to_string() })?;
        if !status.is_success() {
            let message = api_error_message(&body);
            return Err(GeminiError::Api { status: status.as_u16(), message });
        }
        parse_response(&body)
    }
}

impl Generator for GeminiGenerator {
    fn generate(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let prompt = build_prompt(question, context);
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "calling gemini");
        Ok(self.call(&prompt)?)
    }
}

/// Concatenated text parts of the first candidate.
pub fn parse_response(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GeminiError::Parse { message: e.to_string() })?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(GeminiError::EmptyResponse { reason: None })?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GeminiError::EmptyResponse { reason: candidate.finish_reason });
    }
    Ok(text.trim().to_string())
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

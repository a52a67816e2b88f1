use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{FeatureModelConfig, ProviderKind};
use crate::errors::LlmError;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// API credentials passed alongside each call
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    fn require(&self, provider: &'static str) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingCredentials(provider))
    }
}

/// Raw provider output plus the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCompletion {
    pub text: String,
    pub model: String,
}

/// A single LLM backend. Calls are made once: no retry, no fallback.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn call(&self, prompt: &str, credentials: &Credentials) -> Result<LlmCompletion, LlmError>;
}

// Anthropic Messages API

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    model: Option<String>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

pub struct ClaudeBackend {
    client: Client,
    model: String,
    max_tokens: u32,
}

impl ClaudeBackend {
    pub fn new(client: Client, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn call(&self, prompt: &str, credentials: &Credentials) -> Result<LlmCompletion, LlmError> {
        let api_key = credentials.require("claude")?;
        info!("Calling Claude (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ClaudeMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let body: ClaudeResponse = read_json(response).await?;

        if let Some(usage) = &body.usage {
            info!(
                "Claude completion generated. Tokens: {} input + {} output",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text: String = body
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("no text content in Claude response".to_string()));
        }

        Ok(LlmCompletion {
            text,
            model: body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// Gemini generateContent API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

pub struct GeminiBackend {
    client: Client,
    model: String,
    max_tokens: u32,
}

impl GeminiBackend {
    pub fn new(client: Client, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn call(&self, prompt: &str, credentials: &Credentials) -> Result<LlmCompletion, LlmError> {
        let api_key = credentials.require("gemini")?;
        info!("Calling Gemini (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let body: GeminiResponse = read_json(response).await?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("no text in Gemini response".to_string()));
        }

        Ok(LlmCompletion {
            text,
            model: self.model.clone(),
        })
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, LlmError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

/// Holds both backends and routes each call to the selected one
pub struct LlmService {
    claude: Arc<dyn LlmBackend>,
    gemini: Arc<dyn LlmBackend>,
}

impl LlmService {
    pub fn new(claude: Arc<dyn LlmBackend>, gemini: Arc<dyn LlmBackend>) -> Self {
        Self { claude, gemini }
    }

    /// Both HTTP backends. The configured feature only overrides the model
    /// and token budget of its own provider; the other keeps its defaults.
    pub fn from_config(client: Client, feature: &FeatureModelConfig) -> Self {
        let model_for = |kind: ProviderKind| {
            if feature.provider == kind {
                (feature.model.clone(), feature.max_tokens)
            } else {
                (kind.default_model().to_string(), feature.max_tokens)
            }
        };

        let (claude_model, claude_tokens) = model_for(ProviderKind::Claude);
        let (gemini_model, gemini_tokens) = model_for(ProviderKind::Gemini);

        Self::new(
            Arc::new(ClaudeBackend::new(client.clone(), claude_model, claude_tokens)),
            Arc::new(GeminiBackend::new(client, gemini_model, gemini_tokens)),
        )
    }

    pub fn backend(&self, provider: ProviderKind) -> &dyn LlmBackend {
        match provider {
            ProviderKind::Claude => self.claude.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }

    pub async fn call(
        &self,
        provider: ProviderKind,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<LlmCompletion, LlmError> {
        self.backend(provider).call(prompt, credentials).await
    }
}

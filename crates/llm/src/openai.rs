//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI-compatible chat
//! completion endpoints (OpenAI, Azure-style gateways, local servers).
//! Deployment ids are mapped to model names through `ProviderConfig.deployments`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{LlmError, LlmResult, ProviderConfig, SchemaHint};
use crate::http_client::build_http_client;

/// Default OpenAI API base URL
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a meticulous meeting analyst. Use only what the transcript \
says, quote timestamps exactly as they appear in it, and answer with a single JSON object.";

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(
            config.proxy_url.as_deref(),
            config.timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_BASE)
            .trim_end_matches('/')
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        model: &str,
        prompt: &str,
        schema_hint: Option<&SchemaHint>,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        if let Some(hint) = schema_hint {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": hint.name,
                    "schema": hint.schema,
                    "strict": false,
                },
            });
        }

        body
    }

    /// Extract the completion text from a parsed response
    fn parse_response(&self, response: OpenAIResponse) -> LlmResult<String> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::parse("response has no choices"))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(LlmError::ContentFiltered {
                message: format!("{}: completion withheld by content filter", response.model),
            });
        }

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "openai usage: model={} prompt_tokens={} completion_tokens={}",
                response.model,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        match choice.message.and_then(|m| m.content) {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(LlmError::parse("empty completion")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn invoke(
        &self,
        deployment_id: &str,
        prompt: &str,
        schema_hint: Option<&SchemaHint>,
    ) -> LlmResult<String> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let model = self.config.model_for(deployment_id);
        let body = self.build_request_body(model, prompt, schema_hint);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(e.to_string())
                } else {
                    LlmError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(match parse_http_error(status, &body_text, "openai") {
                LlmError::RateLimited { message, .. } => LlmError::RateLimited {
                    message,
                    retry_after,
                },
                LlmError::ModelNotFound { .. } => LlmError::ModelNotFound {
                    model: model.to_string(),
                },
                other => other,
            });
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(openai_response)
    }

    /// Validates configuration only; no request is sent.
    async fn health_check(&self) -> LlmResult<()> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(missing_api_key_error("openai")),
        }

        url::Url::parse(self.base_url()).map_err(|e| LlmError::InvalidRequest {
            message: format!("invalid base URL '{}': {}", self.base_url(), e),
        })?;

        if let Some((deployment, _)) = self
            .config
            .deployments
            .iter()
            .find(|(_, model)| model.trim().is_empty())
        {
            return Err(LlmError::ModelNotFound {
                model: format!("deployment '{}' maps to an empty model name", deployment),
            });
        }

        Ok(())
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

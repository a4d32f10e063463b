//! HTTP gateway for OpenAI-compatible chat-completion endpoints.
//!
//! OpenAI, Groq and Together all expose the same `/chat/completions` contract, so one
//! adapter covers every supported provider; only the base URL and key differ.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ringside_core::config::{AgentRole, LlmConfig, RoleModelConfig};

use crate::llm::{ChatMessage, Completion, GatewayError, LlmGateway};

pub struct OpenAiCompatibleGateway {
    client: Client,
    api_key: SecretString,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl OpenAiCompatibleGateway {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GatewayError::Configuration(format!(
                "no API key configured; set RINGSIDE_LLM_API_KEY or {}",
                config.provider.api_key_env()
            ))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().map_err(|error| {
            GatewayError::Configuration(format!("failed to create HTTP client: {error}"))
        })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_request(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<Response, GatewayError> {
        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    GatewayError::Timeout { timeout_secs: self.timeout_secs.unwrap_or_default() }
                } else if error.is_connect() {
                    GatewayError::Network(format!("connection failed: {error}"))
                } else {
                    GatewayError::Network(error.to_string())
                }
            })
    }

    async fn parse_response(response: Response) -> Result<Completion, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => GatewayError::AuthenticationFailed,
                500..=599 => GatewayError::Unavailable(format!("server error {status}: {body}")),
                code => GatewayError::Status { status: code, body },
            });
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| GatewayError::Decode(error.to_string()))?;

        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode("no choices in response".to_string()))?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            total_tokens: payload.usage.map(|usage| usage.total_tokens).unwrap_or(0),
        })
    }
}

#[async_trait]
impl LlmGateway for OpenAiCompatibleGateway {
    async fn invoke(
        &self,
        role: AgentRole,
        messages: &[ChatMessage],
        model: &RoleModelConfig,
    ) -> Result<Completion, GatewayError> {
        let request = ChatCompletionRequest {
            model: &model.model,
            messages,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        let response = self.send_request(&request).await?;
        let completion = Self::parse_response(response).await?;

        debug!(
            event_name = "gateway.completion",
            role = role.as_str(),
            model = %model.model,
            total_tokens = completion.total_tokens,
            "chat completion received"
        );
        Ok(completion)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

//! Provider gateways: one per provider, each able to "fetch the current model list or fail".

mod anthropic;
mod google;
mod openai;
mod openrouter;

pub use anthropic::AnthropicGateway;
pub use google::{GoogleAuth, GoogleGateway};
pub use openai::OpenAIGateway;
pub use openrouter::OpenRouterGateway;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::app;
use crate::core::config::Config;
use crate::core::models::{Metadata, ModelSource, ProviderName};

/// A model as reported by a provider, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModel {
    pub id: String,
    pub display_name: String,
    pub metadata: Metadata,
}

impl RawModel {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            metadata: Metadata::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{env_var} is not set")]
    MissingCredentials { env_var: &'static str },
    #[error("Authentication failed (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Client(String),
    #[error("Timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("Overall discovery deadline elapsed")]
    DeadlineElapsed,
    #[error("Cancelled")]
    Cancelled,
    #[error("Fetch task panicked")]
    Panicked,
    #[error("Invalid model record: {0}")]
    InvalidRecord(String),
}

#[async_trait]
pub trait ProviderGateway: Send + Sync {
    fn name(&self) -> ProviderName;

    fn source(&self) -> ModelSource {
        ModelSource::Api
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError>;
}

/// Gateways for every configured provider, in configuration order.
pub fn build_gateways(config: &Config) -> Vec<Arc<dyn ProviderGateway>> {
    config
        .providers
        .iter()
        .map(|&provider| -> Arc<dyn ProviderGateway> {
            let key = config.api_key_for(provider).map(str::to_string);
            match provider {
                ProviderName::OpenAI => Arc::new(OpenAIGateway::new(key)),
                ProviderName::Google if config.google_use_vertexai => {
                    Arc::new(GoogleGateway::with_auth(GoogleAuth::Vertex {
                        credentials: config.google_application_credentials.clone(),
                        location: config.google_cloud_location.clone(),
                    }))
                }
                ProviderName::Google => Arc::new(GoogleGateway::new(key)),
                ProviderName::Anthropic => Arc::new(AnthropicGateway),
                ProviderName::OpenRouter => Arc::new(OpenRouterGateway::new(key)),
            }
        })
        .collect()
}

/// HTTP client shared by the REST gateways, identified as `llm-discovery/<version>`.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(format!("{}/{}", app::NAME, app::VERSION))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("HTTP client setup failed, using defaults: {}", e);
            reqwest::Client::new()
        })
}

/// Turn a non-success response into a ProviderError, keeping the provider's message if any.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Unauthorized {
            status: status.as_u16(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: extract_error_message(&body).unwrap_or_else(|| truncate(&body, 200)),
    })
}

/// Pull `error.message` out of a JSON error body (OpenAI and Google both use this shape).
fn extract_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{}…", head)
}

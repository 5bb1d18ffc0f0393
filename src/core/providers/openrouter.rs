//! OpenRouter model listing via openrouter-rs.

use async_trait::async_trait;
use openrouter_rs::OpenRouterClient;

use crate::core::models::{MetadataValue, ProviderName};

use super::{ProviderError, ProviderGateway, RawModel};

pub struct OpenRouterGateway {
    api_key: Option<String>,
}

impl OpenRouterGateway {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl ProviderGateway for OpenRouterGateway {
    fn name(&self) -> ProviderName {
        ProviderName::OpenRouter
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials {
                env_var: "OPENROUTER_API_KEY",
            })?;

        let client = OpenRouterClient::builder()
            .api_key(api_key)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        let models = client
            .list_models()
            .await
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| {
                let mut raw = RawModel::new(m.id, m.name);
                if m.context_length > 0.0 {
                    raw.metadata.insert(
                        "context_length".into(),
                        MetadataValue::Integer(m.context_length as i64),
                    );
                }
                raw
            })
            .collect())
    }
}

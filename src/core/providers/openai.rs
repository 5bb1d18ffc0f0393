//! OpenAI model listing (GET /v1/models).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::models::{MetadataValue, ProviderName};

use super::{ProviderError, ProviderGateway, RawModel, error_for_status, http_client};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModel {
    id: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    owned_by: Option<String>,
}

impl From<OpenAIModel> for RawModel {
    fn from(m: OpenAIModel) -> Self {
        let mut raw = RawModel::new(m.id.clone(), m.id);
        if let Some(owner) = m.owned_by {
            raw.metadata.insert("owned_by".into(), MetadataValue::Text(owner));
        }
        if let Some(created) = m.created {
            raw.metadata.insert("created".into(), MetadataValue::Integer(created));
        }
        raw
    }
}

pub struct OpenAIGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAIGateway {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl ProviderGateway for OpenAIGateway {
    fn name(&self) -> ProviderName {
        ProviderName::OpenAI
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials {
                env_var: "OPENAI_API_KEY",
            })?;

        let url = format!("{}/models", self.base_url);
        log::debug!("Fetching OpenAI models from {}", url);
        let response = self.client.get(&url).bearer_auth(api_key).send().await?;
        let body: ListModelsResponse = error_for_status(response).await?.json().await?;
        Ok(body.data.into_iter().map(RawModel::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_without_key_fails_with_missing_credentials() {
        let err = OpenAIGateway::new(None).fetch().await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredentials {
                env_var: "OPENAI_API_KEY"
            }
        ));
    }

    #[test]
    fn response_maps_to_raw_models() {
        let json = r#"{"object":"list","data":[
            {"id":"gpt-4","object":"model","created":1687882411,"owned_by":"openai"},
            {"id":"whisper-1","object":"model"}
        ]}"#;
        let body: ListModelsResponse = serde_json::from_str(json).unwrap();
        let raw: Vec<RawModel> = body.data.into_iter().map(RawModel::from).collect();
        assert_eq!(raw[0].id, "gpt-4");
        assert_eq!(raw[0].display_name, "gpt-4");
        assert_eq!(
            raw[0].metadata.get("created"),
            Some(&MetadataValue::Integer(1687882411))
        );
        assert!(raw[1].metadata.is_empty());
    }
}

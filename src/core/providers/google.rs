//! Google model listing, following page tokens.
//!
//! With an API key this reads AI Studio (`GET /v1beta/models`). In Vertex AI
//! mode it exchanges an `authorized_user` credentials file for an access token
//! and reads the regional publisher model catalog.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::models::{MetadataValue, ProviderName};

use super::{ProviderError, ProviderGateway, RawModel, error_for_status, http_client};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PAGE_SIZE: &str = "1000";
const MAX_PAGES: usize = 20;
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const PUBLISHER_PREFIX: &str = "publishers/google/models/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GoogleModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleModel {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    input_token_limit: Option<i64>,
    #[serde(default)]
    output_token_limit: Option<i64>,
}

impl From<GoogleModel> for RawModel {
    fn from(m: GoogleModel) -> Self {
        let id = m
            .name
            .strip_prefix("models/")
            .unwrap_or(&m.name)
            .to_string();
        let display_name = m
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        let mut raw = RawModel::new(id, display_name);
        if let Some(limit) = m.input_token_limit {
            raw.metadata
                .insert("input_token_limit".into(), MetadataValue::Integer(limit));
        }
        if let Some(limit) = m.output_token_limit {
            raw.metadata
                .insert("output_token_limit".into(), MetadataValue::Integer(limit));
        }
        raw
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPublisherModelsResponse {
    #[serde(default)]
    publisher_models: Vec<PublisherModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublisherModel {
    name: String,
    #[serde(default)]
    version_id: Option<String>,
    #[serde(default)]
    launch_stage: Option<String>,
}

impl From<PublisherModel> for RawModel {
    fn from(m: PublisherModel) -> Self {
        let id = m
            .name
            .strip_prefix(PUBLISHER_PREFIX)
            .unwrap_or(&m.name)
            .to_string();
        let mut raw = RawModel::new(id.clone(), id);
        if let Some(version) = m.version_id {
            raw.metadata
                .insert("version_id".into(), MetadataValue::Text(version));
        }
        if let Some(stage) = m.launch_stage {
            raw.metadata
                .insert("launch_stage".into(), MetadataValue::Text(stage));
        }
        raw
    }
}

/// Application default credentials as written by `gcloud auth application-default login`.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    quota_project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// How the gateway authenticates against Google.
#[derive(Debug, Clone)]
pub enum GoogleAuth {
    ApiKey(Option<String>),
    Vertex {
        credentials: Option<PathBuf>,
        location: String,
    },
}

pub struct GoogleGateway {
    client: Client,
    auth: GoogleAuth,
    base_url: String,
}

impl GoogleGateway {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_auth(GoogleAuth::ApiKey(api_key))
    }

    pub fn with_auth(auth: GoogleAuth) -> Self {
        Self {
            client: http_client(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    async fn fetch_studio(&self, api_key: &str) -> Result<Vec<RawModel>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut query = vec![("key", api_key), ("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let response = self.client.get(&url).query(&query).send().await?;
            let page: ListModelsResponse = error_for_status(response).await?.json().await?;
            models.extend(page.models.into_iter().map(RawModel::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(models),
            }
        }
        log::warn!("Google model listing exceeded {} pages; truncating", MAX_PAGES);
        Ok(models)
    }

    async fn fetch_vertex(
        &self,
        credentials: &Path,
        location: &str,
    ) -> Result<Vec<RawModel>, ProviderError> {
        let creds = read_credentials(credentials)?;
        let access_token = self.access_token(&creds).await?;

        let url = format!(
            "https://{}-aiplatform.googleapis.com/v1beta1/publishers/google/models",
            location
        );
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&access_token)
                .query(&query);
            if let Some(project) = creds.quota_project_id.as_deref() {
                request = request.header("x-goog-user-project", project);
            }
            let page: ListPublisherModelsResponse =
                error_for_status(request.send().await?).await?.json().await?;
            models.extend(page.publisher_models.into_iter().map(RawModel::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(models),
            }
        }
        log::warn!("Vertex AI model listing exceeded {} pages; truncating", MAX_PAGES);
        Ok(models)
    }

    async fn access_token(&self, creds: &CredentialsFile) -> Result<String, ProviderError> {
        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| ProviderError::Client(format!("Credentials file has no {}", name)))
        };
        let body = serde_json::json!({
            "client_id": field(&creds.client_id, "client_id")?,
            "client_secret": field(&creds.client_secret, "client_secret")?,
            "refresh_token": field(&creds.refresh_token, "refresh_token")?,
            "grant_type": "refresh_token",
        });
        let token_uri = creds.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        log::debug!("Refreshing Vertex AI access token via {}", token_uri);
        let response = self.client.post(token_uri).json(&body).send().await?;
        let token: TokenResponse = error_for_status(response).await?.json().await?;
        Ok(token.access_token)
    }
}

fn read_credentials(path: &Path) -> Result<CredentialsFile, ProviderError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        ProviderError::Client(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let creds: CredentialsFile = serde_json::from_str(&data).map_err(|e| {
        ProviderError::Client(format!("Invalid credentials file {}: {}", path.display(), e))
    })?;
    if creds.kind != "authorized_user" {
        return Err(ProviderError::Client(format!(
            "Credentials of type '{}' are not supported; use `gcloud auth application-default login`",
            creds.kind
        )));
    }
    Ok(creds)
}

#[async_trait]
impl ProviderGateway for GoogleGateway {
    fn name(&self) -> ProviderName {
        ProviderName::Google
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
        match &self.auth {
            GoogleAuth::ApiKey(Some(key)) => self.fetch_studio(key).await,
            GoogleAuth::ApiKey(None) => Err(ProviderError::MissingCredentials {
                env_var: "GOOGLE_API_KEY",
            }),
            GoogleAuth::Vertex {
                credentials: Some(path),
                location,
            } => self.fetch_vertex(path, location).await,
            GoogleAuth::Vertex {
                credentials: None, ..
            } => Err(ProviderError::MissingCredentials {
                env_var: "GOOGLE_APPLICATION_CREDENTIALS",
            }),
        }
    }
}

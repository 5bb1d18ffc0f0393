use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::models::{ProviderName, UnknownProvider};
use crate::core::paths;

pub const DEFAULT_PROVIDERS: [ProviderName; 3] = [
    ProviderName::OpenAI,
    ProviderName::Google,
    ProviderName::Anthropic,
];
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    /// List Google models through Vertex AI instead of AI Studio.
    pub google_use_vertexai: bool,
    pub google_application_credentials: Option<PathBuf>,
    pub google_cloud_location: String,
    /// Providers to query, in configuration order.
    pub providers: Vec<ProviderName>,
    pub cache_dir: PathBuf,
    pub retention_days: u32,
    pub provider_timeout: Duration,
    pub overall_deadline: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    NoCacheDir,
    UnknownProvider(UnknownProvider),
    DuplicateProvider(ProviderName),
    NoProviders,
    InvalidNumber { var: &'static str, value: String },
    CredentialsFileNotFound(PathBuf),
    VertexWithoutCredentials,
    CacheDirNotWritable { path: PathBuf, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoCacheDir => write!(
                f,
                "No cache directory available; set LLM_DISCOVERY_CACHE_DIR"
            ),
            ConfigError::UnknownProvider(e) => write!(f, "LLM_DISCOVERY_PROVIDERS: {}", e),
            ConfigError::DuplicateProvider(p) => {
                write!(f, "LLM_DISCOVERY_PROVIDERS lists {} more than once", p)
            }
            ConfigError::NoProviders => write!(f, "LLM_DISCOVERY_PROVIDERS is empty"),
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{} must be a positive integer, got '{}'", var, value)
            }
            ConfigError::CredentialsFileNotFound(path) => write!(
                f,
                "Google application credentials file not found: {}. \
                 Point GOOGLE_APPLICATION_CREDENTIALS at a valid JSON file",
                path.display()
            ),
            ConfigError::VertexWithoutCredentials => write!(
                f,
                "GOOGLE_GENAI_USE_VERTEXAI is set to 'true', but GOOGLE_APPLICATION_CREDENTIALS is not set"
            ),
            ConfigError::CacheDirNotWritable { path, reason } => {
                write!(f, "Cache directory {} is not writable: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Defaults rooted at `cache_dir`, with no credentials.
    pub fn for_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            openai_api_key: None,
            google_api_key: None,
            openrouter_api_key: None,
            google_use_vertexai: false,
            google_application_credentials: None,
            google_cloud_location: DEFAULT_VERTEX_LOCATION.to_string(),
            providers: DEFAULT_PROVIDERS.to_vec(),
            cache_dir: cache_dir.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            provider_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            overall_deadline: None,
        }
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn api_key_for(&self, provider: ProviderName) -> Option<&str> {
        match provider {
            ProviderName::OpenAI => self.openai_api_key.as_deref(),
            ProviderName::Google => self.google_api_key.as_deref(),
            ProviderName::OpenRouter => self.openrouter_api_key.as_deref(),
            ProviderName::Anthropic => None,
        }
    }

    /// Create the cache directory if needed and check that files can be created in it.
    pub fn ensure_cache_dir(&self) -> Result<(), ConfigError> {
        let not_writable = |e: std::io::Error| ConfigError::CacheDirNotWritable {
            path: self.cache_dir.clone(),
            reason: e.to_string(),
        };
        fs::create_dir_all(&self.cache_dir).map_err(not_writable)?;
        let check = self
            .cache_dir
            .join(format!(".write-check-{}", uuid::Uuid::new_v4().simple()));
        fs::write(&check, b"").map_err(not_writable)?;
        let _ = fs::remove_file(&check);
        Ok(())
    }
}

/// Load configuration from the process environment.
pub fn load() -> Result<Config, ConfigError> {
    let config = load_from(|key| env::var(key).ok())?;
    config.ensure_cache_dir()?;
    Ok(config)
}

/// Load configuration through `lookup`. Empty values count as unset.
pub fn load_from<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let cache_dir = match get("LLM_DISCOVERY_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => paths::cache_dir().ok_or(ConfigError::NoCacheDir)?,
    };

    let mut providers = match get("LLM_DISCOVERY_PROVIDERS") {
        Some(list) => parse_providers(&list)?,
        None => DEFAULT_PROVIDERS.to_vec(),
    };

    let google_use_vertexai = get("GOOGLE_GENAI_USE_VERTEXAI")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let google_application_credentials = get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
    if let Some(path) = &google_application_credentials {
        check_credentials_file(path)?;
    }
    if google_use_vertexai {
        if google_application_credentials.is_none() {
            return Err(ConfigError::VertexWithoutCredentials);
        }
        // Vertex mode implies the Google provider.
        if !providers.contains(&ProviderName::Google) {
            providers.push(ProviderName::Google);
        }
    }

    let retention_days = match get("LLM_DISCOVERY_RETENTION_DAYS") {
        Some(v) => parse_positive::<u32>("LLM_DISCOVERY_RETENTION_DAYS", &v)?,
        None => DEFAULT_RETENTION_DAYS,
    };

    let timeout_secs = match get("LLM_DISCOVERY_TIMEOUT_SECS") {
        Some(v) => parse_positive::<u64>("LLM_DISCOVERY_TIMEOUT_SECS", &v)?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    let overall_deadline = get("LLM_DISCOVERY_DEADLINE_SECS")
        .map(|v| parse_positive::<u64>("LLM_DISCOVERY_DEADLINE_SECS", &v))
        .transpose()?
        .map(Duration::from_secs);

    Ok(Config {
        openai_api_key: get("OPENAI_API_KEY"),
        google_api_key: get("GOOGLE_API_KEY"),
        openrouter_api_key: get("OPENROUTER_API_KEY"),
        google_use_vertexai,
        google_application_credentials,
        google_cloud_location: get("GOOGLE_CLOUD_LOCATION")
            .unwrap_or_else(|| DEFAULT_VERTEX_LOCATION.to_string()),
        providers,
        cache_dir,
        retention_days,
        provider_timeout: Duration::from_secs(timeout_secs),
        overall_deadline,
    })
}

fn parse_providers(list: &str) -> Result<Vec<ProviderName>, ConfigError> {
    let mut providers = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let provider: ProviderName = item.parse().map_err(ConfigError::UnknownProvider)?;
        if providers.contains(&provider) {
            return Err(ConfigError::DuplicateProvider(provider));
        }
        providers.push(provider);
    }
    if providers.is_empty() {
        return Err(ConfigError::NoProviders);
    }
    Ok(providers)
}

fn check_credentials_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::CredentialsFileNotFound(path.to_path_buf()))
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}

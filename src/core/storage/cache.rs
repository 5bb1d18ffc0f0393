//! Single-slot "latest known good" model cache (models_cache.toml).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::{Model, ProviderName, ProviderResult};

use super::atomic::write_atomic;

pub const CACHE_FORMAT_VERSION: &str = "1.0";
const CACHE_FILE: &str = "models_cache.toml";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Cache file {} is corrupted: {reason}", .path.display())]
    Corrupted { path: PathBuf, reason: String },
    #[error("Refusing to cache incomplete results: {0} did not fetch successfully")]
    IncompleteResults(ProviderName),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub format_version: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProvider {
    pub provider_name: ProviderName,
    pub models: Vec<Model>,
}

/// Current best known model listing, grouped by provider in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    metadata: CacheMetadata,
    providers: Vec<CachedProvider>,
}

impl Cache {
    pub fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub fn providers(&self) -> &[CachedProvider] {
        &self.providers
    }

    pub fn models_for(&self, provider: ProviderName) -> Option<&[Model]> {
        self.providers
            .iter()
            .find(|p| p.provider_name == provider)
            .map(|p| p.models.as_slice())
    }

    /// Every cached model, providers in stored order.
    pub fn all_models(&self) -> Vec<Model> {
        self.providers
            .iter()
            .flat_map(|p| p.models.iter().cloned())
            .collect()
    }

    pub fn total_models(&self) -> usize {
        self.providers.iter().map(|p| p.models.len()).sum()
    }

    /// Time since the cache was last refreshed.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.metadata.last_updated_at
    }

    fn validate(&self) -> Result<(), String> {
        for provider in &self.providers {
            if let Some(m) = provider
                .models
                .iter()
                .find(|m| m.provider_name() != provider.provider_name)
            {
                return Err(format!(
                    "model {} belongs to {} but is stored under {}",
                    m.model_id(),
                    m.provider_name(),
                    provider.provider_name
                ));
            }
        }
        Ok(())
    }
}

pub struct CacheManager {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(CACHE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. `Ok(None)` means no cache has ever been written.
    pub fn read(&self) -> Result<Option<Cache>, CacheError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let cache: Cache = toml::from_str(&data).map_err(|e| self.corrupted(e.to_string()))?;
        cache.validate().map_err(|reason| self.corrupted(reason))?;
        Ok(Some(cache))
    }

    /// Replace the cache with fully successful provider results.
    /// Keeps the original `created_at` when a readable cache exists.
    pub fn update(&self, results: &[ProviderResult]) -> Result<Cache, CacheError> {
        if let Some(failed) = results.iter().find(|r| !r.is_success()) {
            return Err(CacheError::IncompleteResults(failed.provider_name()));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let created_at = match self.read() {
            Ok(Some(existing)) => existing.metadata.created_at,
            Ok(None) => now,
            Err(e) => {
                log::warn!("Replacing unreadable cache: {}", e);
                now
            }
        };

        let cache = Cache {
            metadata: CacheMetadata {
                format_version: CACHE_FORMAT_VERSION.to_string(),
                created_at,
                last_updated_at: now,
            },
            providers: results
                .iter()
                .map(|r| CachedProvider {
                    provider_name: r.provider_name(),
                    models: r.models().to_vec(),
                })
                .collect(),
        };

        let text = toml::to_string_pretty(&cache)?;
        write_atomic(&self.path, text.as_bytes()).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        log::debug!("Cache updated at {}", self.path.display());
        Ok(cache)
    }

    fn corrupted(&self, reason: String) -> CacheError {
        CacheError::Corrupted {
            path: self.path.clone(),
            reason,
        }
    }
}

//! Concurrent, all-or-nothing discovery across every configured provider.
//!
//! One task per provider, each with its own timeout, joined with a
//! wait-for-all barrier. The joined outcomes always become a persisted
//! [`Snapshot`]; the cache is only refreshed when every provider succeeded.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::models::{Model, ProviderResult, Snapshot, SnapshotError};
use crate::core::providers::{ProviderError, ProviderGateway, RawModel};
use crate::core::storage::{CacheError, CacheManager, SnapshotStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Not every provider succeeded. The snapshot was persisted; the cache was not touched.
    #[error("{}", describe_failure(.snapshot))]
    AggregateFetchFailure { snapshot: Box<Snapshot> },
    #[error("Failed to persist snapshot: {0}")]
    StorageWriteFailure(#[source] StorageError),
    #[error("Snapshot saved but cache update failed: {0}")]
    CacheWriteFailure(#[source] CacheError),
    #[error("Invalid provider set: {0}")]
    InvalidProviders(#[from] SnapshotError),
    #[error("Discovery cancelled")]
    Cancelled,
}

fn describe_failure(snapshot: &Snapshot) -> String {
    let failed: Vec<String> = snapshot
        .failed_results()
        .map(|r| {
            format!(
                "{} ({})",
                r.provider_name(),
                r.error_detail().unwrap_or("unknown error")
            )
        })
        .collect();
    format!(
        "Discovery {}: {}",
        snapshot.overall_status().as_str().replace('_', " "),
        failed.join(", ")
    )
}

/// Aborts the provider tasks if the coordinating future is dropped mid-join.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct DiscoveryCoordinator {
    store: Arc<SnapshotStore>,
    cache: Arc<CacheManager>,
    provider_timeout: Duration,
    overall_deadline: Option<Duration>,
    /// Serializes the snapshot-save + cache-update pair across concurrent runs.
    commit_lock: tokio::sync::Mutex<()>,
}

impl DiscoveryCoordinator {
    pub fn new(
        store: Arc<SnapshotStore>,
        cache: Arc<CacheManager>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            provider_timeout,
            overall_deadline: None,
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.overall_deadline = deadline;
        self
    }

    /// Fetch from every gateway, persist the snapshot, and refresh the cache on full success.
    ///
    /// Returns the snapshot only when every provider succeeded. Any other outcome is
    /// [`DiscoveryError::AggregateFetchFailure`] carrying the persisted snapshot.
    /// Nothing is written when `cancel` fires before the join completes.
    pub async fn discover(
        &self,
        gateways: &[Arc<dyn ProviderGateway>],
        cancel: &CancellationToken,
    ) -> Result<Snapshot, DiscoveryError> {
        check_unique(gateways)?;

        let results = self.fetch_all(gateways, cancel).await;
        if cancel.is_cancelled() {
            log::info!("Discovery cancelled; nothing persisted");
            return Err(DiscoveryError::Cancelled);
        }
        let snapshot = Snapshot::new(results)?;

        let _commit = self.commit_lock.lock().await;
        self.store
            .save(&snapshot)
            .map_err(DiscoveryError::StorageWriteFailure)?;

        if !snapshot.is_success() {
            for failed in snapshot.failed_results() {
                log::warn!(
                    "{} failed: {}",
                    failed.provider_name(),
                    failed.error_detail().unwrap_or("unknown error")
                );
            }
            return Err(DiscoveryError::AggregateFetchFailure {
                snapshot: Box::new(snapshot),
            });
        }

        self.cache
            .update(snapshot.provider_results())
            .map_err(DiscoveryError::CacheWriteFailure)?;
        log::info!(
            "Discovered {} models from {} providers",
            snapshot.total_models(),
            snapshot.provider_results().len()
        );
        Ok(snapshot)
    }

    /// Run every fetch concurrently and wait for all of them. Results follow gateway order.
    async fn fetch_all(
        &self,
        gateways: &[Arc<dyn ProviderGateway>],
        cancel: &CancellationToken,
    ) -> Vec<ProviderResult> {
        let deadline = self.overall_deadline.map(|d| Instant::now() + d);

        let handles: Vec<_> = gateways
            .iter()
            .map(|gateway| {
                tokio::spawn(fetch_one(
                    Arc::clone(gateway),
                    self.provider_timeout,
                    deadline,
                    cancel.child_token(),
                ))
            })
            .collect();
        let _guard = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

        join_all(handles)
            .await
            .into_iter()
            .zip(gateways)
            .map(|(joined, gateway)| {
                joined.unwrap_or_else(|e| {
                    log::error!("{} fetch task failed: {}", gateway.name(), e);
                    let err = if e.is_cancelled() {
                        ProviderError::Cancelled
                    } else {
                        ProviderError::Panicked
                    };
                    ProviderResult::failure(gateway.name(), err.to_string())
                })
            })
            .collect()
    }
}

fn check_unique(gateways: &[Arc<dyn ProviderGateway>]) -> Result<(), SnapshotError> {
    if gateways.is_empty() {
        return Err(SnapshotError::NoProviders);
    }
    let mut seen = HashSet::new();
    for gateway in gateways {
        if !seen.insert(gateway.name()) {
            return Err(SnapshotError::DuplicateProvider(gateway.name()));
        }
    }
    Ok(())
}

async fn fetch_one(
    gateway: Arc<dyn ProviderGateway>,
    timeout: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
) -> ProviderResult {
    let provider = gateway.name();
    log::debug!("Fetching models from {}", provider);

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        _ = wait_until(deadline) => Err(ProviderError::DeadlineElapsed),
        fetched = tokio::time::timeout(timeout, gateway.fetch()) => {
            fetched.unwrap_or(Err(ProviderError::Timeout(timeout)))
        }
    };

    match outcome.and_then(|raw| build_models(gateway.as_ref(), raw)) {
        Ok(models) => {
            log::debug!("{}: {} models", provider, models.len());
            ProviderResult::success(provider, models)
        }
        Err(e) => ProviderResult::failure(provider, e.to_string()),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Validate raw records into models. One bad or duplicate record fails the provider.
fn build_models(
    gateway: &dyn ProviderGateway,
    raw: Vec<RawModel>,
) -> Result<Vec<Model>, ProviderError> {
    let fetched_at = Utc::now();
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|r| {
            let model = Model::new(
                r.id,
                r.display_name,
                gateway.name(),
                gateway.source(),
                fetched_at,
                r.metadata,
            )
            .map_err(|e| ProviderError::InvalidRecord(e.to_string()))?;
            if !seen.insert(model.model_id().to_string()) {
                return Err(ProviderError::InvalidRecord(format!(
                    "duplicate model id {}",
                    model.model_id()
                )));
            }
            Ok(model)
        })
        .collect()
}

#[cfg(test)]
mod tests;

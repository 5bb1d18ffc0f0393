//! End-to-end operations behind the CLI: update, offline reads, diffs, retention.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::changes::{self, Detection};
use crate::core::config::Config;
use crate::core::discovery::{DiscoveryCoordinator, DiscoveryError};
use crate::core::models::{Change, Snapshot};
use crate::core::providers::{self, ProviderGateway};
use crate::core::storage::{Cache, CacheError, CacheManager, SnapshotStore, StorageError};

/// Result of a successful `update`.
#[derive(Debug)]
pub struct UpdateReport {
    pub snapshot: Snapshot,
    pub detection: Detection,
    pub pruned: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub struct DiscoveryService {
    config: Config,
    store: Arc<SnapshotStore>,
    cache: Arc<CacheManager>,
}

impl DiscoveryService {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(SnapshotStore::new(&config.cache_dir));
        let cache = Arc::new(CacheManager::new(&config.cache_dir));
        Self {
            config,
            store,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Discover with the configured gateways.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<UpdateReport, ServiceError> {
        let gateways = providers::build_gateways(&self.config);
        self.update_with(&gateways, cancel).await
    }

    /// Discover, then diff against the previous snapshot, record the ledger, and prune.
    pub async fn update_with(
        &self,
        gateways: &[Arc<dyn ProviderGateway>],
        cancel: &CancellationToken,
    ) -> Result<UpdateReport, ServiceError> {
        let previous = self.store.load_latest()?;

        let coordinator = DiscoveryCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.config.provider_timeout,
        )
        .with_deadline(self.config.overall_deadline);
        let snapshot = coordinator.discover(gateways, cancel).await?;

        let detection = changes::detect(previous.as_ref(), &snapshot);
        if let Detection::Changes(list) = &detection {
            self.store.save_changes(snapshot.snapshot_id(), list)?;
        }

        // Retention is housekeeping; a failure here must not fail a committed update.
        let pruned = self.store.prune(self.config.retention()).unwrap_or_else(|e| {
            log::warn!("Snapshot pruning failed: {}", e);
            0
        });

        Ok(UpdateReport {
            snapshot,
            detection,
            pruned,
        })
    }

    /// The offline cache. `Ok(None)` when discovery never succeeded.
    pub fn cached_models(&self) -> Result<Option<Cache>, CacheError> {
        self.cache.read()
    }

    /// Ledger recorded by the latest update, with the snapshot it belongs to.
    pub fn latest_changes(&self) -> Result<Option<(Snapshot, Option<Vec<Change>>)>, StorageError> {
        let Some(latest) = self.store.load_latest()? else {
            return Ok(None);
        };
        let ledger = self.store.load_changes(latest.snapshot_id())?;
        Ok(Some((latest, ledger)))
    }

    /// Diff two stored snapshots on demand.
    pub fn diff(&self, from: Uuid, to: Uuid) -> Result<Detection, StorageError> {
        let previous = self.store.load(from)?;
        let current = self.store.load(to)?;
        Ok(changes::detect(Some(&previous), &current))
    }

    pub fn prune(&self, retention_days: u32) -> Result<usize, StorageError> {
        self.store
            .prune(chrono::Duration::days(i64::from(retention_days)))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::models::{ChangeType, ProviderName};
    use crate::core::providers::{ProviderError, RawModel};

    struct Fixed(ProviderName, Result<Vec<&'static str>, &'static str>);

    #[async_trait]
    impl ProviderGateway for Fixed {
        fn name(&self) -> ProviderName {
            self.0
        }

        async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
            match &self.1 {
                Ok(ids) => Ok(ids.iter().map(|id| RawModel::new(*id, *id)).collect()),
                Err(msg) => Err(ProviderError::Client(msg.to_string())),
            }
        }
    }

    fn gateways(
        openai: Result<Vec<&'static str>, &'static str>,
        google: Result<Vec<&'static str>, &'static str>,
    ) -> Vec<Arc<dyn ProviderGateway>> {
        vec![
            Arc::new(Fixed(ProviderName::OpenAI, openai)),
            Arc::new(Fixed(ProviderName::Google, google)),
        ]
    }

    fn service(dir: &tempfile::TempDir) -> DiscoveryService {
        DiscoveryService::new(Config::for_cache_dir(dir.path()))
    }

    #[tokio::test]
    async fn first_update_is_baseline_and_second_records_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let cancel = CancellationToken::new();

        let first = svc
            .update_with(&gateways(Ok(vec!["gpt-4", "gpt-3.5"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap();
        assert!(first.detection.is_baseline());
        assert!(svc.store().load_changes(first.snapshot.snapshot_id()).unwrap().is_none());

        let second = svc
            .update_with(&gateways(Ok(vec!["gpt-4", "gpt-5"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap();
        let kinds: Vec<_> = second
            .detection
            .changes()
            .iter()
            .map(|c| (c.change_type(), c.model_id().to_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ChangeType::Added, "gpt-5".to_string()),
                (ChangeType::Removed, "gpt-3.5".to_string()),
            ]
        );

        let (latest, ledger) = svc.latest_changes().unwrap().unwrap();
        assert_eq!(latest.snapshot_id(), second.snapshot.snapshot_id());
        assert_eq!(ledger.unwrap(), second.detection.changes());
    }

    #[tokio::test]
    async fn failed_update_keeps_cache_and_reports_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let cancel = CancellationToken::new();
        svc.update_with(&gateways(Ok(vec!["gpt-4"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap();
        let before = svc.cached_models().unwrap().unwrap();

        let err = svc
            .update_with(&gateways(Ok(vec!["gpt-4"]), Err("HTTP 500")), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Discovery(DiscoveryError::AggregateFetchFailure { .. })
        ));
        assert_eq!(svc.cached_models().unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn diff_between_stored_snapshots_sees_outage_as_removal() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let cancel = CancellationToken::new();
        let t1 = svc
            .update_with(&gateways(Ok(vec!["gpt-4"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap()
            .snapshot;
        let t2 = match svc
            .update_with(&gateways(Ok(vec!["gpt-4"]), Err("down")), &cancel)
            .await
        {
            Err(ServiceError::Discovery(DiscoveryError::AggregateFetchFailure { snapshot })) => {
                *snapshot
            }
            other => panic!("expected aggregate failure, got {:?}", other),
        };

        let detection = svc.diff(t1.snapshot_id(), t2.snapshot_id()).unwrap();
        assert_eq!(detection.changes().len(), 1);
        assert_eq!(detection.changes()[0].change_type(), ChangeType::Removed);
        assert_eq!(detection.changes()[0].provider_name(), ProviderName::Google);
    }

    #[tokio::test]
    async fn update_over_corrupted_latest_fails_instead_of_rebaselining() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let cancel = CancellationToken::new();
        let first = svc
            .update_with(&gateways(Ok(vec!["gpt-4"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap();
        let path = svc
            .store()
            .snapshots_dir()
            .join(format!("{}.json", first.snapshot.snapshot_id()));
        std::fs::write(&path, "{ truncated").unwrap();

        let err = svc
            .update_with(&gateways(Ok(vec!["gpt-5"]), Ok(vec!["gemini-pro"])), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Storage(StorageError::Corrupted { .. })
        ));
        assert_eq!(std::fs::read_dir(svc.store().snapshots_dir()).unwrap().count(), 1);
    }

    #[test]
    fn diff_unknown_snapshot_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let err = svc.diff(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StorageError::SnapshotNotFound(_)));
    }
}

//! Coordinator tests with in-memory gateways.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::discovery::{DiscoveryCoordinator, DiscoveryError};
use crate::core::models::{ModelSource, OverallStatus, ProviderName, Snapshot};
use crate::core::providers::{
    GoogleAuth, GoogleGateway, OpenAIGateway, ProviderError, ProviderGateway, RawModel,
};
use crate::core::storage::{CacheManager, SnapshotStore};

use ProviderName::{Anthropic, Google, OpenAI};

enum Behavior {
    Models(Vec<&'static str>),
    Fail(&'static str),
    Hang,
    Slow(Duration, Vec<&'static str>),
    Panic,
}

struct FakeGateway {
    name: ProviderName,
    behavior: Behavior,
}

fn gateway(name: ProviderName, behavior: Behavior) -> Arc<dyn ProviderGateway> {
    Arc::new(FakeGateway { name, behavior })
}

fn raw(ids: &[&str]) -> Vec<RawModel> {
    ids.iter().map(|id| RawModel::new(*id, id.to_uppercase())).collect()
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn source(&self) -> ModelSource {
        if self.name == Anthropic {
            ModelSource::Manual
        } else {
            ModelSource::Api
        }
    }

    async fn fetch(&self) -> Result<Vec<RawModel>, ProviderError> {
        match &self.behavior {
            Behavior::Models(ids) => Ok(raw(ids)),
            Behavior::Fail(msg) => Err(ProviderError::Client(msg.to_string())),
            Behavior::Hang => std::future::pending().await,
            Behavior::Slow(delay, ids) => {
                tokio::time::sleep(*delay).await;
                Ok(raw(ids))
            }
            Behavior::Panic => panic!("gateway exploded"),
        }
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<SnapshotStore>,
    cache: Arc<CacheManager>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            store: Arc::new(SnapshotStore::new(dir.path())),
            cache: Arc::new(CacheManager::new(dir.path())),
            _dir: dir,
        }
    }

    fn coordinator(&self, timeout: Duration) -> DiscoveryCoordinator {
        DiscoveryCoordinator::new(Arc::clone(&self.store), Arc::clone(&self.cache), timeout)
    }

    fn cache_bytes(&self) -> Option<Vec<u8>> {
        fs::read(self.cache.path()).ok()
    }
}

fn expect_aggregate(result: Result<Snapshot, DiscoveryError>) -> Snapshot {
    match result {
        Err(DiscoveryError::AggregateFetchFailure { snapshot }) => *snapshot,
        other => panic!("expected AggregateFetchFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn all_success_persists_snapshot_and_updates_cache() {
    let h = Harness::new();
    let gateways = vec![
        gateway(OpenAI, Behavior::Models(vec!["gpt-4", "gpt-3.5"])),
        gateway(Google, Behavior::Models(vec!["gemini-pro"])),
    ];

    let snapshot = h
        .coordinator(Duration::from_secs(5))
        .discover(&gateways, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.overall_status(), OverallStatus::Success);
    assert_eq!(h.store.load_latest().unwrap().unwrap(), snapshot);

    let cache = h.cache.read().unwrap().unwrap();
    let ids: Vec<_> = cache
        .models_for(OpenAI)
        .unwrap()
        .iter()
        .map(|m| m.model_id())
        .collect();
    assert_eq!(ids, vec!["gpt-4", "gpt-3.5"]);
    assert_eq!(cache.models_for(Google).unwrap()[0].model_name(), "GEMINI-PRO");
    assert_eq!(cache.all_models().len(), snapshot.total_models());
}

#[tokio::test]
async fn partial_failure_leaves_cache_untouched() {
    let h = Harness::new();
    let coordinator = h.coordinator(Duration::from_secs(5));
    coordinator
        .discover(
            &[gateway(OpenAI, Behavior::Models(vec!["gpt-4"])), gateway(Google, Behavior::Models(vec!["gemini-pro"]))],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let before = h.cache_bytes().unwrap();

    let result = coordinator
        .discover(
            &[
                gateway(OpenAI, Behavior::Models(vec!["gpt-4", "gpt-5"])),
                gateway(Google, Behavior::Fail("HTTP 503")),
            ],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    assert_eq!(snapshot.overall_status(), OverallStatus::PartialFailure);
    assert_eq!(snapshot.result_for(OpenAI).unwrap().models().len(), 2);
    assert_eq!(
        snapshot.result_for(Google).unwrap().error_detail(),
        Some("HTTP 503")
    );
    assert_eq!(h.cache_bytes().unwrap(), before);
    // Persisted for audit.
    assert_eq!(h.store.load(snapshot.snapshot_id()).unwrap(), snapshot);
}

#[tokio::test]
async fn total_failure_persists_snapshot_without_creating_cache() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[gateway(OpenAI, Behavior::Fail("down")), gateway(Google, Behavior::Fail("down"))],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    assert_eq!(snapshot.overall_status(), OverallStatus::Failure);
    assert!(h.cache_bytes().is_none());
    assert!(h.store.load_latest().unwrap().is_some());
}

#[tokio::test]
async fn aggregate_error_names_failed_providers() {
    let h = Harness::new();
    let err = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[gateway(OpenAI, Behavior::Models(vec!["gpt-4"])), gateway(Google, Behavior::Fail("quota exceeded"))],
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("partial failure"), "{}", msg);
    assert!(msg.contains("google (quota exceeded)"), "{}", msg);
}

#[tokio::test]
async fn timeout_becomes_provider_failure_without_aborting_siblings() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_millis(50))
        .discover(
            &[gateway(OpenAI, Behavior::Hang), gateway(Google, Behavior::Models(vec!["gemini-pro"]))],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    let openai = snapshot.result_for(OpenAI).unwrap();
    assert!(openai.error_detail().unwrap().contains("Timed out"));
    assert!(snapshot.result_for(Google).unwrap().is_success());
}

#[tokio::test]
async fn overall_deadline_cancels_outstanding_tasks() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_secs(30))
        .with_deadline(Some(Duration::from_millis(50)))
        .discover(
            &[gateway(OpenAI, Behavior::Models(vec!["gpt-4"])), gateway(Google, Behavior::Hang)],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    assert_eq!(snapshot.overall_status(), OverallStatus::PartialFailure);
    assert!(
        snapshot
            .result_for(Google)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("deadline")
    );
}

#[tokio::test]
async fn fetches_run_concurrently() {
    let h = Harness::new();
    let delay = Duration::from_millis(200);
    let started = std::time::Instant::now();
    h.coordinator(Duration::from_secs(5))
        .discover(
            &[
                gateway(OpenAI, Behavior::Slow(delay, vec!["gpt-4"])),
                gateway(Google, Behavior::Slow(delay, vec!["gemini-pro"])),
                gateway(Anthropic, Behavior::Slow(delay, vec!["claude"])),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(started.elapsed() < delay * 2, "took {:?}", started.elapsed());
}

#[tokio::test]
async fn cancelled_discovery_writes_nothing() {
    let h = Harness::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(&[gateway(OpenAI, Behavior::Hang)], &cancel)
        .await;

    assert!(matches!(result, Err(DiscoveryError::Cancelled)));
    assert!(h.store.load_latest().unwrap().is_none());
    assert!(h.cache_bytes().is_none());
}

#[tokio::test]
async fn panicking_gateway_is_recorded_as_failure() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[gateway(OpenAI, Behavior::Panic), gateway(Google, Behavior::Models(vec!["gemini-pro"]))],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    assert_eq!(
        snapshot.result_for(OpenAI).unwrap().error_detail(),
        Some("Fetch task panicked")
    );
}

#[tokio::test]
async fn missing_credentials_surface_as_failure_not_skip() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[Arc::new(OpenAIGateway::new(None)) as Arc<dyn ProviderGateway>, gateway(Google, Behavior::Models(vec!["gemini-pro"]))],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    assert_eq!(snapshot.provider_results().len(), 2);
    assert!(
        snapshot
            .result_for(OpenAI)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("OPENAI_API_KEY")
    );
}

#[tokio::test]
async fn vertex_mode_without_credentials_is_a_google_failure() {
    let h = Harness::new();
    let vertex: Arc<dyn ProviderGateway> = Arc::new(GoogleGateway::with_auth(GoogleAuth::Vertex {
        credentials: None,
        location: "us-central1".into(),
    }));
    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[gateway(OpenAI, Behavior::Models(vec!["gpt-4"])), vertex],
            &CancellationToken::new(),
        )
        .await;

    let snapshot = expect_aggregate(result);
    let google = snapshot.result_for(Google).unwrap();
    assert!(!google.is_success());
    assert!(google.error_detail().unwrap().contains("GOOGLE_APPLICATION_CREDENTIALS"));
    assert!(h.cache_bytes().is_none());
}

#[tokio::test]
async fn concurrent_discoveries_persist_both_snapshots() {
    let h = Harness::new();
    let first = h.coordinator(Duration::from_secs(5));
    let second = h.coordinator(Duration::from_secs(5));
    let gateways_a = vec![
        gateway(OpenAI, Behavior::Slow(Duration::from_millis(30), vec!["gpt-4"])),
        gateway(Google, Behavior::Models(vec!["gemini-pro"])),
    ];
    let gateways_b = vec![
        gateway(OpenAI, Behavior::Models(vec!["gpt-4", "gpt-4o"])),
        gateway(Google, Behavior::Slow(Duration::from_millis(30), vec!["gemini-pro"])),
    ];
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(
        first.discover(&gateways_a, &cancel),
        second.discover(&gateways_b, &cancel)
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.snapshot_id(), b.snapshot_id());

    assert_eq!(h.store.load(a.snapshot_id()).unwrap(), a);
    assert_eq!(h.store.load(b.snapshot_id()).unwrap(), b);
    assert_eq!(h.store.list().unwrap().len(), 2);

    // The cache holds one of the two complete results, never a mix or a torn file.
    let cache = h.cache.read().unwrap().unwrap();
    let openai = cache.models_for(OpenAI).unwrap().len();
    assert!(openai == 1 || openai == 2, "{}", openai);
    assert_eq!(cache.models_for(Google).unwrap().len(), 1);
}

#[tokio::test]
async fn blank_or_duplicate_records_fail_the_provider() {
    let h = Harness::new();
    let coordinator = h.coordinator(Duration::from_secs(5));

    let blank = expect_aggregate(
        coordinator
            .discover(&[gateway(OpenAI, Behavior::Models(vec!["gpt-4", "  "]))], &CancellationToken::new())
            .await,
    );
    assert!(blank.result_for(OpenAI).unwrap().models().is_empty());

    let dup = expect_aggregate(
        coordinator
            .discover(&[gateway(OpenAI, Behavior::Models(vec!["gpt-4", "gpt-4"]))], &CancellationToken::new())
            .await,
    );
    assert!(
        dup.result_for(OpenAI)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("duplicate")
    );
}

#[tokio::test]
async fn results_keep_configuration_order_and_source() {
    let h = Harness::new();
    let snapshot = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[
                gateway(Anthropic, Behavior::Slow(Duration::from_millis(30), vec!["claude"])),
                gateway(OpenAI, Behavior::Models(vec!["gpt-4"])),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let order: Vec<_> = snapshot.providers().collect();
    assert_eq!(order, vec![Anthropic, OpenAI]);
    assert_eq!(
        snapshot.result_for(Anthropic).unwrap().models()[0].source(),
        ModelSource::Manual
    );
}

#[tokio::test]
async fn storage_failure_is_fatal_and_skips_cache() {
    let h = Harness::new();
    // A regular file where the snapshots directory should be.
    fs::write(h.store.snapshots_dir(), b"not a directory").unwrap();

    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(&[gateway(OpenAI, Behavior::Models(vec!["gpt-4"]))], &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(DiscoveryError::StorageWriteFailure(_))));
    assert!(h.cache_bytes().is_none());
}

#[tokio::test]
async fn duplicate_gateways_rejected_before_fetching() {
    let h = Harness::new();
    let result = h
        .coordinator(Duration::from_secs(5))
        .discover(
            &[gateway(OpenAI, Behavior::Models(vec!["a"])), gateway(OpenAI, Behavior::Models(vec!["b"]))],
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(DiscoveryError::InvalidProviders(_))));
    assert!(h.store.load_latest().unwrap().is_none());
}

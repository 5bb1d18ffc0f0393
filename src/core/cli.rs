//! CLI commands: update, offline listing, export, change ledger, snapshots, config.
//!
//! Each command prints plain text and exits the process with code 1 on
//! operational failure (2 on a usage error).

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::changes::{self, Detection};
use crate::core::config::Config;
use crate::core::discovery::DiscoveryError;
use crate::core::export::{self, ExportFormat};
use crate::core::models::{Change, Snapshot};
use crate::core::service::{DiscoveryService, ServiceError, UpdateReport};
use crate::core::storage::Cache;
use crate::core::util::{self, Freshness};

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn usage_error(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(2);
}

/// Run the `update` command: discover every configured provider and refresh the cache.
pub async fn run_update(service: &DiscoveryService, cancel: &CancellationToken) {
    match service.update(cancel).await {
        Ok(report) => print_update(service, &report),
        Err(ServiceError::Discovery(err)) => {
            eprintln!("Error: {}", err);
            if let DiscoveryError::AggregateFetchFailure { snapshot } = &err {
                eprintln!(
                    "Snapshot {} recorded; cache left unchanged.",
                    snapshot.snapshot_id()
                );
            }
            std::process::exit(1);
        }
        Err(e) => fail(e),
    }
}

fn print_update(service: &DiscoveryService, report: &UpdateReport) {
    let counts: Vec<String> = report
        .snapshot
        .provider_results()
        .iter()
        .map(|r| format!("{}: {}", r.provider_name().display_name(), r.models().len()))
        .collect();
    println!(
        "{} / Total: {} / Cached to: {}",
        counts.join(", "),
        report.snapshot.total_models(),
        service.cache().path().display()
    );
    println!();
    println!("{}", changes::summarize(&report.detection));
    if report.pruned > 0 {
        println!("Pruned {} old snapshot(s)", report.pruned);
    }
}

fn load_cache(service: &DiscoveryService) -> Cache {
    match service.cached_models() {
        Ok(Some(cache)) => cache,
        Ok(None) => fail(format!(
            "No cached models at {}. Run `{} update` first.",
            service.cache().path().display(),
            crate::core::app::NAME
        )),
        Err(e) => fail(format!(
            "{}. Run `{} update` to rebuild the cache.",
            e,
            crate::core::app::NAME
        )),
    }
}

fn warn_if_stale(cache: &Cache) {
    let age = cache.age(Utc::now());
    match util::freshness(age) {
        Freshness::Fresh => {}
        Freshness::Stale => eprintln!(
            "Warning: cached data is {} hours old. Run `{} update` to refresh.",
            age.num_hours(),
            crate::core::app::NAME
        ),
        Freshness::VeryStale => eprintln!(
            "Warning: cached data is {} days old and likely outdated. Run `{} update` now.",
            age.num_days(),
            crate::core::app::NAME
        ),
    }
}

/// Run the `list` command: print cached models as a table (no network access).
pub fn run_list(service: &DiscoveryService, query: Option<&str>) {
    let cache = load_cache(service);
    warn_if_stale(&cache);

    let models = cache.all_models();
    let filtered = util::filter_models(&models, query.unwrap_or(""));
    if filtered.is_empty() {
        println!("No models found.");
        return;
    }

    let id_w = filtered
        .iter()
        .map(|m| m.model_id().len())
        .max()
        .unwrap_or(20)
        .max(20);
    let name_w = filtered
        .iter()
        .map(|m| m.model_name().len())
        .max()
        .unwrap_or(30)
        .max(30);

    println!(
        "{:<10}  {:<id_w$}  {:<name_w$}  {:<6}",
        "Provider", "ID", "Name", "Source"
    );
    println!(
        "{}  {}  {}  ------",
        "-".repeat(10),
        "-".repeat(id_w),
        "-".repeat(name_w)
    );
    for m in &filtered {
        println!(
            "{:<10}  {:<id_w$}  {:<name_w$}  {:<6}",
            m.provider_name(),
            m.model_id(),
            m.model_name(),
            m.source().as_str()
        );
    }

    println!(
        "\n{} model(s) listed ({} cached, updated {})",
        filtered.len(),
        cache.total_models(),
        format_time(cache.metadata().last_updated_at)
    );
}

/// Run the `export` command: render cached models to a file or stdout.
pub fn run_export(service: &DiscoveryService, format: ExportFormat, output: Option<&Path>) {
    let cache = load_cache(service);
    warn_if_stale(&cache);

    let rendered = match export::render_models(format, &cache.all_models()) {
        Ok(s) => s,
        Err(e) => fail(e),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                fail(format!("Failed to create {}: {}", parent.display(), e));
            }
            if let Err(e) = std::fs::write(path, rendered) {
                fail(format!("Failed to write {}: {}", path.display(), e));
            }
            eprintln!(
                "Exported {} model(s) as {} to {}",
                cache.total_models(),
                format.as_str(),
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
}

fn parse_snapshot_id(raw: &str) -> Uuid {
    Uuid::parse_str(raw.trim())
        .unwrap_or_else(|_| usage_error(format!("'{}' is not a valid snapshot id", raw)))
}

/// Run the `changes` command: the latest ledger, or a diff between two stored snapshots.
pub fn run_changes(service: &DiscoveryService, from: Option<&str>, to: Option<&str>, json: bool) {
    let ledger = match (from, to) {
        (Some(from), Some(to)) => {
            let (from, to) = (parse_snapshot_id(from), parse_snapshot_id(to));
            match service.diff(from, to) {
                Ok(detection) => detection.changes().to_vec(),
                Err(e) => fail(e),
            }
        }
        _ => match service.latest_changes() {
            Ok(Some((_, Some(ledger)))) => ledger,
            Ok(Some((latest, None))) => {
                if json {
                    println!("[]");
                } else {
                    println!(
                        "No change ledger for snapshot {} ({}).",
                        latest.snapshot_id(),
                        if latest.is_success() {
                            "baseline"
                        } else {
                            "update failed"
                        }
                    );
                }
                return;
            }
            Ok(None) => fail(format!(
                "No snapshots recorded yet. Run `{} update` first.",
                crate::core::app::NAME
            )),
            Err(e) => fail(e),
        },
    };

    if json {
        match serde_json::to_string_pretty(&ledger) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(e),
        }
        return;
    }
    print_changes(ledger);
}

fn print_changes(ledger: Vec<Change>) {
    for change in &ledger {
        println!("{}", change);
    }
    if !ledger.is_empty() {
        println!();
    }
    println!("{}", changes::summarize(&Detection::Changes(ledger)));
}

/// Run the `snapshots list` command: newest first, with per-snapshot status.
pub fn run_snapshots_list(service: &DiscoveryService, limit: Option<usize>) {
    let mut snapshots = match service.store().list() {
        Ok(s) => s,
        Err(e) => fail(e),
    };
    if snapshots.is_empty() {
        println!("No snapshots recorded.");
        return;
    }
    snapshots.reverse();

    let take = limit.unwrap_or(snapshots.len());
    println!(
        "{:<36}  {:<16}  {:<14}  {:>6}",
        "ID", "Created", "Status", "Models"
    );
    println!(
        "{}  {}  {}  ------",
        "-".repeat(36),
        "-".repeat(16),
        "-".repeat(14)
    );
    for s in snapshots.iter().take(take) {
        println!(
            "{:<36}  {:<16}  {:<14}  {:>6}",
            s.snapshot_id().to_string(),
            format_time(s.created_at()),
            s.overall_status().as_str(),
            s.total_models()
        );
    }
}

/// Run the `snapshots show` command: per-provider outcome of one snapshot.
pub fn run_snapshots_show(service: &DiscoveryService, id: &str) {
    let snapshot = match service.store().load(parse_snapshot_id(id)) {
        Ok(s) => s,
        Err(e) => fail(e),
    };
    print_snapshot(&snapshot);
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("Snapshot: {}", snapshot.snapshot_id());
    println!("Created:  {}", format_time(snapshot.created_at()));
    println!("Status:   {}", snapshot.overall_status().as_str());
    println!();
    for result in snapshot.provider_results() {
        match result.error_detail() {
            None => println!(
                "{:<10}  success  {} model(s)",
                result.provider_name(),
                result.models().len()
            ),
            Some(detail) => println!("{:<10}  failure  {}", result.provider_name(), detail),
        }
    }
}

/// Run the `snapshots prune` command.
pub fn run_snapshots_prune(service: &DiscoveryService, retention_days: Option<u32>) {
    let days = retention_days.unwrap_or(service.config().retention_days);
    match service.prune(days) {
        Ok(n) => println!("Pruned {} snapshot(s) older than {} days", n, days),
        Err(e) => fail(e),
    }
}

/// Run the `config` command: resolved settings with API keys masked.
pub fn run_config(config: &Config) {
    let key = |k: &Option<String>| {
        k.as_deref()
            .map(util::mask_secret)
            .unwrap_or_else(|| "not set".to_string())
    };
    let providers: Vec<&str> = config.providers.iter().map(|p| p.as_str()).collect();
    let deadline = config
        .overall_deadline
        .map(|d| format!("{}s", d.as_secs()))
        .unwrap_or_else(|| "none".to_string());

    println!("Cache:          {}", config.cache_dir.display());
    println!("Providers:      {}", providers.join(", "));
    println!("Retention:      {} days", config.retention_days);
    println!("Timeout:        {}s per provider", config.provider_timeout.as_secs());
    println!("Deadline:       {}", deadline);
    println!("OpenAI key:     {}", key(&config.openai_api_key));
    println!("Google key:     {}", key(&config.google_api_key));
    println!("OpenRouter key: {}", key(&config.openrouter_api_key));
    if config.google_use_vertexai {
        let creds = config
            .google_application_credentials
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not set".to_string());
        println!("Vertex AI:      {} ({})", config.google_cloud_location, creds);
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

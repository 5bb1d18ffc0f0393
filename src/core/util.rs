//! Small helpers shared by the CLI commands.

use chrono::Duration;

use crate::core::models::Model;

/// Models whose id, name, or provider contains `query` (case-insensitive).
/// Returns everything when the query is empty.
pub fn filter_models<'a>(models: &'a [Model], query: &str) -> Vec<&'a Model> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return models.iter().collect();
    }
    models
        .iter()
        .filter(|m| {
            m.model_id().to_lowercase().contains(&q)
                || m.model_name().to_lowercase().contains(&q)
                || m.provider_name().as_str().contains(&q)
        })
        .collect()
}

/// Staleness of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Older than a day.
    Stale,
    /// Older than a week.
    VeryStale,
}

pub fn freshness(age: Duration) -> Freshness {
    if age > Duration::days(7) {
        Freshness::VeryStale
    } else if age > Duration::hours(24) {
        Freshness::Stale
    } else {
        Freshness::Fresh
    }
}

/// Mask a secret for display: keep the first four characters.
pub fn mask_secret(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", head)
    }
}

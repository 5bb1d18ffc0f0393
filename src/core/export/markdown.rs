//! Markdown export for documentation pages.

use crate::core::models::Model;

use super::group_by_provider;

pub(super) fn render(models: &[Model]) -> String {
    let mut lines = vec![
        "# LLM Models".to_string(),
        String::new(),
        format!("**Total Models**: {}", models.len()),
        String::new(),
    ];

    for (provider, list) in group_by_provider(models) {
        lines.push(format!("## {}", provider.display_name()));
        lines.push(String::new());
        lines.push("| Model ID | Model Name | Source | Fetched At |".to_string());
        lines.push("|----------|------------|--------|------------|".to_string());
        for m in list {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                cell(m.model_id()),
                cell(m.model_name()),
                m.source().as_str(),
                m.fetched_at().format("%Y-%m-%dT%H:%MZ")
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn cell(s: &str) -> String {
    s.replace('|', "\\|")
}

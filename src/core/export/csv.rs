//! CSV export, one row per model, for spreadsheets.

use crate::core::models::Model;

use super::timestamp;

const HEADER: [&str; 6] = [
    "provider",
    "model_id",
    "model_name",
    "source",
    "fetched_at",
    "metadata",
];

pub(super) fn render(models: &[Model]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().map(|s| s.to_string()));
    for m in models {
        let metadata = if m.metadata().is_empty() {
            String::new()
        } else {
            serde_json::to_string(m.metadata()).unwrap_or_default()
        };
        push_row(
            &mut out,
            [
                m.provider_name().to_string(),
                m.model_id().to_string(),
                m.model_name().to_string(),
                m.source().as_str().to_string(),
                timestamp(m),
                metadata,
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Quote a field when it contains a delimiter, quote, or line break (RFC 4180).
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn escape_plain_field_untouched() {
        assert_eq!(escape("gpt-4"), "gpt-4");
    }

    #[test]
    fn escape_quotes_and_commas() {
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}

//! Config subcommand - print the effective configuration

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

fn configured(value: &Option<String>) -> &'static str {
    if value.is_some() { "configured" } else { "not set" }
}

pub fn format_table(config: &Config) -> String {
    let p = &config.pipeline;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let backends: Vec<&str> = p.resolver.backends.iter().map(|b| b.as_str()).collect();
    let deadline = p
        .deadline_seconds
        .map_or_else(|| "none".to_string(), |d| format!("{d}s"));

    table.add_row(vec![
        "Output directory",
        &config.output.default_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Compression level",
        &config.output.compression_level.to_string(),
    ]);
    table.add_row(vec!["Workers", &p.worker_concurrency.to_string()]);
    table.add_row(vec!["Stop after", &format!("{:?}", p.stop_after).to_lowercase()]);
    table.add_row(vec!["Deadline", &deadline]);
    table.add_row(vec![
        "Rate limit",
        &format!(
            "{} req / {}s (queue {}s)",
            p.rate_limit.max_requests_per_window,
            p.rate_limit.window_seconds,
            p.rate_limit.max_queue_wait_seconds
        ),
    ]);
    table.add_row(vec![
        "Retries",
        &format!(
            "{} ({}-{}ms backoff)",
            p.retry.retry_ceiling, p.retry.base_backoff_ms, p.retry.max_backoff_ms
        ),
    ]);
    table.add_row(vec![
        "Request timeout",
        &format!("{}s", p.http.request_timeout_seconds),
    ]);
    table.add_row(vec![
        "Max PDF size",
        &format!("{:.1} MiB", p.download.max_pdf_bytes as f64 / (1024.0 * 1024.0)),
    ]);
    table.add_row(vec![
        "Download timeout",
        &format!("{}s", p.download.download_timeout_seconds),
    ]);
    table.add_row(vec![
        "Extraction",
        &format!(
            "{} workers, {}s timeout",
            p.extract.extraction_workers, p.extract.extraction_timeout_seconds
        ),
    ]);
    table.add_row(vec!["Backends", &backends.join(", ")]);
    table.add_row(vec![
        "Confidence threshold",
        &p.resolver.confidence_threshold.to_string(),
    ]);
    table.add_row(vec![
        "APA citations",
        if p.resolver.fetch_citation {
            p.resolver.endpoints.citation.as_str()
        } else {
            "off"
        },
    ]);
    table.add_row(vec![
        "S2 API key",
        configured(&p.credentials.semantic_scholar_api_key),
    ]);
    table.add_row(vec![
        "Contact email",
        configured(&p.credentials.contact_email),
    ]);
    table.add_row(vec![
        "Relevance words",
        &format!(
            "{} target / {} bycatch",
            p.relevance.target_words.len(),
            p.relevance.bycatch_words.len()
        ),
    ]);

    format!("\n{table}")
}

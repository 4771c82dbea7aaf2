//! Terminal rendering for CLI commands: tables, JSON, and status markers.

use std::io::Write;

use serde::Serialize;
use tabled::{Table, Tabled};

use linkvault_entity::{Severity, UrlStatus};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if items.is_empty() => println!("Nothing to show."),
        OutputFormat::Table => println!("{}", Table::new(items)),
        OutputFormat::Json => print_json(items),
    }
}

/// Print a single serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(item: &T) {
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("Failed to render JSON: {e}")),
    }
}

/// One-character marker for a severity tier.
pub fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Neutral => "·",
        Severity::Ok => "✓",
        Severity::Warning => "⚠",
        Severity::Critical => "✗",
    }
}

/// A link status as shown to the user, e.g. `✗ Not found`.
pub fn status_text(status: UrlStatus) -> String {
    let descriptor = status.descriptor();
    format!("{} {}", severity_marker(descriptor.severity), descriptor.label)
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("{} {msg}", severity_marker(Severity::Ok));
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    eprintln!("{} {msg}", severity_marker(Severity::Warning));
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("{} {msg}", severity_marker(Severity::Critical));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

/// Print per-status link counts, most severe last.
pub fn print_status_counts(counts: &[(UrlStatus, usize)]) {
    let mut rows = counts.to_vec();
    rows.sort_by_key(|(status, _)| status.descriptor().severity);
    for (status, count) in rows {
        print_kv(&status_text(status), &count.to_string());
    }
}

/// Rewrite the progress line of a running health check on stderr.
pub fn print_progress(current: usize, total: usize) {
    eprint!("\rChecked {current}/{total}");
    let _ = std::io::stderr().flush();
}

//! Colored CLI display utilities for audit output.

use std::io::{self, Write};
use std::path::Path;

use owo_colors::OwoColorize;

use crate::audit::{AuditRecord, EventKind, ParseError};

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Uncolored one-line rendering of a record.
#[must_use]
pub fn format_record(record: &AuditRecord) -> String {
    format!(
        "{:<6} {} pid={} user={} t={}",
        record.event_kind(),
        truncate(record.file_name(), DEFAULT_MAX_LEN),
        record.process_id(),
        record.user(),
        record.timestamp()
    )
}

fn kind_label(kind: EventKind) -> String {
    let label = format!("[{:<6}]", kind.as_str().to_uppercase());
    match kind {
        EventKind::Create => label.green().bold().to_string(),
        EventKind::Open => label.blue().to_string(),
        EventKind::Rename => label.yellow().bold().to_string(),
        EventKind::Unlink => label.red().bold().to_string(),
        EventKind::Write => label.magenta().to_string(),
    }
}

/// Print one record.
pub fn print_record(record: &AuditRecord) {
    println!(
        "{} {} {} {} {}",
        kind_label(record.event_kind()),
        truncate(record.file_name(), DEFAULT_MAX_LEN).bold(),
        format!("user={}", record.user()).cyan(),
        format!("pid={}", record.process_id()).dimmed(),
        format!("t={}", record.timestamp()).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Report a log line that could not be parsed.
pub fn print_malformed(line_number: usize, line: &str, error: &ParseError) {
    eprintln!(
        "{} line {}: {} ({})",
        "[SKIP]".yellow().bold(),
        line_number,
        truncate(line, 60).dimmed(),
        error
    );
}

/// Print monitor start information.
pub fn print_monitor_start(log_path: &Path, folders: &[String]) {
    println!(
        "{} writing to {}",
        "[AUDIT]".blue().bold(),
        log_path.display().to_string().cyan()
    );
    if folders.is_empty() {
        println!("{} no folders monitored", "[AUDIT]".yellow().bold());
    }
    for folder in folders {
        println!("{} watching {}", "[AUDIT]".blue().bold(), folder.cyan());
    }
    let _ = io::stdout().flush();
}

/// Print monitor stop information.
pub fn print_monitor_stop(written: u64) {
    println!(
        "{} stopped, {} record(s) written",
        "[AUDIT]".blue().bold(),
        written.to_string().green()
    );
    let _ = io::stdout().flush();
}

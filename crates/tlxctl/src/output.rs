//! Terminal output helpers, ASCII only

use owo_colors::OwoColorize;
use tlx_common::{HistoryStats, OperationRecord, OperationStatus, Plan};

const KEY_WIDTH: usize = 12;

pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "-".repeat(60).dimmed());
}

pub fn kv(key: &str, value: &str) {
    println!("{:width$} {}", key, value, width = KEY_WIDTH);
}

pub fn info(msg: &str) {
    println!("{}", msg.dimmed());
}

pub fn success(msg: &str) {
    println!("{} {}", "[OK]".bright_green(), msg);
}

pub fn warn(msg: &str) {
    println!("{} {}", "[WARN]".yellow(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".bright_red(), msg);
}

pub fn status(status: OperationStatus) -> String {
    let label = format!("{:9}", status.as_str());
    match status {
        OperationStatus::Success => label.bright_green().to_string(),
        OperationStatus::Failed => label.bright_red().to_string(),
        OperationStatus::Cancelled => label.yellow().to_string(),
        OperationStatus::Simulated => label.cyan().to_string(),
    }
}

pub fn plan(plan: &Plan, distro: &str, risk: &str, undo: Option<&str>) {
    header("Plan");
    kv("intent", plan.intent.as_str());
    kv("distro", distro);
    kv("description", &plan.description);
    kv(
        "simulate",
        &plan.display_simulate().unwrap_or_else(|| "(none)".to_string()),
    );
    kv(
        "real",
        &plan.display_real().unwrap_or_else(|| "(none)".to_string()),
    );
    println!();
    println!("{}", risk.yellow());
    if let Some(undo) = undo {
        println!("{}", undo.dimmed());
    }
}

/// Indented command output block
pub fn block(title: &str, body: &str) {
    header(title);
    for line in body.lines() {
        println!("  {}", line);
    }
}

pub fn record(record: &OperationRecord) {
    println!(
        "#{:<5} {}  {}  {:<18} {}",
        record.id.unwrap_or_default(),
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        status(record.status),
        record.intent_type,
        record.command
    );
    if let Some(err) = &record.error_message {
        if let Some(first) = err.lines().find(|l| !l.trim().is_empty()) {
            println!("       {}", first.bright_red());
        }
    }
}

pub fn records(records: &[OperationRecord]) {
    if records.is_empty() {
        info("No matching operations.");
        return;
    }
    for r in records {
        record(r);
    }
}

pub fn stats(stats: &HistoryStats) {
    kv("total", &stats.total.to_string());
    kv("success", &stats.success.to_string());
    kv("failed", &stats.failed.to_string());
    kv("cancelled", &stats.cancelled.to_string());
    kv("simulated", &stats.simulated.to_string());
}

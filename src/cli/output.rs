use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::watch;

use crate::cleaner::{
    CategoryRunState, CleanupCategory, OrchestratorState, RunStatus, RunSummary, ScanReport,
};
use crate::common::format::{self, format_path, format_size, format_size_colored};

fn elapsed(secs: f64) -> String {
    match secs {
        s if s < 1.0 => format!("{:.0}ms", s * 1000.0),
        s if s < 60.0 => format!("{:.1}s", s),
        s => {
            let whole = s.round() as u64;
            format!("{}m {}s", whole / 60, whole % 60)
        }
    }
}

/// Print scan results in human-readable format
pub fn print_scan_results(report: &ScanReport, detailed: bool) {
    println!();
    println!("{}  TidyGuard Scan Results", "🧹");
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Scanned in {}  •  {} reclaimable  •  {}",
        elapsed(report.duration_secs).cyan(),
        format_size_colored(report.total_size()),
        format::format_count(report.total_items()).dimmed()
    );
    println!("{}", "─".repeat(60).dimmed());
    println!();

    if report.total_items() == 0 {
        println!("  {} Your Mac is already clean!", "✨");
        print_warnings(&report.warnings);
        return;
    }

    for category in report.categories.iter().filter(|c| !c.items.is_empty()) {
        print_category(category, detailed);
    }

    if report.dropped > 0 {
        println!(
            "  {} {} skipped by your exclusions or outside known safe locations",
            "🛡".dimmed(),
            format::format_count(report.dropped).dimmed()
        );
        println!();
    }

    print_warnings(&report.warnings);

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  {} Total reclaimable: {}",
        "💾",
        format_size_colored(report.total_size())
    );
    println!(
        "  {} Run {} to preview, {} to clean",
        "💡",
        "tidyguard clean --dry-run".cyan(),
        "tidyguard clean".cyan()
    );
    println!();
}

fn print_category(category: &CleanupCategory, detailed: bool) {
    let marker = if category.is_active() {
        "●".green()
    } else {
        "○".dimmed()
    };
    println!(
        "  {} {:<28} {:>10}  ({}, {} selected)",
        marker,
        category.step.to_string().bold(),
        format_size(category.total_size()),
        format::format_count(category.items.len()).dimmed(),
        category.selected_count()
    );

    if detailed {
        let mut items: Vec<_> = category.items.iter().collect();
        items.sort_by(|a, b| b.size.unwrap_or(0).cmp(&a.size.unwrap_or(0)));
        for item in &items {
            let check = if item.selected { "✓".green() } else { " ".normal() };
            println!(
                "      {} {:<50} {:>10}",
                check,
                format::truncate(&format_path(&item.path), 50).dimmed(),
                format_size(item.size.unwrap_or(0)).dimmed()
            );
        }
        if let Some(detail) = items.first().and_then(|i| i.detail.as_deref()) {
            println!("      {} {}", "↳".dimmed(), detail.dimmed());
        }
        println!();
    }
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!(
        "  {} {}",
        "⚠".yellow(),
        format!("{} warnings:", warnings.len()).yellow()
    );
    for warning in warnings {
        println!("    {} {}", "→".dimmed(), warning.dimmed());
    }
    println!();
}

/// Print scan results as JSON
pub fn print_scan_json(report: &ScanReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Print a minimal summary
pub fn print_scan_quiet(report: &ScanReport) {
    println!(
        "{}  {}  {}",
        format_size(report.total_size()),
        report.total_items(),
        report.categories.iter().filter(|c| !c.items.is_empty()).count()
    );
}

/// What a run is about to touch
pub fn print_clean_plan(state: &OrchestratorState) {
    println!();
    for category in state.active_categories() {
        println!(
            "  {} {:<28} {:>10}  ({})",
            "●".green(),
            category.step.to_string().bold(),
            format_size(category.selected_size()),
            format::format_count(category.selected_count()).dimmed()
        );
    }
    println!();
}

/// Print the outcome of a run
pub fn print_run_summary(summary: &RunSummary, run_states: &[CategoryRunState], dry_run: bool) {
    println!();
    let (icon, headline) = if summary.success {
        ("✓".green(), summary.headline.green().bold())
    } else {
        ("⚠".yellow(), summary.headline.yellow().bold())
    };
    if dry_run {
        println!("  {} {} {}", icon, headline, "(dry run, nothing was removed)".dimmed());
    } else {
        println!("  {} {}", icon, headline);
    }
    println!();

    for (line, state) in summary.details.iter().zip(run_states) {
        let bullet = match state.status {
            RunStatus::Failed { .. } => "✗".red(),
            _ => "•".green(),
        };
        println!("    {} {}", bullet, line);
    }

    if let Some(recovery) = &summary.recovery {
        println!();
        println!("  {} {}", "💡", "To finish the cleanup:".bold());
        for line in recovery.lines() {
            println!("    {} {}", "→".dimmed(), line);
        }
    }
    println!();
}

pub fn print_summary_json(summary: &RunSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing summary: {}", e),
    }
}

pub fn print_summary_quiet(summary: &RunSummary) {
    let status = if summary.success { "ok" } else { "failed" };
    println!("{}  {}", status, summary.details.len());
}

/// Print the exclusion list
pub fn print_exclusions(paths: &[PathBuf]) {
    if paths.is_empty() {
        println!("  {} No excluded paths", "ℹ️");
        return;
    }
    println!();
    println!("  {} {}", "🛡", format!("{} excluded:", format::format_count(paths.len())).bold());
    for path in paths {
        println!("    {} {}", "•".dimmed(), format_path(path));
    }
    println!();
}

// ─── Progress ────────────────────────────────────────────────────────────────

pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(1000);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.red} [{bar:40.red/blue}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━░");
    pb.set_style(style);
    pb
}

/// Mirror the orchestrator's published progress onto `pb` until the sender
/// goes away
pub async fn follow_progress(mut rx: watch::Receiver<OrchestratorState>, pb: ProgressBar) {
    while rx.changed().await.is_ok() {
        let (position, message) = {
            let state = rx.borrow_and_update();
            let running = state
                .run_states
                .iter()
                .find(|r| r.status == RunStatus::Running)
                .map(|r| r.step.to_string())
                .unwrap_or_default();
            ((state.progress * 1000.0).round() as u64, running)
        };
        pb.set_position(position);
        pb.set_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        assert_eq!(elapsed(0.5), "500ms");
        assert_eq!(elapsed(3.7), "3.7s");
        assert_eq!(elapsed(125.0), "2m 5s");
    }
}

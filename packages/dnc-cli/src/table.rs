//! Terminal rendering for result pages, run summaries and the activity log.

use chrono::Local;
use console::{style, StyledObject};
use dnc_engine::{DncStatus, EngineStatus, LogEntry, ResultPage, RunState, Severity};

/// Print one page of results as a fixed-width table.
///
/// `page_size` is the page size the view was built with; it anchors the
/// absolute row numbers in the first column.
pub fn print_results(page: &ResultPage, page_size: usize) {
    if page.records.is_empty() {
        println!("{}", style("No matching records.").dim());
        return;
    }

    println!(
        "{}",
        style(format!(
            "{:>4}  {:<16} {:<8} {:<8} {:<8} {:<8} {:<22} {:<30} {:<8}",
            "#", "Phone", "DNC", "NDNC", "SDNC", "State", "Name", "Address", "Status"
        ))
        .bold()
    );
    println!("{}", style("-".repeat(120)).dim());

    let first_index = (page.page - 1).saturating_mul(page_size.max(1));
    for (offset, record) in page.records.iter().enumerate() {
        println!(
            "{:>4}  {:<16} {} {:<8} {:<8} {:<8} {:<22} {:<30} {:<8}",
            first_index.saturating_add(offset + 1),
            record.phone.formatted(),
            dnc_cell(record.dnc_status),
            record.ndnc,
            record.sdnc,
            record.region,
            console::truncate_str(&record.name, 22, "…"),
            console::truncate_str(&record.address, 30, "…"),
            record.person_status,
        );
    }

    println!();
    println!(
        "Page {} of {} ({} matching)",
        page.page, page.page_count, page.total_matches
    );
}

/// Print the end-of-command summary block.
pub fn print_summary(status: &EngineStatus) {
    let totals = status.totals;

    println!();
    println!("{}", style("Run summary").bold());
    println!("  {:<16} {}", "State", state_cell(status.state));
    println!("  {:<16} {}", "Numbers queued", totals.queued);
    println!("  {:<16} {}", "Processed", totals.processed);
    println!(
        "  {:<16} {} {}",
        "Failed",
        totals.failed,
        if totals.failed > 0 {
            style("✗").red()
        } else {
            style("✓").green()
        }
    );
    println!("  {:<16} {}", "Skipped", status.skipped);
    println!(
        "  {:<16} {}",
        "DNC listed",
        if totals.flagged_dnc > 0 {
            style(totals.flagged_dnc.to_string()).red()
        } else {
            style(totals.flagged_dnc.to_string()).green()
        }
    );
    println!("  {:<16} {}", "Details found", totals.with_details);
    println!(
        "  {:<16} {:.1}s",
        "Elapsed",
        status.elapsed.as_secs_f64()
    );
    if totals.processed > 0 {
        println!("  {:<16} {:.1}/min", "Rate", status.per_minute());
    }
}

/// Print recent log entries, newest first.
pub fn print_log_tail(entries: &[LogEntry]) {
    if entries.is_empty() {
        return;
    }
    println!();
    println!("{}", style("Recent activity").bold());
    for entry in entries {
        println!(
            "  {} {} {}",
            severity_glyph(entry.severity),
            style(entry.at.with_timezone(&Local).format("%H:%M:%S").to_string()).dim(),
            entry.message,
        );
    }
}

fn dnc_cell(status: DncStatus) -> StyledObject<String> {
    let cell = format!("{:<8}", status);
    match status {
        DncStatus::Yes => style(cell).red().bold(),
        DncStatus::No => style(cell).green(),
        DncStatus::Unknown => style(cell).dim(),
        DncStatus::Error => style(cell).red(),
    }
}

fn state_cell(state: RunState) -> StyledObject<&'static str> {
    match state {
        RunState::Running => style(state.as_str()).green().bold(),
        RunState::Paused => style(state.as_str()).yellow().bold(),
        RunState::Completed => style(state.as_str()).cyan().bold(),
        RunState::Cancelled => style(state.as_str()).red().bold(),
        RunState::Idle => style(state.as_str()).dim(),
    }
}

fn severity_glyph(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::Success => style("✓").green(),
        Severity::Warning => style("~").yellow(),
        Severity::Error => style("✗").red(),
        Severity::Info => style("•").cyan(),
    }
}

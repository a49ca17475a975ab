//! Terminal display logic for the handle-check CLI.
//!
//! This module handles text output: found-profile lines, the progress line,
//! headers, dry-run listings and summaries. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use handle_check_lib::{FoundProfile, ProgressReceiver, ProgressSnapshot, ScanMode, ScanReport, SiteDescriptor};
use tokio::task::JoinHandle;

const BAR_WIDTH: usize = 30;
const SITE_WIDTH: usize = 24;

// ── Progress ─────────────────────────────────────────────────────────────────

/// A progress line drawn on stderr so stdout stays clean.
pub struct ProgressLine {
    handle: JoinHandle<()>,
}

impl ProgressLine {
    /// Start drawing snapshots from `receiver`.
    ///
    /// Returns None if stderr isn't a TTY.
    pub fn start(mut receiver: ProgressReceiver) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let handle = tokio::spawn(async move {
            while let Some(snapshot) = receiver.next().await {
                let _ = term.clear_line();
                let _ = term.write_str(&progress_bar(&snapshot));
                if snapshot.finished {
                    break;
                }
            }
            let _ = term.clear_line();
        });

        Some(Self { handle })
    }

    /// Wait for the final snapshot and clear the line.
    pub async fn finish(self) {
        let _ = self.handle.await;
    }
}

/// Render a snapshot as `[=====>     ]  45% (90/200)`.
pub fn progress_bar(snapshot: &ProgressSnapshot) -> String {
    let percent = snapshot.percent();
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);

    let mut bar = "=".repeat(filled);
    if filled < BAR_WIDTH {
        bar.push('>');
        bar.push_str(&" ".repeat(BAR_WIDTH - filled - 1));
    }

    format!(
        "{} {:>3.0}% ({}/{})",
        style(format!("[{}]", bar)).cyan(),
        percent,
        snapshot.completed,
        snapshot.total
    )
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(username: &str, site_count: usize, mode: ScanMode, concurrency: usize) {
    println!(
        "{} {} {}",
        style("handle-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "— Looking for '{}' on {} site{}",
            username,
            site_count,
            if site_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!("Mode: {} | Concurrency: {}", mode, concurrency)).dim()
    );
    println!();
}

// ── Found line ───────────────────────────────────────────────────────────────

/// Print one found profile.
///
/// Plain mode prints `site: url` so the output stays easy to grep.
pub fn print_found(profile: &FoundProfile, pretty: bool) {
    clear_progress();
    if pretty {
        let padded = pad_str(&profile.site, SITE_WIDTH, Alignment::Left, Some(".."));
        println!(
            "  {} {}  {}  {}",
            style("✓").green().bold(),
            style(&padded).white(),
            style(&profile.url).cyan(),
            style(format!("{}ms", profile.elapsed_millis)).dim(),
        );
    } else {
        println!("{}: {}", profile.site, profile.url);
    }
}

/// Clear a progress line that may be drawn on stderr.
fn clear_progress() {
    let term = Term::stderr();
    if term.is_term() {
        let _ = term.clear_line();
    }
}

// ── Messages ─────────────────────────────────────────────────────────────────

pub fn print_no_accounts(username: &str) {
    println!(
        "{}",
        style(format!("No accounts found for '{}'.", username)).yellow()
    );
}

pub fn print_interrupted(completed: usize, total: usize) {
    eprintln!(
        "{}",
        style(format!(
            "Scan interrupted after {} of {} sites; showing partial results.",
            completed, total
        ))
        .yellow()
    );
}

/// List the sites a scan would probe.
pub fn print_dry_run(username: &str, sites: &[SiteDescriptor], mode: ScanMode) {
    println!(
        "{}",
        style(format!(
            "Dry run: {} site{} would be checked for '{}' ({})",
            sites.len(),
            if sites.len() == 1 { "" } else { "s" },
            username,
            mode
        ))
        .dim()
    );
    for site in sites {
        let padded = pad_str(site.name(), SITE_WIDTH, Alignment::Left, Some(".."));
        println!(
            "  {}  {}  {}",
            padded,
            style(site.profile_url(username)).cyan(),
            style(site.rule().as_str()).dim()
        );
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(report: &ScanReport) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} site{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(report.completed).bold(),
        if report.completed == 1 { "" } else { "s" },
        report.duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} found", report.found_count())).green(),
        style("|").dim(),
        style(format!("{} not found", report.not_found)).red(),
        style("|").dim(),
        style(format!("{} errors", report.errors)).yellow(),
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(completed: usize, total: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            completed,
            total,
            finished: completed == total,
        }
    }

    fn plain(s: String) -> String {
        console::strip_ansi_codes(&s).to_string()
    }

    #[test]
    fn test_progress_bar_empty() {
        let bar = plain(progress_bar(&snapshot(0, 200)));
        assert!(bar.starts_with("[>"));
        assert!(bar.ends_with("  0% (0/200)"));
    }

    #[test]
    fn test_progress_bar_half() {
        let bar = plain(progress_bar(&snapshot(100, 200)));
        assert!(bar.starts_with(&format!("[{}>", "=".repeat(15))));
        assert!(bar.ends_with(" 50% (100/200)"));
    }

    #[test]
    fn test_progress_bar_complete() {
        let bar = plain(progress_bar(&snapshot(7, 7)));
        assert_eq!(bar, format!("[{}] 100% (7/7)", "=".repeat(BAR_WIDTH)));
    }

    #[test]
    fn test_progress_bar_empty_catalog() {
        let bar = plain(progress_bar(&snapshot(0, 0)));
        assert!(bar.ends_with("100% (0/0)"));
    }
}

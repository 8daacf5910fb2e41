use clap::{Parser, Subcommand};
use depscan::application::dto::{DashboardStats, ScanOutcome};
use depscan::scan_pipeline::domain::{Scan, ScanId, ScanStatus, SeverityCategory};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Run uploaded source archives through OWASP dependency-check
#[derive(Parser, Debug)]
#[command(name = "depscan")]
#[command(version)]
#[command(
    about = "Scan source archives for vulnerable dependencies and produce PDF reports",
    long_about = None
)]
pub struct Args {
    /// Path to a config file (defaults to ./depscan.config.yml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan one or more zip archives concurrently
    Scan {
        /// Archives to scan
        #[arg(required = true, value_name = "ARCHIVE")]
        archives: Vec<PathBuf>,

        /// Owner recorded on each scan
        #[arg(long)]
        owner: String,

        /// Include the PCI DSS compliance notice in the report
        #[arg(long)]
        compliance: bool,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// List scans, newest first
    History {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Severity counts across completed scans
    Stats {
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the path of a completed scan's PDF report
    Report {
        scan_id: ScanId,

        /// Principal recorded in the audit trail
        #[arg(long)]
        principal: String,
    },

    /// Delete the uploaded archive and extracted sources of a scan
    DeleteSource {
        scan_id: ScanId,

        #[arg(long)]
        principal: String,
    },

    /// Delete the PDF and scanner output of a scan
    DeleteReport {
        scan_id: ScanId,

        #[arg(long)]
        principal: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

pub fn format_outcome(outcome: &ScanOutcome, archive: &str) -> String {
    match outcome {
        ScanOutcome::Completed {
            scan_id,
            report_path,
            findings,
        } => format!(
            "✅ {} {} - {} finding(s), report: {}",
            scan_id,
            archive.bold(),
            findings.len(),
            report_path.display()
        ),
        ScanOutcome::Failed {
            scan_id,
            failed_at,
            message,
            ..
        } => format!(
            "❌ {} {} - failed during {}: {}",
            scan_id,
            archive.bold(),
            failed_at,
            message.red()
        ),
    }
}

pub fn format_history(scans: &[Scan]) -> String {
    if scans.is_empty() {
        return "No scans recorded.".to_string();
    }
    let mut out = String::new();
    for scan in scans {
        out.push_str(&format!(
            "{}  {}  {:<16}  {}  {}\n",
            scan.id(),
            colored_status(scan.status()),
            scan.owner(),
            scan.created_at().format("%Y-%m-%d %H:%M:%S"),
            scan.filename()
        ));
    }
    out
}

pub fn format_stats(stats: &DashboardStats) -> String {
    let mut out = format!("Total scans: {}\n", stats.total_scans);
    match stats.latest_timestamp {
        Some(latest) => out.push_str(&format!("Latest scan: {}\n", latest.to_rfc3339())),
        None => out.push_str("Latest scan: -\n"),
    }
    for category in SeverityCategory::ALL {
        let label = format!("{:<9}", category.as_str());
        let label = match category {
            SeverityCategory::Critical => label.red().bold().to_string(),
            SeverityCategory::High => label.red().to_string(),
            SeverityCategory::Medium => label.yellow().to_string(),
            SeverityCategory::Low => label.green().to_string(),
        };
        out.push_str(&format!("{} {}\n", label, stats.severity_counts.get(category)));
    }
    out
}

fn colored_status(status: ScanStatus) -> String {
    let text = format!("{:<17}", status.as_str());
    match status {
        ScanStatus::Completed => text.green().to_string(),
        ScanStatus::Failed => text.red().to_string(),
        _ => text.yellow().to_string(),
    }
}

use crate::ports::outbound::ProgressReporter;
use crate::scan_pipeline::domain::{ScanId, ScanStatus};
use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// StderrProgressReporter adapter for reporting scan progress to stderr
///
/// This adapter implements the ProgressReporter port, writing progress
/// information to stderr so it doesn't interfere with stdout output.
/// Each scan gets its own indicatif bar under a shared `MultiProgress`, so
/// concurrent scans render as separate lines.
pub struct StderrProgressReporter {
    multi: MultiProgress,
    bars: DashMap<ScanId, ProgressBar>,
}

impl StderrProgressReporter {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Reporter that tracks state but draws nothing
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: DashMap::new(),
        }
    }

    fn bar_for(&self, scan_id: &ScanId) -> ProgressBar {
        self.bars
            .entry(*scan_id)
            .or_insert_with(|| {
                let pb = self
                    .multi
                    .add(ProgressBar::new(ScanStatus::PIPELINE.len() as u64 - 1));
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("   {spinner:.green} {prefix} [{bar:20.cyan/blue}] {msg}")
                {
                    pb.set_style(style.progress_chars("=>-"));
                }
                pb.set_prefix(short_id(scan_id));
                pb
            })
            .clone()
    }

    fn finish(&self, scan_id: &ScanId) -> Option<ProgressBar> {
        self.bars.remove(scan_id).map(|(_, pb)| pb)
    }

    /// Number of scans currently shown
    pub fn active_scans(&self) -> usize {
        self.bars.len()
    }
}

impl Default for StderrProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for StderrProgressReporter {
    fn report_stage(&self, scan_id: &ScanId, status: ScanStatus) {
        let pb = self.bar_for(scan_id);
        if let Some(position) = ScanStatus::PIPELINE.iter().position(|s| *s == status) {
            pb.set_position(position as u64);
        }
        pb.set_message(status.as_str().to_string());
    }

    fn report_error(&self, scan_id: &ScanId, message: &str) {
        if let Some(pb) = self.finish(scan_id) {
            pb.abandon_with_message(format!("failed: {}", message));
        } else {
            let _ = self.multi.println(format!("{} failed: {}", short_id(scan_id), message));
        }
    }

    fn report_completion(&self, scan_id: &ScanId, message: &str) {
        if let Some(pb) = self.finish(scan_id) {
            pb.finish_with_message(message.to_string());
        } else {
            let _ = self.multi.println(format!("{} {}", short_id(scan_id), message));
        }
    }
}

fn short_id(scan_id: &ScanId) -> String {
    scan_id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reporter_tracks_bars_per_scan() {
        let reporter = StderrProgressReporter::hidden();
        let first = ScanId::generate();
        let second = ScanId::generate();

        reporter.report_stage(&first, ScanStatus::Extracting);
        reporter.report_stage(&second, ScanStatus::Scanning);
        reporter.report_stage(&first, ScanStatus::Scanning);
        assert_eq!(reporter.active_scans(), 2);

        reporter.report_completion(&first, "done");
        reporter.report_error(&second, "scanner timed out");
        assert_eq!(reporter.active_scans(), 0);
    }

    #[test]
    fn test_progress_reporter_messages_without_bar() {
        let reporter = StderrProgressReporter::hidden();
        // Can't easily test stderr output, but verify it doesn't panic
        reporter.report_error(&ScanId::generate(), "Test error");
        reporter.report_completion(&ScanId::generate(), "Test completion");
    }

    #[test]
    fn test_progress_reporter_default() {
        let reporter = StderrProgressReporter::default();
        assert_eq!(reporter.active_scans(), 0);
    }
}

use crate::scan_pipeline::domain::{ScanId, ScanStatus};

/// ProgressReporter port for interactive feedback while scans run
///
/// Several scans may report at once, so implementations must be
/// `Send + Sync` and keep per-scan state keyed by scan identifier.
pub trait ProgressReporter: Send + Sync {
    /// Reports that a scan entered a new status
    fn report_stage(&self, scan_id: &ScanId, status: ScanStatus);

    /// Reports a scan failure with a display-safe message
    fn report_error(&self, scan_id: &ScanId, message: &str);

    /// Reports successful completion of a scan
    fn report_completion(&self, scan_id: &ScanId, message: &str);
}

use crate::scan_pipeline::domain::{Finding, ScanId};
use crate::shared::PipelineResult;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Everything a rendered report needs to know about a scan
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub scan_id: &'a ScanId,
    /// Original archive filename, for display only
    pub filename: &'a str,
    pub owner: &'a str,
    pub compliance: bool,
    pub generated_at: DateTime<Utc>,
    pub findings: &'a [Finding],
}

/// ReportWriter port for materializing the final report artifact
///
/// The rendered document is opaque to the pipeline. The only requirement is
/// that it exists at `destination` when the call returns `Ok`.
pub trait ReportWriter: Send + Sync {
    fn write_report(&self, context: &ReportContext<'_>, destination: &Path) -> PipelineResult<()>;
}

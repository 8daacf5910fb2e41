use depscan::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock ReportWriter that writes a one-line summary instead of a PDF
#[derive(Default, Clone)]
pub struct MockReportWriter {
    skip_write: bool,
    rendered: Arc<Mutex<Vec<(ScanId, usize, bool)>>>,
}

impl MockReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports success without producing a file
    pub fn silently_skipping() -> Self {
        Self {
            skip_write: true,
            ..Self::default()
        }
    }

    /// `(scan id, finding count, compliance)` of every rendered report
    pub fn rendered(&self) -> Vec<(ScanId, usize, bool)> {
        self.rendered.lock().unwrap().clone()
    }
}

impl ReportWriter for MockReportWriter {
    fn write_report(&self, context: &ReportContext<'_>, destination: &Path) -> PipelineResult<()> {
        self.rendered.lock().unwrap().push((
            *context.scan_id,
            context.findings.len(),
            context.compliance,
        ));
        if self.skip_write {
            return Ok(());
        }
        std::fs::write(
            destination,
            format!("report for {} ({} findings)", context.filename, context.findings.len()),
        )
        .map_err(|e| ScanError::io("writing mock report", destination, e))
    }
}

use crate::application::dto::DashboardStats;
use crate::ports::outbound::ArtifactStore;
use crate::scan_pipeline::domain::{Scan, ScanStatus, SeverityCounts};
use crate::scan_pipeline::services::VulnerabilityExtractor;
use std::sync::Arc;

/// StatsAggregator - folds findings of many scans into dashboard counters
///
/// Reads each completed scan's relocated scanner report through the
/// artifact store layout. A scan whose report is missing or unparsable is
/// logged and skipped; it never aborts the aggregate.
pub struct StatsAggregator<STORE> {
    store: Arc<STORE>,
    extractor: VulnerabilityExtractor,
}

impl<STORE: ArtifactStore> StatsAggregator<STORE> {
    pub fn new(store: Arc<STORE>) -> Self {
        Self {
            store,
            extractor: VulnerabilityExtractor::default(),
        }
    }

    pub fn aggregate(&self, scans: &[Scan]) -> DashboardStats {
        let mut severity_counts = SeverityCounts::default();

        for scan in scans {
            if scan.status() != ScanStatus::Completed {
                tracing::debug!(
                    scan_id = %scan.id(),
                    status = %scan.status(),
                    "Skipping scan without a final report"
                );
                continue;
            }

            let layout = self.store.layout(scan.id());
            let scan_root = layout.extraction_dir().to_string_lossy().into_owned();
            match self
                .extractor
                .extract_file(&layout.final_report_file(), &scan_root)
            {
                Ok(findings) => severity_counts.merge(&SeverityCounts::tally(&findings)),
                Err(e) => tracing::warn!(
                    scan_id = %scan.id(),
                    category = %e.category(),
                    error = %e,
                    "Skipping scan report in aggregate"
                ),
            }
        }

        DashboardStats {
            total_scans: scans.len(),
            latest_timestamp: scans.iter().map(|s| s.created_at()).max(),
            severity_counts,
        }
    }
}

use crate::scan_pipeline::domain::{Finding, ScanId, ScanStatus};
use crate::shared::error::FailureCategory;
use serde::Serialize;
use std::path::PathBuf;

/// Terminal result of one scan, as seen by the submitter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed {
        scan_id: ScanId,
        report_path: PathBuf,
        findings: Vec<Finding>,
    },
    Failed {
        scan_id: ScanId,
        /// Status the scan was in when the error occurred
        failed_at: ScanStatus,
        category: FailureCategory,
        /// Display-safe diagnostic
        message: String,
    },
}

impl ScanOutcome {
    pub fn scan_id(&self) -> &ScanId {
        match self {
            ScanOutcome::Completed { scan_id, .. } | ScanOutcome::Failed { scan_id, .. } => scan_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ScanOutcome::Completed { .. })
    }
}

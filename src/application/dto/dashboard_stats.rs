use crate::scan_pipeline::domain::SeverityCounts;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate view over many scans for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Every scan handed to the aggregation, whether or not it had a report
    pub total_scans: usize,
    /// Creation time of the newest scan
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub severity_counts: SeverityCounts,
}

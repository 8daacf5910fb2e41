use crate::scan_pipeline::domain::{Scan, ScanId, ScanStatus};
use crate::shared::PipelineResult;
use async_trait::async_trait;
use std::path::Path;

/// ScanRepository port for persisted scan records
///
/// Status is the only state shared between a running scan and concurrent
/// readers. Every mutation must be a single atomic write so readers never
/// observe a half-applied transition.
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Persists a newly created scan record
    async fn insert(&self, scan: &Scan) -> PipelineResult<()>;

    /// Compare-and-set status update
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the transition is not on the lifecycle
    /// graph, or if the stored status is no longer `from`
    async fn transition(&self, scan_id: &ScanId, from: ScanStatus, to: ScanStatus)
        -> PipelineResult<()>;

    /// Moves `report_generating -> completed` and records the report path in
    /// the same write
    async fn complete(&self, scan_id: &ScanId, report_path: &Path) -> PipelineResult<()>;

    async fn find(&self, scan_id: &ScanId) -> PipelineResult<Option<Scan>>;

    /// Lists scans, newest first, optionally restricted to one owner
    async fn list(&self, owner: Option<&str>) -> PipelineResult<Vec<Scan>>;
}

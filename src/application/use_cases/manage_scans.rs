use crate::ports::outbound::{ArtifactStore, AuditLog, ScanRepository};
use crate::scan_pipeline::domain::{
    ArtifactKind, AuditAction, AuditEvent, DeleteOutcome, Scan, ScanId, ScanStatus,
};
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use std::path::PathBuf;
use std::sync::Arc;

/// ManageScansUseCase - read and administrative operations on scan records
///
/// Authorization is the caller's concern. `principal` is recorded in the
/// audit trail only.
pub struct ManageScansUseCase<REPO, STORE> {
    repository: Arc<REPO>,
    store: Arc<STORE>,
}

impl<REPO, STORE> ManageScansUseCase<REPO, STORE>
where
    REPO: ScanRepository + AuditLog,
    STORE: ArtifactStore + 'static,
{
    pub fn new(repository: Arc<REPO>, store: Arc<STORE>) -> Self {
        Self { repository, store }
    }

    /// Scan records, newest first
    pub async fn history(&self, owner: Option<&str>) -> PipelineResult<Vec<Scan>> {
        self.repository.list(owner).await
    }

    /// Returns the rendered report of a completed scan and audits the access
    ///
    /// `None` for unknown scans, scans that have not completed, and reports
    /// that have been deleted.
    pub async fn report_for_download(
        &self,
        scan_id: &ScanId,
        principal: &str,
    ) -> PipelineResult<Option<PathBuf>> {
        let Some(scan) = self.repository.find(scan_id).await? else {
            return Ok(None);
        };
        if scan.status() != ScanStatus::Completed {
            return Ok(None);
        }
        let Some(report_path) = scan.report_path().filter(|p| p.is_file()).cloned() else {
            tracing::debug!(scan_id = %scan_id, "Report file no longer present");
            return Ok(None);
        };

        self.repository
            .record(AuditEvent::new(
                format!("Downloaded report for scan {}", scan_id),
                principal,
                AuditAction::ReportDownload,
            ))
            .await?;
        Ok(Some(report_path))
    }

    /// Removes the uploaded archive and extracted tree of a scan
    pub async fn delete_source(
        &self,
        scan_id: &ScanId,
        principal: &str,
    ) -> PipelineResult<DeleteOutcome> {
        self.delete(scan_id, ArtifactKind::Source, principal).await
    }

    /// Removes the rendered PDF and relocated scanner output of a scan
    pub async fn delete_reports(
        &self,
        scan_id: &ScanId,
        principal: &str,
    ) -> PipelineResult<DeleteOutcome> {
        self.delete(scan_id, ArtifactKind::Reports, principal).await
    }

    async fn delete(
        &self,
        scan_id: &ScanId,
        kind: ArtifactKind,
        principal: &str,
    ) -> PipelineResult<DeleteOutcome> {
        let store = Arc::clone(&self.store);
        let id = *scan_id;
        let outcome = tokio::task::spawn_blocking(move || store.delete(&id, kind))
            .await
            .map_err(|e| ScanError::IoFailure {
                operation: format!("deleting {} artifacts", kind),
                path: PathBuf::new(),
                details: e.to_string(),
            })??;

        tracing::info!(
            scan_id = %scan_id,
            kind = %kind,
            outcome = ?outcome,
            principal,
            "Artifact deletion"
        );

        if outcome == DeleteOutcome::Deleted {
            self.repository
                .record(AuditEvent::new(
                    format!("Deleted {} artifacts of scan {}", kind, scan_id),
                    principal,
                    AuditAction::Delete,
                ))
                .await?;
        }
        Ok(outcome)
    }
}

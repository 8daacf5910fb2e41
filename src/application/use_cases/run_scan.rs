use crate::application::dto::{ScanHandle, ScanOutcome, ScanRequest};
use crate::ports::outbound::{
    ArtifactStore, AuditLog, ProgressReporter, ProjectId, ReportContext, ReportWriter,
    ScanInvocation, ScanRepository, VulnerabilityScanner,
};
use crate::scan_pipeline::domain::{
    ArtifactLayout, AuditAction, AuditEvent, Finding, Scan, ScanId, ScanStatus,
};
use crate::scan_pipeline::services::VulnerabilityExtractor;
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use chrono::Utc;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Settings the orchestrator passes to every scanner invocation
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Pre-populated vulnerability feed directory (absolute)
    pub data_dir: PathBuf,
    pub scanner_timeout: Duration,
}

/// ScanOrchestrator - drives one scan from upload to a terminal status
///
/// Every scan runs on its own tokio task. Filesystem stages run on the
/// blocking pool; the scanner stage awaits the subprocess under the scan's
/// cancellation token. Each status transition is persisted before the next
/// stage starts. On error the scan moves to `failed` and stops; artifacts
/// already written stay on disk.
///
/// # Type Parameters
/// * `REPO` - ScanRepository + AuditLog implementation
/// * `STORE` - ArtifactStore implementation
/// * `SCAN` - VulnerabilityScanner implementation
/// * `RW` - ReportWriter implementation
/// * `PR` - ProgressReporter implementation
pub struct ScanOrchestrator<REPO, STORE, SCAN, RW, PR> {
    repository: Arc<REPO>,
    store: Arc<STORE>,
    scanner: Arc<SCAN>,
    report_writer: Arc<RW>,
    progress: Arc<PR>,
    extractor: VulnerabilityExtractor,
    settings: OrchestratorSettings,
    in_flight: Arc<DashMap<ScanId, CancellationToken>>,
}

impl<REPO, STORE, SCAN, RW, PR> Clone for ScanOrchestrator<REPO, STORE, SCAN, RW, PR> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            store: Arc::clone(&self.store),
            scanner: Arc::clone(&self.scanner),
            report_writer: Arc::clone(&self.report_writer),
            progress: Arc::clone(&self.progress),
            extractor: self.extractor.clone(),
            settings: self.settings.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<REPO, STORE, SCAN, RW, PR> ScanOrchestrator<REPO, STORE, SCAN, RW, PR>
where
    REPO: ScanRepository + AuditLog + 'static,
    STORE: ArtifactStore + 'static,
    SCAN: VulnerabilityScanner + 'static,
    RW: ReportWriter + 'static,
    PR: ProgressReporter + 'static,
{
    /// Creates a new ScanOrchestrator with injected dependencies
    pub fn new(
        repository: Arc<REPO>,
        store: Arc<STORE>,
        scanner: Arc<SCAN>,
        report_writer: Arc<RW>,
        progress: Arc<PR>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            repository,
            store,
            scanner,
            report_writer,
            progress,
            extractor: VulnerabilityExtractor::default(),
            settings,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Accepts an archive: persists the scan in `uploading` and starts the
    /// pipeline on a dedicated task
    ///
    /// # Errors
    /// Only errors that prevent the scan record from being created are
    /// returned here (invalid owner, database failure). Everything after
    /// that is reported through the handle's [`ScanOutcome`].
    pub async fn submit(&self, request: ScanRequest) -> PipelineResult<ScanHandle> {
        let scan = Scan::new(request.owner, request.filename, request.compliance)?;
        self.repository.insert(&scan).await?;

        let scan_id = *scan.id();
        tracing::info!(
            scan_id = %scan_id,
            owner = scan.owner(),
            filename = scan.filename(),
            bytes = request.archive.len(),
            "Scan accepted"
        );
        self.progress.report_stage(&scan_id, ScanStatus::Uploading);

        let cancel = CancellationToken::new();
        self.in_flight.insert(scan_id, cancel.clone());
        let (status_tx, status_rx) = watch::channel(ScanStatus::Uploading);

        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = orchestrator
                .drive(scan, request.archive, token, status_tx)
                .await;
            orchestrator.in_flight.remove(outcome.scan_id());
            outcome
        });

        Ok(ScanHandle::new(scan_id, cancel, status_rx, task))
    }

    /// Submits a scan and waits for its terminal outcome
    pub async fn run(&self, request: ScanRequest) -> PipelineResult<ScanOutcome> {
        let handle = self.submit(request).await?;
        Ok(handle.wait().await)
    }

    /// Requests cancellation of an in-flight scan
    ///
    /// # Returns
    /// `false` when no scan with that id is running in this process
    pub fn cancel(&self, scan_id: &ScanId) -> bool {
        match self.in_flight.get(scan_id) {
            Some(token) => {
                tracing::info!(scan_id = %scan_id, "Cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every in-flight scan
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.in_flight.iter() {
            entry.value().cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Number of scans currently running in this process
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    async fn drive(
        &self,
        scan: Scan,
        archive: Vec<u8>,
        cancel: CancellationToken,
        status_tx: watch::Sender<ScanStatus>,
    ) -> ScanOutcome {
        let mut tracker = StatusTracker {
            scan_id: *scan.id(),
            current: ScanStatus::Uploading,
            status_tx,
        };

        match self.execute(&scan, archive, &cancel, &mut tracker).await {
            Ok((report_path, findings)) => {
                self.record_audit(AuditEvent::new(
                    format!(
                        "Scan {} of {} completed with {} finding(s)",
                        scan.id(),
                        scan.filename(),
                        findings.len()
                    ),
                    scan.owner(),
                    AuditAction::Scan,
                ))
                .await;
                self.progress.report_completion(
                    scan.id(),
                    &format!("completed: {} finding(s)", findings.len()),
                );
                tracing::info!(
                    scan_id = %scan.id(),
                    findings = findings.len(),
                    report = %report_path.display(),
                    "Scan completed"
                );
                ScanOutcome::Completed {
                    scan_id: *scan.id(),
                    report_path,
                    findings,
                }
            }
            Err(err) => self.fail(&scan, &mut tracker, err).await,
        }
    }

    /// Runs every stage in order; any error aborts the remaining stages
    async fn execute(
        &self,
        scan: &Scan,
        archive: Vec<u8>,
        cancel: &CancellationToken,
        tracker: &mut StatusTracker,
    ) -> PipelineResult<(PathBuf, Vec<Finding>)> {
        let scan_id = *scan.id();
        let layout = self.store.layout(&scan_id);

        // uploading: write the archive into the scan's own directory
        ensure_active(cancel)?;
        let store = Arc::clone(&self.store);
        let filename = scan.filename().to_string();
        let archive_path =
            blocking(move || store.stage(&scan_id, &archive, &filename)).await?;
        self.advance(tracker, ScanStatus::Extracting).await?;

        // extracting
        ensure_active(cancel)?;
        let store = Arc::clone(&self.store);
        let extraction_dir = layout.extraction_dir().to_path_buf();
        blocking(move || store.extract(&archive_path, &extraction_dir)).await?;
        self.advance(tracker, ScanStatus::Scanning).await?;

        // scanning
        ensure_active(cancel)?;
        let invocation = ScanInvocation::new(
            ProjectId::new(scan_id.to_string())?,
            layout.extraction_dir().to_path_buf(),
            layout.intermediate_report_dir().to_path_buf(),
            self.settings.data_dir.clone(),
            self.settings.scanner_timeout,
        )?;
        let result = self.scanner.run(&invocation, cancel).await?;
        tracing::debug!(
            scan_id = %scan_id,
            exit_code = result.exit_code,
            stdout_bytes = result.stdout.len(),
            "Scanner finished"
        );
        self.advance(tracker, ScanStatus::ReportGenerating).await?;

        // report_generating: parse, render, relocate, then complete
        ensure_active(cancel)?;
        let (report_path, findings) = self.generate_report(scan, layout).await?;
        self.repository.complete(&scan_id, &report_path).await?;
        tracker.publish(ScanStatus::Completed);
        self.progress.report_stage(&scan_id, ScanStatus::Completed);
        tracing::info!(scan_id = %scan_id, status = %ScanStatus::Completed, "Status persisted");

        Ok((report_path, findings))
    }

    async fn generate_report(
        &self,
        scan: &Scan,
        layout: ArtifactLayout,
    ) -> PipelineResult<(PathBuf, Vec<Finding>)> {
        let store = Arc::clone(&self.store);
        let writer = Arc::clone(&self.report_writer);
        let extractor = self.extractor.clone();
        let scan = scan.clone();

        blocking(move || {
            let scan_root = layout.extraction_dir().to_string_lossy().into_owned();
            let findings = extractor.extract_file(&layout.intermediate_report_file(), &scan_root)?;
            tracing::debug!(
                scan_id = %scan.id(),
                findings = findings.len(),
                "Scanner report parsed"
            );

            let context = ReportContext {
                scan_id: scan.id(),
                filename: scan.filename(),
                owner: scan.owner(),
                compliance: scan.compliance(),
                generated_at: Utc::now(),
                findings: &findings,
            };
            writer.write_report(&context, layout.pdf_path())?;
            if !layout.pdf_path().is_file() {
                return Err(ScanError::MissingReportArtifact {
                    path: layout.pdf_path().to_path_buf(),
                });
            }

            store.finalize(layout.intermediate_report_dir(), scan.id())?;
            Ok((layout.pdf_path().to_path_buf(), findings))
        })
        .await
    }

    /// Persists the next status, then publishes it to observers
    async fn advance(&self, tracker: &mut StatusTracker, to: ScanStatus) -> PipelineResult<()> {
        self.repository
            .transition(&tracker.scan_id, tracker.current, to)
            .await?;
        tracker.publish(to);
        self.progress.report_stage(&tracker.scan_id, to);
        tracing::info!(scan_id = %tracker.scan_id, status = %to, "Status persisted");
        Ok(())
    }

    async fn fail(&self, scan: &Scan, tracker: &mut StatusTracker, err: ScanError) -> ScanOutcome {
        let failed_at = tracker.current;
        let category = err.category();
        let message = err.user_message();

        tracing::error!(
            scan_id = %scan.id(),
            failed_at = %failed_at,
            category = %category,
            error = %err,
            "Scan failed"
        );

        match self
            .repository
            .transition(scan.id(), failed_at, ScanStatus::Failed)
            .await
        {
            Ok(()) => tracker.publish(ScanStatus::Failed),
            Err(persist_err) => tracing::error!(
                scan_id = %scan.id(),
                error = %persist_err,
                "Could not persist failed status"
            ),
        }

        self.record_audit(AuditEvent::new(
            format!(
                "Scan {} of {} failed during {}: {}",
                scan.id(),
                scan.filename(),
                failed_at,
                category
            ),
            scan.owner(),
            AuditAction::ScanFailed,
        ))
        .await;
        self.progress.report_error(scan.id(), &message);

        ScanOutcome::Failed {
            scan_id: *scan.id(),
            failed_at,
            category,
            message,
        }
    }

    /// Audit failures never change a scan's outcome
    async fn record_audit(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(e) = self.repository.record(event).await {
            tracing::error!(action = %action, error = %e, "Failed to record audit event");
        }
    }
}

/// Last persisted status of one scan, mirrored to its handle
struct StatusTracker {
    scan_id: ScanId,
    current: ScanStatus,
    status_tx: watch::Sender<ScanStatus>,
}

impl StatusTracker {
    fn publish(&mut self, status: ScanStatus) {
        self.current = status;
        self.status_tx.send_replace(status);
    }
}

fn ensure_active(cancel: &CancellationToken) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        Err(ScanError::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs a filesystem stage on the blocking pool
async fn blocking<T, F>(stage: F) -> PipelineResult<T>
where
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(stage).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(ScanError::Cancelled),
    }
}

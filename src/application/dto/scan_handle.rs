use super::ScanOutcome;
use crate::scan_pipeline::domain::{ScanId, ScanStatus};
use crate::shared::error::FailureCategory;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a scan running on its own task
///
/// Dropping the handle does not stop the scan; use [`ScanHandle::cancel`].
pub struct ScanHandle {
    scan_id: ScanId,
    cancel: CancellationToken,
    status: watch::Receiver<ScanStatus>,
    task: JoinHandle<ScanOutcome>,
}

impl ScanHandle {
    pub(crate) fn new(
        scan_id: ScanId,
        cancel: CancellationToken,
        status: watch::Receiver<ScanStatus>,
        task: JoinHandle<ScanOutcome>,
    ) -> Self {
        Self {
            scan_id,
            cancel,
            status,
            task,
        }
    }

    pub fn scan_id(&self) -> &ScanId {
        &self.scan_id
    }

    /// Last persisted status of the scan
    pub fn status(&self) -> ScanStatus {
        *self.status.borrow()
    }

    /// Requests cancellation; a running scanner process is killed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the scan to reach a terminal status
    ///
    /// # Panics
    /// Re-raises a panic from the scan task.
    pub async fn wait(self) -> ScanOutcome {
        let last_status = *self.status.borrow();
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => ScanOutcome::Failed {
                scan_id: self.scan_id,
                failed_at: last_status,
                category: FailureCategory::Cancelled,
                message: "scan task was aborted".to_string(),
            },
        }
    }
}

use crate::ports::outbound::{AuditLog, ScanRepository};
use crate::scan_pipeline::domain::{AuditEvent, Scan, ScanId, ScanStatus};
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Mutex;

/// InMemoryScanRepository adapter for ephemeral runs and tests
///
/// Each record sits behind its DashMap shard lock, so a transition is
/// checked and applied under one lock acquisition.
#[derive(Default)]
pub struct InMemoryScanRepository {
    scans: DashMap<ScanId, Scan>,
    audit: Mutex<Vec<AuditEvent>>,
}

impl InMemoryScanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded audit events, oldest first
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn apply(
        &self,
        scan_id: &ScanId,
        from: ScanStatus,
        to: ScanStatus,
        update: impl FnOnce(&mut Scan) -> PipelineResult<()>,
    ) -> PipelineResult<()> {
        let mut entry = self.scans.get_mut(scan_id).ok_or_else(|| ScanError::Persistence {
            details: format!("scan {} does not exist", scan_id),
        })?;

        if entry.status() != from {
            return Err(ScanError::InvalidTransition {
                from: entry.status().to_string(),
                to: to.to_string(),
            });
        }
        update(entry.value_mut())
    }
}

#[async_trait]
impl ScanRepository for InMemoryScanRepository {
    async fn insert(&self, scan: &Scan) -> PipelineResult<()> {
        if self.scans.contains_key(scan.id()) {
            return Err(ScanError::persistence(format!("scan {} already exists", scan.id())));
        }
        self.scans.insert(*scan.id(), scan.clone());
        Ok(())
    }

    async fn transition(
        &self,
        scan_id: &ScanId,
        from: ScanStatus,
        to: ScanStatus,
    ) -> PipelineResult<()> {
        let to = from.advance(to)?;
        if to == ScanStatus::Completed {
            return Err(ScanError::Validation {
                message: "completion must record a report path".to_string(),
            });
        }
        self.apply(scan_id, from, to, |scan| scan.transition_to(to))
    }

    async fn complete(&self, scan_id: &ScanId, report_path: &Path) -> PipelineResult<()> {
        self.apply(
            scan_id,
            ScanStatus::ReportGenerating,
            ScanStatus::Completed,
            |scan| scan.complete(report_path.to_path_buf()),
        )
    }

    async fn find(&self, scan_id: &ScanId) -> PipelineResult<Option<Scan>> {
        Ok(self.scans.get(scan_id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, owner: Option<&str>) -> PipelineResult<Vec<Scan>> {
        let mut scans: Vec<Scan> = self
            .scans
            .iter()
            .filter(|entry| owner.map_or(true, |o| entry.owner() == o))
            .map(|entry| entry.value().clone())
            .collect();
        scans.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(a.id())));
        Ok(scans)
    }
}

#[async_trait]
impl AuditLog for InMemoryScanRepository {
    async fn record(&self, event: AuditEvent) -> PipelineResult<()> {
        self.audit
            .lock()
            .map_err(|_| ScanError::persistence("audit log lock poisoned"))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_pipeline::domain::AuditAction;

    fn scan(owner: &str) -> Scan {
        Scan::new(owner.to_string(), "app.zip".to_string(), true).unwrap()
    }

    #[tokio::test]
    async fn test_transition_compare_and_set() {
        let repo = InMemoryScanRepository::new();
        let scan = scan("alice");
        repo.insert(&scan).await.unwrap();

        repo.transition(scan.id(), ScanStatus::Uploading, ScanStatus::Extracting)
            .await
            .unwrap();
        assert!(repo
            .transition(scan.id(), ScanStatus::Uploading, ScanStatus::Extracting)
            .await
            .is_err());
        assert!(repo
            .transition(scan.id(), ScanStatus::Extracting, ScanStatus::ReportGenerating)
            .await
            .is_err());

        let stored = repo.find(scan.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), ScanStatus::Extracting);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let repo = InMemoryScanRepository::new();
        let scan = scan("alice");
        repo.insert(&scan).await.unwrap();
        assert!(matches!(
            repo.insert(&scan).await.unwrap_err(),
            ScanError::Persistence { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_scan_is_persistence_error() {
        let repo = InMemoryScanRepository::new();
        let err = repo
            .transition(&ScanId::generate(), ScanStatus::Uploading, ScanStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let repo = InMemoryScanRepository::new();
        repo.insert(&scan("alice")).await.unwrap();
        repo.insert(&scan("bob")).await.unwrap();

        assert_eq!(repo.list(Some("alice")).await.unwrap().len(), 1);
        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        assert!(repo.list(Some("carol")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_events_are_recorded_in_order() {
        let repo = InMemoryScanRepository::new();
        repo.record(AuditEvent::new("first", "alice", AuditAction::Scan))
            .await
            .unwrap();
        repo.record(AuditEvent::new("second", "alice", AuditAction::ScanFailed))
            .await
            .unwrap();

        let events = repo.audit_events();
        assert_eq!(events[0].event, "first");
        assert_eq!(events[1].action, AuditAction::ScanFailed);
    }
}

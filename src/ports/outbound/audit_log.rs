use crate::scan_pipeline::domain::AuditEvent;
use crate::shared::PipelineResult;
use async_trait::async_trait;

/// AuditLog port for recording security-relevant actions
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> PipelineResult<()>;
}

pub mod artifact_layout;
pub mod audit_event;
pub mod finding;
pub mod scan;

pub use artifact_layout::{ArtifactKind, ArtifactLayout, DeleteOutcome, SCANNER_REPORT_FILE};
pub use audit_event::{AuditAction, AuditEvent};
pub use finding::{Finding, SeverityCategory, SeverityCounts, NOT_APPLICABLE, UNKNOWN};
pub use scan::{Scan, ScanId, ScanStatus, STATUS_ENCODING_VERSION};

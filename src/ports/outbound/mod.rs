/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (file system, scanner process,
/// database, report renderer, console).
pub mod artifact_store;
pub mod audit_log;
pub mod progress_reporter;
pub mod report_writer;
pub mod scan_repository;
pub mod vulnerability_scanner;

pub use artifact_store::ArtifactStore;
pub use audit_log::AuditLog;
pub use progress_reporter::ProgressReporter;
pub use report_writer::{ReportContext, ReportWriter};
pub use scan_repository::ScanRepository;
pub use vulnerability_scanner::{ProjectId, ScanInvocation, ScanResult, VulnerabilityScanner};

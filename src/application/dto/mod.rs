/// Data Transfer Objects for application layer
///
/// DTOs are used to transfer data between the application layer
/// and adapters, keeping the domain layer isolated.
mod dashboard_stats;
mod scan_handle;
mod scan_outcome;
mod scan_request;

pub use dashboard_stats::DashboardStats;
pub use scan_handle::ScanHandle;
pub use scan_outcome::ScanOutcome;
pub use scan_request::ScanRequest;

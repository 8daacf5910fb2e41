/// Use cases module containing application business logic orchestration
mod aggregate_stats;
mod manage_scans;
mod run_scan;

pub use aggregate_stats::StatsAggregator;
pub use manage_scans::ManageScansUseCase;
pub use run_scan::{OrchestratorSettings, ScanOrchestrator};

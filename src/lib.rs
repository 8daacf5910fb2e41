//! depscan - vulnerability scan pipeline for uploaded source archives
//!
//! Each submitted zip archive is staged, extracted, scanned with OWASP
//! dependency-check, parsed into findings and rendered as a PDF report.
//! Scan records move through a persisted status lifecycle and every
//! failure ends in the `failed` status with a categorized error.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`scan_pipeline`): Scan lifecycle, findings, path normalization and report parsing
//! - **Application Layer** (`application`): The scan orchestrator, statistics and scan management
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Filesystem, process, SQLite, PDF and console implementations
//! - **Shared** (`shared`): Error taxonomy, result aliases and path safety helpers
//!
//! # Example
//!
//! ```no_run
//! use depscan::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let config = PipelineConfig::default();
//! let context = AppContext::initialize(config).await?;
//!
//! let archive = std::fs::read("app.zip")?;
//! let handle = context
//!     .orchestrator()?
//!     .submit(ScanRequest::new("alice", "app.zip", false, archive))
//!     .await?;
//!
//! match handle.wait().await {
//!     ScanOutcome::Completed { report_path, .. } => println!("{}", report_path.display()),
//!     ScanOutcome::Failed { message, .. } => eprintln!("{}", message),
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod context;
pub mod ports;
pub mod scan_pipeline;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::console::StderrProgressReporter;
    pub use crate::adapters::outbound::filesystem::FileSystemArtifactStore;
    pub use crate::adapters::outbound::persistence::{
        InMemoryScanRepository, SqliteScanRepository,
    };
    pub use crate::adapters::outbound::process::DependencyCheckScanner;
    pub use crate::adapters::outbound::report::PdfReportWriter;
    pub use crate::application::dto::{DashboardStats, ScanHandle, ScanOutcome, ScanRequest};
    pub use crate::application::use_cases::{
        ManageScansUseCase, OrchestratorSettings, ScanOrchestrator, StatsAggregator,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::context::AppContext;
    pub use crate::ports::outbound::{
        ArtifactStore, AuditLog, ProgressReporter, ReportContext, ReportWriter, ScanRepository,
        VulnerabilityScanner,
    };
    pub use crate::scan_pipeline::domain::{
        Finding, Scan, ScanId, ScanStatus, SeverityCategory, SeverityCounts,
    };
    pub use crate::scan_pipeline::services::{PathNormalizer, VulnerabilityExtractor};
    pub use crate::shared::{FailureCategory, PipelineResult, Result, ScanError};
}

//! Explicitly constructed application context.
//!
//! All shared handles (database pool, storage roots, adapters) are built
//! once by [`AppContext::initialize`] and handed to the use cases.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::outbound::console::StderrProgressReporter;
use crate::adapters::outbound::filesystem::FileSystemArtifactStore;
use crate::adapters::outbound::persistence::SqliteScanRepository;
use crate::adapters::outbound::process::DependencyCheckScanner;
use crate::adapters::outbound::report::PdfReportWriter;
use crate::application::use_cases::{
    ManageScansUseCase, OrchestratorSettings, ScanOrchestrator, StatsAggregator,
};
use crate::config::PipelineConfig;
use crate::shared::Result;

/// Orchestrator wired to the production adapters
pub type Orchestrator = ScanOrchestrator<
    SqliteScanRepository,
    FileSystemArtifactStore,
    DependencyCheckScanner,
    PdfReportWriter,
    StderrProgressReporter,
>;

pub struct AppContext {
    config: PipelineConfig,
    repository: Arc<SqliteScanRepository>,
    store: Arc<FileSystemArtifactStore>,
    scanner: Arc<DependencyCheckScanner>,
    report_writer: Arc<PdfReportWriter>,
    progress: Arc<StderrProgressReporter>,
}

impl AppContext {
    /// One-time initialization: creates the storage roots, opens the
    /// database (creating the schema) and builds the adapters
    pub async fn initialize(config: PipelineConfig) -> Result<Self> {
        let store = FileSystemArtifactStore::new(&config.upload_root, &config.report_root)
            .context("Failed to resolve storage roots")?
            .with_max_archive_bytes(config.max_archive_bytes);
        store.ensure_roots().with_context(|| {
            format!(
                "Failed to create storage directories\n\n💡 Hint: Check write permissions for {} and {}",
                config.upload_root.display(),
                config.report_root.display()
            )
        })?;

        let repository = SqliteScanRepository::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open scan database: {}", config.database_url))?;

        let scanner = DependencyCheckScanner::new(&config.scanner_command)
            .with_launcher_args(config.scanner_launcher_args.iter().cloned());

        tracing::info!(
            upload_root = %store.upload_root().display(),
            report_root = %store.report_root().display(),
            scanner = %config.scanner_command,
            "Application context initialized"
        );

        Ok(Self {
            config,
            repository: Arc::new(repository),
            store: Arc::new(store),
            scanner: Arc::new(scanner),
            report_writer: Arc::new(PdfReportWriter::new()),
            progress: Arc::new(StderrProgressReporter::new()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Ok(ScanOrchestrator::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.store),
            Arc::clone(&self.scanner),
            Arc::clone(&self.report_writer),
            Arc::clone(&self.progress),
            OrchestratorSettings {
                data_dir: self.absolute_data_dir()?,
                scanner_timeout: self.config.scanner_timeout(),
            },
        ))
    }

    pub fn manage_scans(&self) -> ManageScansUseCase<SqliteScanRepository, FileSystemArtifactStore> {
        ManageScansUseCase::new(Arc::clone(&self.repository), Arc::clone(&self.store))
    }

    pub fn stats(&self) -> StatsAggregator<FileSystemArtifactStore> {
        StatsAggregator::new(Arc::clone(&self.store))
    }

    fn absolute_data_dir(&self) -> Result<PathBuf> {
        let data_dir = &self.config.scanner_data_dir;
        if data_dir.is_absolute() {
            return Ok(data_dir.clone());
        }
        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        Ok(cwd.join(data_dir))
    }
}

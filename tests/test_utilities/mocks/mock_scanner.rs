use async_trait::async_trait;
use depscan::ports::outbound::{ScanInvocation, ScanResult};
use depscan::prelude::*;
use depscan::scan_pipeline::domain::SCANNER_REPORT_FILE;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// What the mock scanner does when invoked
#[derive(Debug, Clone)]
pub enum ScannerBehavior {
    /// Writes the given JSON as the scanner report and exits 0
    Report(String),
    /// Exits 0 without writing a report
    NoReport,
    /// Exits with the given code
    Exit(i32),
    /// Behaves like a scanner that ran past its time limit
    Timeout,
    /// Runs until the scan is cancelled
    Hang,
}

/// Mock VulnerabilityScanner driven by a [`ScannerBehavior`]
///
/// When gated, `run` signals `started` and waits for `release` before
/// acting, so tests can observe the pipeline while the scanner runs.
#[derive(Clone)]
pub struct MockScanner {
    behavior: ScannerBehavior,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    invocations: Arc<Mutex<Vec<(String, PathBuf, PathBuf)>>>,
}

impl MockScanner {
    pub fn new(behavior: ScannerBehavior) -> Self {
        Self {
            behavior,
            gate: None,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn gated(behavior: ScannerBehavior) -> (Self, Arc<Notify>, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut scanner = Self::new(behavior);
        scanner.gate = Some((Arc::clone(&started), Arc::clone(&release)));
        (scanner, started, release)
    }

    /// `(project id, source root, output dir)` of every invocation
    pub fn invocations(&self) -> Vec<(String, PathBuf, PathBuf)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl VulnerabilityScanner for MockScanner {
    async fn run(
        &self,
        invocation: &ScanInvocation,
        cancel: &CancellationToken,
    ) -> PipelineResult<ScanResult> {
        self.invocations.lock().unwrap().push((
            invocation.project_id().as_str().to_string(),
            invocation.source_root().to_path_buf(),
            invocation.output_dir().to_path_buf(),
        ));

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let success = ScanResult {
            exit_code: 0,
            stdout: "Analysis complete".to_string(),
            stderr: String::new(),
        };

        match &self.behavior {
            ScannerBehavior::Report(json) => {
                let dir = invocation.output_dir();
                std::fs::create_dir_all(dir)
                    .map_err(|e| ScanError::io("creating report dir", dir, e))?;
                let file = dir.join(SCANNER_REPORT_FILE);
                std::fs::write(&file, json)
                    .map_err(|e| ScanError::io("writing report", &file, e))?;
                Ok(success)
            }
            ScannerBehavior::NoReport => Ok(success),
            ScannerBehavior::Exit(code) => Err(ScanError::ScannerFailure {
                exit_code: Some(*code),
                stdout: String::new(),
                stderr: "[ERROR] analysis failed".to_string(),
            }),
            ScannerBehavior::Timeout => Err(ScanError::ScannerTimeout {
                timeout: invocation.timeout(),
            }),
            ScannerBehavior::Hang => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(ScanError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(success),
                }
            }
        }
    }
}

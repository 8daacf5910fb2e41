use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish between a scan that ran
/// and failed, bad invocations, and infrastructure errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - every submitted scan completed
    Success = 0,
    /// At least one scan ended in the `failed` status
    ScanFailed = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (configuration, database, file I/O, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::ScanFailed => write!(f, "Scan Failed (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Closed set of failure categories a caller can pattern-match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Io,
    CorruptArchive,
    ScannerFailure,
    ScannerTimeout,
    MalformedReport,
    MissingReportArtifact,
    Cancelled,
    InvalidTransition,
    Persistence,
    Validation,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureCategory::Io => "io_failure",
            FailureCategory::CorruptArchive => "corrupt_archive",
            FailureCategory::ScannerFailure => "scanner_failure",
            FailureCategory::ScannerTimeout => "scanner_timeout",
            FailureCategory::MalformedReport => "malformed_report",
            FailureCategory::MissingReportArtifact => "missing_report_artifact",
            FailureCategory::Cancelled => "cancelled",
            FailureCategory::InvalidTransition => "invalid_transition",
            FailureCategory::Persistence => "persistence",
            FailureCategory::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Errors produced by the scan pipeline.
///
/// `Display` carries the full diagnostic for logs. Use [`ScanError::user_message`]
/// for text that is shown to end users.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O failure while {operation}: {path}\nDetails: {details}")]
    IoFailure {
        operation: String,
        path: PathBuf,
        details: String,
    },

    #[error("Source archive could not be extracted\nDetails: {details}")]
    CorruptArchive { details: String },

    #[error("Scanner exited with {}\nstdout: {stdout}\nstderr: {stderr}", describe_exit(*exit_code))]
    ScannerFailure {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Scanner did not finish within {}s and was terminated", timeout.as_secs())]
    ScannerTimeout { timeout: Duration },

    #[error("Failed to parse scanner report: {path}\nDetails: {details}")]
    MalformedReport { path: PathBuf, details: String },

    #[error("Expected report artifact is missing: {path}")]
    MissingReportArtifact { path: PathBuf },

    #[error("Scan was cancelled")]
    Cancelled,

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Scan record persistence failed\nDetails: {details}")]
    Persistence { details: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ScanError {
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        ScanError::IoFailure {
            operation: operation.into(),
            path: path.into(),
            details: err.to_string(),
        }
    }

    pub fn persistence(err: impl fmt::Display) -> Self {
        ScanError::Persistence {
            details: err.to_string(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            ScanError::IoFailure { .. } => FailureCategory::Io,
            ScanError::CorruptArchive { .. } => FailureCategory::CorruptArchive,
            ScanError::ScannerFailure { .. } => FailureCategory::ScannerFailure,
            ScanError::ScannerTimeout { .. } => FailureCategory::ScannerTimeout,
            ScanError::MalformedReport { .. } => FailureCategory::MalformedReport,
            ScanError::MissingReportArtifact { .. } => FailureCategory::MissingReportArtifact,
            ScanError::Cancelled => FailureCategory::Cancelled,
            ScanError::InvalidTransition { .. } => FailureCategory::InvalidTransition,
            ScanError::Persistence { .. } => FailureCategory::Persistence,
            ScanError::Validation { .. } => FailureCategory::Validation,
        }
    }

    /// Display-safe description: distinguishes the failure category without
    /// leaking paths, captured scanner output or internal details.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::IoFailure { .. } => "a storage error occurred while processing the scan".to_string(),
            ScanError::CorruptArchive { .. } => "source archive could not be extracted".to_string(),
            ScanError::ScannerFailure { exit_code, .. } => match exit_code {
                Some(code) => format!("scanner reported nonzero exit ({})", code),
                None => "scanner was terminated before reporting an exit status".to_string(),
            },
            ScanError::ScannerTimeout { timeout } => {
                format!("scanner exceeded the {}s time limit", timeout.as_secs())
            }
            ScanError::MalformedReport { .. } => "scanner report could not be parsed".to_string(),
            ScanError::MissingReportArtifact { .. } => {
                "scanner finished but produced no report".to_string()
            }
            ScanError::Cancelled => "scan was cancelled".to_string(),
            ScanError::InvalidTransition { .. } => {
                "scan status changed unexpectedly".to_string()
            }
            ScanError::Persistence { .. } => "scan record could not be saved".to_string(),
            ScanError::Validation { message } => format!("invalid request: {}", message),
        }
    }
}

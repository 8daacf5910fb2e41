use crate::shared::error::ScanError;
use crate::shared::security::validate_argument_value;
use crate::shared::PipelineResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Maximum length for project identifiers passed to the scanner
const MAX_PROJECT_ID_LENGTH: usize = 128;

/// Validated project identifier
///
/// Restricted to `[A-Za-z0-9._-]` so it cannot be read as an option or carry
/// shell metacharacters even if an adapter misbehaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> PipelineResult<Self> {
        let id = id.into();
        validate_argument_value("project identifier", &id)?;

        if id.len() > MAX_PROJECT_ID_LENGTH {
            return Err(ScanError::Validation {
                message: format!(
                    "project identifier is too long ({} bytes); maximum allowed: {} bytes",
                    id.len(),
                    MAX_PROJECT_ID_LENGTH
                ),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(ScanError::Validation {
                message: "project identifier contains invalid characters; only alphanumeric, dots, hyphens and underscores are allowed".to_string(),
            });
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Allow-listed options for one scanner run
///
/// The only way to build an invocation is [`ScanInvocation::new`], which
/// validates every value. Output format, offline mode and the
/// archive-assembly switch are fixed by the adapter and cannot be set here.
#[derive(Debug, Clone)]
pub struct ScanInvocation {
    project_id: ProjectId,
    source_root: PathBuf,
    output_dir: PathBuf,
    data_dir: PathBuf,
    timeout: Duration,
}

impl ScanInvocation {
    pub fn new(
        project_id: ProjectId,
        source_root: PathBuf,
        output_dir: PathBuf,
        data_dir: PathBuf,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        validate_absolute("scan path", &source_root)?;
        validate_absolute("output directory", &output_dir)?;
        validate_absolute("vulnerability data directory", &data_dir)?;

        if timeout.is_zero() {
            return Err(ScanError::Validation {
                message: "scanner timeout must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            project_id,
            source_root,
            output_dir,
            data_dir,
            timeout,
        })
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn validate_absolute(name: &str, path: &Path) -> PipelineResult<()> {
    let text = path.to_string_lossy();
    validate_argument_value(name, &text)?;
    if !path.is_absolute() {
        return Err(ScanError::Validation {
            message: format!("{} must be an absolute path: {}", name, path.display()),
        });
    }
    Ok(())
}

/// Captured outcome of a successful scanner run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// VulnerabilityScanner port for the external scanning tool
///
/// The call may block for minutes. It runs on the scan's own task and must
/// honor both the invocation timeout and the cancellation token by
/// terminating the subprocess, not just abandoning the wait.
#[async_trait]
pub trait VulnerabilityScanner: Send + Sync {
    /// Runs the scanner once; never retries
    ///
    /// # Errors
    /// - `ScannerFailure` for a nonzero exit, carrying captured output
    /// - `ScannerTimeout` if the timeout elapsed and the process was killed
    /// - `Cancelled` if the token fired and the process was killed
    /// - `IoFailure` if the process could not be started
    async fn run(
        &self,
        invocation: &ScanInvocation,
        cancel: &CancellationToken,
    ) -> PipelineResult<ScanResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation_with(source_root: &str) -> PipelineResult<ScanInvocation> {
        ScanInvocation::new(
            ProjectId::new("scan-1").unwrap(),
            PathBuf::from(source_root),
            PathBuf::from("/srv/uploads/scan-1/depcheck-report"),
            PathBuf::from("/opt/dc-data"),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_project_id_accepts_uuid() {
        let id = ProjectId::new("0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de").unwrap();
        assert_eq!(id.as_str(), "0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de");
    }

    #[test]
    fn test_project_id_rejects_option_injection() {
        assert!(ProjectId::new("--enableExperimental").is_err());
        assert!(ProjectId::new("x; rm -rf /").is_err());
        assert!(ProjectId::new("a b").is_err());
        assert!(ProjectId::new("").is_err());
        assert!(ProjectId::new("a".repeat(129)).is_err());
    }

    #[test]
    fn test_invocation_requires_absolute_paths() {
        assert!(invocation_with("/srv/uploads/scan-1/source").is_ok());
        let err = invocation_with("relative/source").unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn test_invocation_rejects_zero_timeout() {
        let result = ScanInvocation::new(
            ProjectId::new("scan-1").unwrap(),
            PathBuf::from("/src"),
            PathBuf::from("/out"),
            PathBuf::from("/data"),
            Duration::ZERO,
        );
        assert!(result.is_err());
    }
}

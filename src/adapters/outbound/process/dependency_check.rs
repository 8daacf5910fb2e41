use crate::ports::outbound::{ScanInvocation, ScanResult, VulnerabilityScanner};
use crate::scan_pipeline::services::PathNormalizer;
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Upper bound on captured stdout/stderr per stream (64 KB)
const MAX_CAPTURED_OUTPUT: usize = 64 * 1024;

/// DependencyCheckScanner adapter driving the OWASP dependency-check CLI
///
/// The command line is assembled from a [`ScanInvocation`] only; no shell
/// is involved, so paths and identifiers reach the tool as single argv
/// entries. The scanner runs offline (`--noupdate`) against a pre-populated
/// data directory.
pub struct DependencyCheckScanner {
    program: PathBuf,
    launcher_args: Vec<OsString>,
    normalizer: PathNormalizer,
}

impl DependencyCheckScanner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            launcher_args: Vec::new(),
            normalizer: PathNormalizer::default(),
        }
    }

    /// Arguments placed before the scanner options, for installations that
    /// start the tool through an interpreter (e.g. `sh dependency-check.sh`)
    pub fn with_launcher_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the scanner argument vector for an invocation
    pub fn arguments(&self, invocation: &ScanInvocation) -> Vec<OsString> {
        let scan_path = self
            .normalizer
            .normalize(&invocation.source_root().to_string_lossy());

        let mut args = self.launcher_args.clone();
        args.extend(
            [
                "--project",
                invocation.project_id().as_str(),
                "--scan",
                scan_path.as_str(),
                "--format",
                "ALL",
            ]
            .map(OsString::from),
        );
        args.push("--out".into());
        args.push(invocation.output_dir().as_os_str().to_owned());
        args.push("--noupdate".into());
        args.push("--disableAssembly".into());
        args.push("--data".into());
        args.push(invocation.data_dir().as_os_str().to_owned());
        args
    }

    fn spawn(&self, invocation: &ScanInvocation) -> PipelineResult<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a kill reaches the JVM the wrapper launches
        #[cfg(unix)]
        command.process_group(0);

        command
            .spawn()
            .map_err(|e| ScanError::io("starting scanner", &self.program, e))
    }
}

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

enum Completion {
    Exited(std::io::Result<Finished>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl VulnerabilityScanner for DependencyCheckScanner {
    async fn run(
        &self,
        invocation: &ScanInvocation,
        cancel: &CancellationToken,
    ) -> PipelineResult<ScanResult> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let deadline = tokio::time::Instant::now() + invocation.timeout();
        let mut child = self.spawn(invocation)?;
        let pid = child.id();
        tracing::info!(
            project = invocation.project_id().as_str(),
            pid = pid.unwrap_or_default(),
            timeout_secs = invocation.timeout().as_secs(),
            "Scanner started"
        );

        let stdout = child.stdout.take().map(capture);
        let stderr = child.stderr.take().map(capture);
        let readers: Vec<AbortHandle> = stdout
            .iter()
            .chain(stderr.iter())
            .map(JoinHandle::abort_handle)
            .collect();

        // The deadline and the token also cover draining the pipes
        let completion = tokio::select! {
            finished = finish(&mut child, pid, stdout, stderr) => Completion::Exited(finished),
            _ = tokio::time::sleep_until(deadline) => Completion::TimedOut,
            _ = cancel.cancelled() => Completion::Cancelled,
        };

        let Finished {
            status,
            stdout,
            stderr,
        } = match completion {
            Completion::Exited(finished) => {
                finished.map_err(|e| ScanError::io("waiting for scanner", &self.program, e))?
            }
            Completion::TimedOut => {
                terminate(&mut child, pid, &readers).await;
                tracing::warn!(
                    project = invocation.project_id().as_str(),
                    "Scanner exceeded its timeout and was killed"
                );
                return Err(ScanError::ScannerTimeout {
                    timeout: invocation.timeout(),
                });
            }
            Completion::Cancelled => {
                terminate(&mut child, pid, &readers).await;
                tracing::info!(
                    project = invocation.project_id().as_str(),
                    "Scanner killed after cancellation"
                );
                return Err(ScanError::Cancelled);
            }
        };

        match status.code() {
            Some(0) => Ok(ScanResult {
                exit_code: 0,
                stdout,
                stderr,
            }),
            exit_code => Err(ScanError::ScannerFailure {
                exit_code,
                stdout,
                stderr,
            }),
        }
    }
}

/// Waits for the scanner to exit, clears out its process group, then
/// drains both pipes
///
/// Anything the scanner left running in its group would otherwise hold the
/// inherited pipes open past the exit.
async fn finish(
    child: &mut Child,
    pid: Option<u32>,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
) -> std::io::Result<Finished> {
    let status = child.wait().await?;
    if let Some(pid) = pid {
        kill_process_group(pid);
    }
    let (stdout, stderr) = tokio::join!(collect(stdout), collect(stderr));
    Ok(Finished {
        status,
        stdout,
        stderr,
    })
}

/// Kills the scanner and everything in its process group, reaps it and
/// stops reading its pipes
async fn terminate(child: &mut Child, pid: Option<u32>, readers: &[AbortHandle]) {
    if let Some(pid) = pid {
        kill_process_group(pid);
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Scanner already exited before kill");
    }
    for reader in readers {
        reader.abort();
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    if let Ok(pid) = i32::try_from(pid) {
        // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
        // addresses the process group created at spawn.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Drains a pipe to the end, keeping at most [`MAX_CAPTURED_OUTPUT`] bytes
///
/// The pipe keeps being read past the limit so the child never blocks on
/// a full buffer.
fn capture<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut kept = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let room = MAX_CAPTURED_OUTPUT.saturating_sub(kept.len());
                    kept.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
        String::from_utf8_lossy(&kept).into_owned()
    })
}

async fn collect(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

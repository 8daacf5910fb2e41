use crate::scan_pipeline::domain::{ArtifactKind, ArtifactLayout, DeleteOutcome, ScanId};
use crate::shared::PipelineResult;
use std::path::{Path, PathBuf};

/// ArtifactStore port for the on-disk life of a scan's files
///
/// The store is the only component that builds artifact paths. Callers
/// obtain them through [`ArtifactStore::layout`].
///
/// Implementations are called from blocking worker threads and must be
/// `Send + Sync`; every scan works inside its own subtree, so no cross-scan
/// locking is required.
pub trait ArtifactStore: Send + Sync {
    /// Returns the deterministic layout for a scan
    fn layout(&self, scan_id: &ScanId) -> ArtifactLayout;

    /// Creates the scan's isolated directory and writes the archive into it
    ///
    /// # Arguments
    /// * `scan_id` - Scan owning the directory
    /// * `archive` - Raw archive bytes
    /// * `filename` - User-supplied filename; sanitized before use
    ///
    /// # Returns
    /// Path of the written archive
    ///
    /// # Errors
    /// - `CorruptArchive` if the archive is empty or over the size limit
    /// - `IoFailure` on any write error (disk full, permissions)
    fn stage(&self, scan_id: &ScanId, archive: &[u8], filename: &str) -> PipelineResult<PathBuf>;

    /// Unpacks an archive into `dest_dir`
    ///
    /// # Errors
    /// - `CorruptArchive` if the archive cannot be parsed or an entry would
    ///   escape `dest_dir`
    /// - `IoFailure` on write errors
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> PipelineResult<()>;

    /// Atomically relocates an intermediate report directory to the scan's
    /// permanent report location
    ///
    /// Readers see either no report directory or the complete one.
    fn finalize(&self, intermediate_report_dir: &Path, scan_id: &ScanId) -> PipelineResult<PathBuf>;

    /// Removes one artifact tree of a scan; deleting an absent tree is
    /// `NothingToDelete`, not an error
    fn delete(&self, scan_id: &ScanId, kind: ArtifactKind) -> PipelineResult<DeleteOutcome>;
}

use super::archive::extract_zip;
use crate::ports::outbound::ArtifactStore;
use crate::scan_pipeline::domain::{ArtifactKind, ArtifactLayout, DeleteOutcome, ScanId};
use crate::shared::error::ScanError;
use crate::shared::security::{
    sanitize_filename, validate_archive_size, validate_not_symlink, DEFAULT_MAX_ARCHIVE_SIZE,
};
use crate::shared::PipelineResult;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// FileSystemArtifactStore adapter keeping scan artifacts on local disk
///
/// Uploads live under `upload_root/<scan_id>/`, permanent reports under
/// `report_root/`. Both roots are made absolute at construction so every
/// path handed to the scanner is absolute.
pub struct FileSystemArtifactStore {
    upload_root: PathBuf,
    report_root: PathBuf,
    max_archive_bytes: u64,
}

impl FileSystemArtifactStore {
    pub fn new(upload_root: impl AsRef<Path>, report_root: impl AsRef<Path>) -> PipelineResult<Self> {
        Ok(Self {
            upload_root: absolute(upload_root.as_ref())?,
            report_root: absolute(report_root.as_ref())?,
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_SIZE,
        })
    }

    pub fn with_max_archive_bytes(mut self, max_archive_bytes: u64) -> Self {
        self.max_archive_bytes = max_archive_bytes;
        self
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn report_root(&self) -> &Path {
        &self.report_root
    }

    /// Creates both storage roots if they do not exist yet
    pub fn ensure_roots(&self) -> PipelineResult<()> {
        for root in [&self.upload_root, &self.report_root] {
            fs::create_dir_all(root)
                .map_err(|e| ScanError::io("creating storage root", root, e))?;
        }
        Ok(())
    }

    /// Fallback relocation for when `rename` is impossible (e.g. across
    /// filesystems): copy into a hidden staging sibling, then rename the
    /// staging directory into place so readers never see a partial tree.
    fn relocate_by_copy(&self, source: &Path, destination: &Path) -> PipelineResult<()> {
        let staging = destination.with_file_name(format!(
            ".{}.partial",
            destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|e| ScanError::io("clearing stale staging directory", &staging, e))?;
        }

        if let Err(e) = copy_tree(source, &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        fs::rename(&staging, destination).map_err(|e| {
            let _ = fs::remove_dir_all(&staging);
            ScanError::io("publishing report directory", destination, e)
        })?;

        if let Err(e) = fs::remove_dir_all(source) {
            tracing::warn!(
                path = %source.display(),
                error = %e,
                "Report relocated but intermediate directory could not be removed"
            );
        }
        Ok(())
    }
}

impl ArtifactStore for FileSystemArtifactStore {
    fn layout(&self, scan_id: &ScanId) -> ArtifactLayout {
        ArtifactLayout::new(&self.upload_root, &self.report_root, scan_id)
    }

    fn stage(&self, scan_id: &ScanId, archive: &[u8], filename: &str) -> PipelineResult<PathBuf> {
        validate_archive_size(archive.len() as u64, self.max_archive_bytes)?;

        let layout = self.layout(scan_id);
        let scan_dir = layout.upload_dir();
        fs::create_dir_all(scan_dir)
            .map_err(|e| ScanError::io("creating scan directory", scan_dir, e))?;

        let mut archive_path = scan_dir.join(sanitize_filename(filename));
        if archive_path == layout.extraction_dir() || archive_path == layout.intermediate_report_dir()
        {
            archive_path = scan_dir.join(format!("upload-{}", sanitize_filename(filename)));
        }

        // Write to a temp file in the same directory, then persist: the
        // archive is either fully present or absent.
        let mut temp = NamedTempFile::new_in(scan_dir)
            .map_err(|e| ScanError::io("creating staging file", scan_dir, e))?;
        temp.write_all(archive)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| ScanError::io("writing archive", &archive_path, e))?;
        temp.persist(&archive_path)
            .map_err(|e| ScanError::io("persisting archive", &archive_path, e.error))?;

        tracing::debug!(
            scan_id = %scan_id,
            bytes = archive.len(),
            path = %archive_path.display(),
            "Archive staged"
        );
        Ok(archive_path)
    }

    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> PipelineResult<()> {
        let count = extract_zip(archive_path, dest_dir)?;
        tracing::debug!(
            dest = %dest_dir.display(),
            files = count,
            "Archive extracted"
        );
        Ok(())
    }

    fn finalize(&self, intermediate_report_dir: &Path, scan_id: &ScanId) -> PipelineResult<PathBuf> {
        let layout = self.layout(scan_id);
        let destination = layout.final_report_dir().to_path_buf();

        if !intermediate_report_dir.is_dir() {
            return Err(ScanError::MissingReportArtifact {
                path: intermediate_report_dir.to_path_buf(),
            });
        }
        if destination.exists() {
            return Err(ScanError::IoFailure {
                operation: "relocating report directory".to_string(),
                path: destination,
                details: "destination already exists".to_string(),
            });
        }

        fs::create_dir_all(&self.report_root)
            .map_err(|e| ScanError::io("creating report root", &self.report_root, e))?;

        match fs::rename(intermediate_report_dir, &destination) {
            Ok(()) => {}
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    "Rename failed, relocating report directory by copy"
                );
                self.relocate_by_copy(intermediate_report_dir, &destination)?;
            }
        }

        Ok(destination)
    }

    fn delete(&self, scan_id: &ScanId, kind: ArtifactKind) -> PipelineResult<DeleteOutcome> {
        let layout = self.layout(scan_id);
        let removed = match kind {
            ArtifactKind::Source => remove_path(layout.upload_dir())?,
            ArtifactKind::Reports => {
                let pdf = remove_path(layout.pdf_path())?;
                let reports = remove_path(layout.final_report_dir())?;
                pdf || reports
            }
        };

        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NothingToDelete
        })
    }
}

fn absolute(path: &Path) -> PipelineResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| ScanError::io("resolving working directory", path, e))?;
    Ok(cwd.join(path))
}

/// Removes a file or directory tree; `Ok(false)` when nothing was there
fn remove_path(path: &Path) -> PipelineResult<bool> {
    validate_not_symlink(path, "delete")?;

    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(ScanError::io("inspecting artifact", path, e)),
    };

    match result {
        Ok(()) => Ok(true),
        // Raced with another deletion of the same path
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ScanError::io("deleting artifact", path, e)),
    }
}

fn copy_tree(source: &Path, destination: &Path) -> PipelineResult<()> {
    fs::create_dir_all(destination)
        .map_err(|e| ScanError::io("creating directory", destination, e))?;

    let entries =
        fs::read_dir(source).map_err(|e| ScanError::io("reading directory", source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ScanError::io("reading directory", source, e))?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| ScanError::io("inspecting file", &from, e))?;

        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to).map_err(|e| ScanError::io("copying file", &from, e))?;
        }
    }
    Ok(())
}

use crate::shared::error::ScanError;
use crate::shared::security::{MAX_EXTRACTED_ENTRY_SIZE, MAX_EXTRACTED_TOTAL_SIZE};
use crate::shared::PipelineResult;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Byte caps applied while unpacking, counted on the decompressed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtractionLimits {
    pub entry_bytes: u64,
    pub total_bytes: u64,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            entry_bytes: MAX_EXTRACTED_ENTRY_SIZE,
            total_bytes: MAX_EXTRACTED_TOTAL_SIZE,
        }
    }
}

/// Unpacks a zip archive into `dest_dir`
///
/// # Security
/// Any entry whose name is absolute, contains `..`, or otherwise resolves
/// outside `dest_dir` rejects the whole archive. Entries are always written
/// as regular files, so symlink entries cannot plant links in the tree.
/// Sizes are enforced on the bytes actually written, not the sizes the
/// entry headers declare.
pub(crate) fn extract_zip(archive_path: &Path, dest_dir: &Path) -> PipelineResult<usize> {
    extract_zip_with_limits(archive_path, dest_dir, ExtractionLimits::default())
}

pub(crate) fn extract_zip_with_limits(
    archive_path: &Path,
    dest_dir: &Path,
    limits: ExtractionLimits,
) -> PipelineResult<usize> {
    let file = fs::File::open(archive_path)
        .map_err(|e| ScanError::io("opening archive", archive_path, e))?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| ScanError::CorruptArchive {
        details: e.to_string(),
    })?;

    fs::create_dir_all(dest_dir)
        .map_err(|e| ScanError::io("creating extraction directory", dest_dir, e))?;

    tracing::debug!(
        archive = %archive_path.display(),
        entries = archive.len(),
        "Extracting archive"
    );

    let mut extracted = 0;
    let mut written_total = 0u64;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| ScanError::CorruptArchive {
            details: format!("entry {}: {}", index, e),
        })?;

        let relative = enclosed_path(entry.name())?;
        let out_path = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| ScanError::io("creating directory", &out_path, e))?;
            continue;
        }

        if entry.size() > limits.entry_bytes {
            return Err(ScanError::CorruptArchive {
                details: format!(
                    "entry {} is too large ({} bytes); maximum allowed size is {} bytes",
                    entry.name(),
                    entry.size(),
                    limits.entry_bytes
                ),
            });
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ScanError::io("creating directory", parent, e))?;
        }

        let mut out_file = fs::File::create(&out_path)
            .map_err(|e| ScanError::io("creating extracted file", &out_path, e))?;
        let remaining = limits.total_bytes.saturating_sub(written_total);
        let cap = limits.entry_bytes.min(remaining);
        let written = copy_bounded(&mut entry, &mut out_file, cap)
            .map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => ScanError::CorruptArchive {
                    details: format!("entry {}: {}", relative.display(), e),
                },
                _ => ScanError::io("writing extracted file", &out_path, e),
            })?
            .ok_or_else(|| ScanError::CorruptArchive {
                details: if cap < limits.entry_bytes {
                    format!(
                        "archive expands past the {} byte extraction limit at entry {}",
                        limits.total_bytes,
                        relative.display()
                    )
                } else {
                    format!(
                        "entry {} expands past the {} byte entry limit",
                        relative.display(),
                        limits.entry_bytes
                    )
                },
            })?;
        written_total += written;
        extracted += 1;
    }

    Ok(extracted)
}

/// Copies at most `limit` bytes, returning `None` if the reader had more
fn copy_bounded<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    limit: u64,
) -> io::Result<Option<u64>> {
    let copied = io::copy(&mut reader.take(limit.saturating_add(1)), writer)?;
    Ok((copied <= limit).then_some(copied))
}

/// Turns an entry name into a path guaranteed to stay below the extraction
/// root, or rejects it
fn enclosed_path(name: &str) -> PipelineResult<PathBuf> {
    let unified = name.replace('\\', "/");
    let escape = || ScanError::CorruptArchive {
        details: format!("entry '{}' would escape the extraction directory", name),
    };

    if unified.starts_with('/') || unified.contains('\0') {
        return Err(escape());
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escape());
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ScanError::CorruptArchive {
            details: format!("entry '{}' has an empty name", name),
        });
    }

    Ok(relative)
}

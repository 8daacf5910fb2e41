use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use std::fs;
use std::path::Path;

/// Default upper bound for an uploaded archive (512 MB)
pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 512 * 1024 * 1024;

/// Upper bound for a single extracted archive entry (1 GB)
/// Guards against zip bombs that declare huge uncompressed sizes
pub const MAX_EXTRACTED_ENTRY_SIZE: u64 = 1024 * 1024 * 1024;

/// Upper bound for all entries of one archive together (4 GB)
pub const MAX_EXTRACTED_TOTAL_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Maximum length of a sanitized upload filename
const MAX_FILENAME_LENGTH: usize = 128;

/// Name used when an uploaded filename sanitizes to nothing
const FALLBACK_FILENAME: &str = "upload.zip";

/// Reduces a user-supplied filename to a single safe path component
///
/// # Security
/// Upload filenames are kept for display, but the on-disk name must never be
/// able to address anything outside the scan's own directory. Directory parts
/// are dropped and every character outside `[A-Za-z0-9._-]` becomes `_`.
/// Leading dots are stripped so the result can never be `.`, `..` or hidden.
pub fn sanitize_filename(filename: &str) -> String {
    let last_component = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = last_component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return FALLBACK_FILENAME.to_string();
    }

    trimmed.chars().take(MAX_FILENAME_LENGTH).collect()
}

/// Validates that a path is not a symbolic link
///
/// # Security
/// Uses `symlink_metadata()` so the link itself is inspected, not its target.
/// A missing path is not an error here; callers decide what absence means.
pub fn validate_not_symlink(path: &Path, operation: &str) -> PipelineResult<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_symlink() => Err(ScanError::Validation {
            message: format!(
                "Security: {} is a symbolic link; {} operations on symbolic links are not allowed",
                path.display(),
                operation
            ),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ScanError::io(operation, path, e)),
    }
}

/// Validates archive size is within acceptable limits
pub fn validate_archive_size(size: u64, max_size: u64) -> PipelineResult<()> {
    if size == 0 {
        return Err(ScanError::CorruptArchive {
            details: "archive is empty".to_string(),
        });
    }
    if size > max_size {
        return Err(ScanError::CorruptArchive {
            details: format!(
                "archive is too large ({} bytes); maximum allowed size is {} bytes",
                size, max_size
            ),
        });
    }
    Ok(())
}

/// Validates a value that will be passed to a subprocess as a single argument
///
/// # Security
/// Values are never joined into a shell line, but a value starting with `-`
/// could still be read as an option by the scanner's own argument parser.
pub fn validate_argument_value(name: &str, value: &str) -> PipelineResult<()> {
    if value.is_empty() {
        return Err(ScanError::Validation {
            message: format!("{} must not be empty", name),
        });
    }
    if value.starts_with('-') {
        return Err(ScanError::Validation {
            message: format!("{} must not start with '-'", name),
        });
    }
    if value.contains('\0') {
        return Err(ScanError::Validation {
            message: format!("{} must not contain NUL characters", name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename_keeps_simple_names() {
        assert_eq!(sanitize_filename("project.zip"), "project.zip");
        assert_eq!(sanitize_filename("my-app_v1.2.zip"), "my-app_v1.2.zip");
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\src.zip"), "src.zip");
        assert_eq!(sanitize_filename("/abs/path/app.zip"), "app.zip");
    }

    #[test]
    fn test_sanitize_filename_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my app;rm -rf.zip"), "my_app_rm_-rf.zip");
        assert_eq!(sanitize_filename("$(whoami).zip"), "__whoami_.zip");
    }

    #[test]
    fn test_sanitize_filename_falls_back_when_empty() {
        assert_eq!(sanitize_filename(""), "upload.zip");
        assert_eq!(sanitize_filename(".."), "upload.zip");
        assert_eq!(sanitize_filename("dir/"), "upload.zip");
        assert_eq!(sanitize_filename("???"), "upload.zip");
    }

    #[test]
    fn test_sanitize_filename_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.zip"), "hidden.zip");
    }

    #[test]
    fn test_sanitize_filename_length_limit() {
        let long_name = format!("{}.zip", "a".repeat(500));
        assert_eq!(sanitize_filename(&long_name).len(), 128);
    }

    #[test]
    fn test_validate_not_symlink_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("archive.zip");
        fs::write(&file_path, "data").unwrap();

        assert!(validate_not_symlink(&file_path, "delete").is_ok());
    }

    #[test]
    fn test_validate_not_symlink_missing_path_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(validate_not_symlink(&temp_dir.path().join("absent"), "delete").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_not_symlink_rejects_link() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let result = validate_not_symlink(&link, "delete");
        assert!(result.unwrap_err().to_string().contains("symbolic link"));
    }

    #[test]
    fn test_validate_archive_size() {
        assert!(validate_archive_size(1000, DEFAULT_MAX_ARCHIVE_SIZE).is_ok());
        assert!(validate_archive_size(0, DEFAULT_MAX_ARCHIVE_SIZE).is_err());

        let err = validate_archive_size(DEFAULT_MAX_ARCHIVE_SIZE + 1, DEFAULT_MAX_ARCHIVE_SIZE)
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_validate_argument_value() {
        assert!(validate_argument_value("project", "3f1c-scan").is_ok());
        assert!(validate_argument_value("project", "--dbDriverPath=/tmp/x").is_err());
        assert!(validate_argument_value("project", "").is_err());
        assert!(validate_argument_value("project", "a\0b").is_err());
    }
}

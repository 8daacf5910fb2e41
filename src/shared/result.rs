use super::error::ScanError;

/// Type alias for Result with anyhow::Error as the error type.
/// Used by configuration, bootstrap and CLI code.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Result of a pipeline operation, carrying a typed [`ScanError`].
pub type PipelineResult<T> = std::result::Result<T, ScanError>;

/// Shared kernel - error taxonomy, result aliases and security helpers
pub mod error;
pub mod result;
pub mod security;

pub use error::{ExitCode, FailureCategory, ScanError};
pub use result::{PipelineResult, Result};

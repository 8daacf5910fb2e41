use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::shared::error::ScanError;
use std::fmt;
use std::str::FromStr;

/// Kind of action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Scan,
    ScanFailed,
    ReportDownload,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Scan => "scan",
            AuditAction::ScanFailed => "scan_failed",
            AuditAction::ReportDownload => "report_download",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(AuditAction::Scan),
            "scan_failed" => Ok(AuditAction::ScanFailed),
            "report_download" => Ok(AuditAction::ReportDownload),
            "delete" => Ok(AuditAction::Delete),
            other => Err(ScanError::Persistence {
                details: format!("unknown audit action '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub event: String,
    pub principal: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event: impl Into<String>, principal: impl Into<String>, action: AuditAction) -> Self {
        Self {
            event: event.into(),
            principal: principal.into(),
            action,
            timestamp: Utc::now(),
        }
    }
}

use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length for owner names (security limit)
const MAX_OWNER_LENGTH: usize = 255;

/// Version of the persisted status string encoding.
///
/// Bump this whenever the strings returned by [`ScanStatus::as_str`] change,
/// so stored rows written by an older build are detected rather than misread.
pub const STATUS_ENCODING_VERSION: i64 = 1;

/// Opaque, generated scan identifier
///
/// Wraps a UUID so identifiers arriving from callers (deletion, report lookup)
/// are validated before they are ever joined into a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ScanId {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ScanError::Validation {
                message: format!("'{}' is not a valid scan identifier", s),
            })
    }
}

/// Lifecycle status of a scan
///
/// ```text
/// uploading -> extracting -> scanning -> report_generating -> completed
///     \            \             \               \
///      `------------`-------------`---------------`---------> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Uploading,
    Extracting,
    Scanning,
    ReportGenerating,
    Completed,
    Failed,
}

impl ScanStatus {
    /// The happy path, in order.
    pub const PIPELINE: [ScanStatus; 5] = [
        ScanStatus::Uploading,
        ScanStatus::Extracting,
        ScanStatus::Scanning,
        ScanStatus::ReportGenerating,
        ScanStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Uploading => "uploading",
            ScanStatus::Extracting => "extracting",
            ScanStatus::Scanning => "scanning",
            ScanStatus::ReportGenerating => "report_generating",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// The next status on the happy path, `None` for terminal states.
    pub fn next(&self) -> Option<ScanStatus> {
        match self {
            ScanStatus::Uploading => Some(ScanStatus::Extracting),
            ScanStatus::Extracting => Some(ScanStatus::Scanning),
            ScanStatus::Scanning => Some(ScanStatus::ReportGenerating),
            ScanStatus::ReportGenerating => Some(ScanStatus::Completed),
            ScanStatus::Completed | ScanStatus::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: ScanStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == ScanStatus::Failed || self.next() == Some(to)
    }

    /// Validates a transition, returning the new status
    pub fn advance(self, to: ScanStatus) -> PipelineResult<ScanStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(ScanError::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Decodes a persisted status, checking the encoding version
    pub fn decode(value: &str, encoding_version: i64) -> PipelineResult<ScanStatus> {
        if encoding_version != STATUS_ENCODING_VERSION {
            return Err(ScanError::Persistence {
                details: format!(
                    "unsupported status encoding version {} (expected {})",
                    encoding_version, STATUS_ENCODING_VERSION
                ),
            });
        }
        value.parse()
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(ScanStatus::Uploading),
            "extracting" => Ok(ScanStatus::Extracting),
            "scanning" => Ok(ScanStatus::Scanning),
            "report_generating" => Ok(ScanStatus::ReportGenerating),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(ScanError::Persistence {
                details: format!("unknown scan status '{}'", other),
            }),
        }
    }
}

/// Scan record: one unit of orchestration work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scan {
    id: ScanId,
    owner: String,
    filename: String,
    compliance: bool,
    report_path: Option<PathBuf>,
    status: ScanStatus,
    created_at: DateTime<Utc>,
}

impl Scan {
    /// Creates a new scan in the `uploading` status
    pub fn new(owner: String, filename: String, compliance: bool) -> PipelineResult<Self> {
        Ok(Self {
            id: ScanId::generate(),
            owner: validate_owner(owner)?,
            filename,
            compliance,
            report_path: None,
            status: ScanStatus::Uploading,
            // Stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        })
    }

    /// Rebuilds a scan from persisted fields
    pub fn restore(
        id: ScanId,
        owner: String,
        filename: String,
        compliance: bool,
        report_path: Option<PathBuf>,
        status: ScanStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            filename,
            compliance,
            report_path,
            status,
            created_at,
        }
    }

    pub fn id(&self) -> &ScanId {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Original archive filename, for display only
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn compliance(&self) -> bool {
        self.compliance
    }

    pub fn report_path(&self) -> Option<&PathBuf> {
        self.report_path.as_ref()
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transition_to(&mut self, to: ScanStatus) -> PipelineResult<()> {
        self.status = self.status.advance(to)?;
        Ok(())
    }

    /// Moves `report_generating -> completed` and records the report path
    pub fn complete(&mut self, report_path: PathBuf) -> PipelineResult<()> {
        self.status = self.status.advance(ScanStatus::Completed)?;
        self.report_path = Some(report_path);
        Ok(())
    }
}

fn validate_owner(owner: String) -> PipelineResult<String> {
    let trimmed = owner.trim();
    if trimmed.is_empty() {
        return Err(ScanError::Validation {
            message: "owner name cannot be empty".to_string(),
        });
    }
    if trimmed.len() > MAX_OWNER_LENGTH {
        return Err(ScanError::Validation {
            message: format!(
                "owner name is too long ({} bytes); maximum allowed: {} bytes",
                trimmed.len(),
                MAX_OWNER_LENGTH
            ),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_round_trips_through_display() {
        let id = ScanId::generate();
        let parsed: ScanId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_scan_id_rejects_path_like_input() {
        assert!("../../etc".parse::<ScanId>().is_err());
        assert!("".parse::<ScanId>().is_err());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut status = ScanStatus::Uploading;
        for next in &ScanStatus::PIPELINE[1..] {
            status = status.advance(*next).unwrap();
        }
        assert_eq!(status, ScanStatus::Completed);
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal_state() {
        for status in &ScanStatus::PIPELINE[..4] {
            assert!(status.can_transition_to(ScanStatus::Failed));
        }
    }

    #[test]
    fn test_no_skips_or_reversals() {
        assert!(!ScanStatus::Uploading.can_transition_to(ScanStatus::Scanning));
        assert!(!ScanStatus::Scanning.can_transition_to(ScanStatus::Extracting));
        assert!(!ScanStatus::Extracting.can_transition_to(ScanStatus::Extracting));
        assert!(!ScanStatus::Uploading.can_transition_to(ScanStatus::Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in ScanStatus::PIPELINE {
            assert!(!ScanStatus::Completed.can_transition_to(to));
            assert!(!ScanStatus::Failed.can_transition_to(to));
        }
        assert!(!ScanStatus::Failed.can_transition_to(ScanStatus::Failed));

        let err = ScanStatus::Completed.advance(ScanStatus::Failed).unwrap_err();
        assert!(err.to_string().contains("completed -> failed"));
    }

    #[test]
    fn test_status_string_encoding() {
        for status in ScanStatus::PIPELINE.iter().chain([ScanStatus::Failed].iter()) {
            let decoded = ScanStatus::decode(status.as_str(), STATUS_ENCODING_VERSION).unwrap();
            assert_eq!(decoded, *status);
        }
        assert_eq!(ScanStatus::ReportGenerating.as_str(), "report_generating");
    }

    #[test]
    fn test_status_decode_rejects_unknown_values_and_versions() {
        assert!(ScanStatus::decode("Completed", STATUS_ENCODING_VERSION).is_err());
        assert!(ScanStatus::decode("completed", STATUS_ENCODING_VERSION + 1).is_err());
    }

    #[test]
    fn test_new_scan_starts_uploading() {
        let scan = Scan::new("alice".to_string(), "app.zip".to_string(), true).unwrap();
        assert_eq!(scan.status(), ScanStatus::Uploading);
        assert!(scan.report_path().is_none());
        assert!(scan.compliance());
        assert_eq!(scan.owner(), "alice");
    }

    #[test]
    fn test_new_scan_rejects_empty_owner() {
        assert!(Scan::new("   ".to_string(), "app.zip".to_string(), false).is_err());
    }

    #[test]
    fn test_complete_requires_report_generating() {
        let mut scan = Scan::new("alice".to_string(), "app.zip".to_string(), false).unwrap();
        assert!(scan.complete(PathBuf::from("/r/x.pdf")).is_err());
        assert!(scan.report_path().is_none());

        scan.transition_to(ScanStatus::Extracting).unwrap();
        scan.transition_to(ScanStatus::Scanning).unwrap();
        scan.transition_to(ScanStatus::ReportGenerating).unwrap();
        scan.complete(PathBuf::from("/r/x.pdf")).unwrap();

        assert_eq!(scan.status(), ScanStatus::Completed);
        assert_eq!(scan.report_path(), Some(&PathBuf::from("/r/x.pdf")));
    }
}

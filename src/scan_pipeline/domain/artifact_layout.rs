use super::scan::ScanId;
use std::path::{Path, PathBuf};

/// File name dependency-check uses for its JSON report
pub const SCANNER_REPORT_FILE: &str = "dependency-check-report.json";

const SOURCE_DIR: &str = "source";
const INTERMEDIATE_REPORT_DIR: &str = "depcheck-report";

/// On-disk relationship between a scan identifier and its files
///
/// Only the artifact store builds layouts. Every other component receives
/// paths from a layout instead of joining its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    upload_dir: PathBuf,
    extraction_dir: PathBuf,
    intermediate_report_dir: PathBuf,
    final_report_dir: PathBuf,
    pdf_path: PathBuf,
}

impl ArtifactLayout {
    pub(crate) fn new(upload_root: &Path, report_root: &Path, scan_id: &ScanId) -> Self {
        let upload_dir = upload_root.join(scan_id.to_string());
        Self {
            extraction_dir: upload_dir.join(SOURCE_DIR),
            intermediate_report_dir: upload_dir.join(INTERMEDIATE_REPORT_DIR),
            final_report_dir: report_root.join(format!("{}_depcheck", scan_id)),
            pdf_path: report_root.join(format!("{}.pdf", scan_id)),
            upload_dir,
        }
    }

    /// Directory holding the uploaded archive and everything derived from it
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Root of the extracted source tree handed to the scanner
    pub fn extraction_dir(&self) -> &Path {
        &self.extraction_dir
    }

    /// Scanner output directory, before relocation
    pub fn intermediate_report_dir(&self) -> &Path {
        &self.intermediate_report_dir
    }

    pub fn intermediate_report_file(&self) -> PathBuf {
        self.intermediate_report_dir.join(SCANNER_REPORT_FILE)
    }

    /// Permanent home of the scanner output
    pub fn final_report_dir(&self) -> &Path {
        &self.final_report_dir
    }

    pub fn final_report_file(&self) -> PathBuf {
        self.final_report_dir.join(SCANNER_REPORT_FILE)
    }

    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }
}

/// Which artifact tree of a scan an administrative deletion targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The uploaded archive and its extracted tree
    Source,
    /// The relocated scanner output and the rendered PDF
    Reports,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Source => write!(f, "source"),
            ArtifactKind::Reports => write!(f, "reports"),
        }
    }
}

/// Result of an idempotent deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NothingToDelete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_keyed_by_scan_id() {
        let id: ScanId = "0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de".parse().unwrap();
        let layout = ArtifactLayout::new(Path::new("/srv/uploads"), Path::new("/srv/reports"), &id);

        assert_eq!(
            layout.upload_dir(),
            Path::new("/srv/uploads/0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de")
        );
        assert_eq!(
            layout.extraction_dir(),
            Path::new("/srv/uploads/0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de/source")
        );
        assert_eq!(
            layout.final_report_file(),
            Path::new(
                "/srv/reports/0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de_depcheck/dependency-check-report.json"
            )
        );
        assert_eq!(
            layout.pdf_path(),
            Path::new("/srv/reports/0b7c6f2e-8d8f-4a55-9a4b-2b1a4ce0c1de.pdf")
        );
    }

    #[test]
    fn test_scanner_output_is_outside_scanned_tree() {
        let id = ScanId::generate();
        let layout = ArtifactLayout::new(Path::new("/u"), Path::new("/r"), &id);
        assert!(!layout
            .intermediate_report_dir()
            .starts_with(layout.extraction_dir()));
    }
}

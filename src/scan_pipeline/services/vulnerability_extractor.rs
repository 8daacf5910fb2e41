use super::PathNormalizer;
use crate::scan_pipeline::domain::{Finding, NOT_APPLICABLE, UNKNOWN};
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Upper bound on a finding description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Placeholder for vulnerabilities reported without a description
pub const NO_DESCRIPTION: &str = "No description provided.";

const CVE_PREFIX: &str = "CVE-";

/// VulnerabilityExtractor - turns a dependency-check JSON report into findings
///
/// Only a report that is not structured data at all is an error. Missing
/// optional fields fall back to sentinels, one field at a time.
#[derive(Debug, Clone, Default)]
pub struct VulnerabilityExtractor {
    normalizer: PathNormalizer,
}

impl VulnerabilityExtractor {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self { normalizer }
    }

    /// Reads and extracts a report file
    ///
    /// # Errors
    /// - `MissingReportArtifact` if the file does not exist
    /// - `IoFailure` if it cannot be read
    /// - `MalformedReport` if it is not a parseable report
    pub fn extract_file(&self, report_path: &Path, scan_root: &str) -> PipelineResult<Vec<Finding>> {
        let content = fs::read_to_string(report_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScanError::MissingReportArtifact {
                path: report_path.to_path_buf(),
            },
            _ => ScanError::io("reading scanner report", report_path, e),
        })?;

        self.parse(&content, scan_root).map_err(|e| ScanError::MalformedReport {
            path: report_path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Extracts findings from report text
    pub fn extract(&self, report_json: &str, scan_root: &str) -> PipelineResult<Vec<Finding>> {
        self.parse(report_json, scan_root)
            .map_err(|e| ScanError::MalformedReport {
                path: Default::default(),
                details: e.to_string(),
            })
    }

    fn parse(&self, report_json: &str, scan_root: &str) -> serde_json::Result<Vec<Finding>> {
        let report: DependencyCheckReport = serde_json::from_str(report_json)?;

        let findings = report
            .dependencies
            .iter()
            .flat_map(|dependency| self.findings_for(dependency, scan_root))
            .collect();
        Ok(findings)
    }

    fn findings_for(&self, dependency: &Dependency, scan_root: &str) -> Vec<Finding> {
        if dependency.vulnerabilities.is_empty() {
            return Vec::new();
        }

        let file = dependency
            .file_name
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string());
        let version = resolve_version(dependency);
        let path = match dependency.file_path.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => self.normalizer.relativize(raw, scan_root),
            _ => UNKNOWN.to_string(),
        };

        tracing::debug!(
            file = %file,
            version = %version,
            vulnerabilities = dependency.vulnerabilities.len(),
            "Extracting dependency findings"
        );

        dependency
            .vulnerabilities
            .iter()
            .map(|vulnerability| Finding {
                file: file.clone(),
                path: path.clone(),
                version: version.clone(),
                cve_id: classify_cve(vulnerability.name.as_deref()),
                severity: vulnerability
                    .severity
                    .clone()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                description: bound_description(vulnerability.description.as_deref()),
            })
            .collect()
    }
}

/// Version precedence: collected version evidence, then a `name@version`
/// package identifier, then the unknown sentinel.
fn resolve_version(dependency: &Dependency) -> String {
    let from_evidence = dependency
        .evidence_collected
        .as_ref()
        .and_then(|evidence| evidence.version_evidence.first())
        .and_then(|evidence| evidence.value.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(version) = from_evidence {
        return version.to_string();
    }

    let from_identifier = dependency.packages.iter().find_map(|package| {
        let id = package.id.as_deref()?;
        let (_, version) = id.rsplit_once('@')?;
        let version = version.trim();
        (!version.is_empty()).then_some(version)
    });

    from_identifier.unwrap_or(UNKNOWN).to_string()
}

fn classify_cve(name: Option<&str>) -> String {
    match name {
        Some(name) if name.starts_with(CVE_PREFIX) => name.to_string(),
        _ => NOT_APPLICABLE.to_string(),
    }
}

fn bound_description(description: Option<&str>) -> String {
    let trimmed = description.unwrap_or_default().trim();
    if trimmed.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect()
    }
}

// dependency-check JSON report structures

#[derive(Debug, Deserialize)]
struct DependencyCheckReport {
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dependency {
    file_name: Option<String>,
    file_path: Option<String>,
    evidence_collected: Option<EvidenceCollected>,
    #[serde(default)]
    packages: Vec<PackageIdentifier>,
    #[serde(default)]
    vulnerabilities: Vec<ReportedVulnerability>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvidenceCollected {
    #[serde(default)]
    version_evidence: Vec<Evidence>,
}

#[derive(Debug, Deserialize)]
struct Evidence {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageIdentifier {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportedVulnerability {
    name: Option<String>,
    severity: Option<String>,
    description: Option<String>,
}

use crate::ports::outbound::{ReportContext, ReportWriter};
use crate::scan_pipeline::domain::{SeverityCategory, SeverityCounts};
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

// US Letter in PDF points
const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN: u32 = 54;

/// Characters per line at body size; Helvetica averages ~0.5em per glyph
const WRAP_COLUMNS: usize = 96;

/// Prefix for the detail lines under each finding
const INDENT: &str = "   ";

/// Version line plus a binary comment marking the file as non-text
const PDF_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

const TITLE_SIZE: u32 = 16;
const HEADING_SIZE: u32 = 12;
const BODY_SIZE: u32 = 9;

#[derive(Debug, Clone, PartialEq)]
struct Line {
    size: u32,
    text: String,
}

impl Line {
    fn new(size: u32, text: impl Into<String>) -> Self {
        Self {
            size,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(BODY_SIZE, "")
    }

    fn height(&self) -> u32 {
        self.size + self.size / 2
    }
}

/// PdfReportWriter adapter rendering scan results as a PDF document
///
/// Produces a plain, paginated PDF 1.4 file using the built-in Helvetica
/// font, so no font files or rendering libraries are needed. Text outside
/// printable ASCII is replaced with `?`.
#[derive(Debug, Default, Clone)]
pub struct PdfReportWriter;

impl PdfReportWriter {
    pub fn new() -> Self {
        Self
    }

    fn layout_lines(context: &ReportContext<'_>) -> Vec<Line> {
        let mut lines = vec![
            Line::new(TITLE_SIZE, "Dependency Vulnerability Report"),
            Line::blank(),
            Line::new(BODY_SIZE, format!("Scan ID: {}", context.scan_id)),
        ];
        for wrapped in wrap(&format!("Archive: {}", context.filename), WRAP_COLUMNS) {
            lines.push(Line::new(BODY_SIZE, wrapped));
        }
        lines.extend([
            Line::new(BODY_SIZE, format!("Owner: {}", context.owner)),
            Line::new(
                BODY_SIZE,
                format!(
                    "Generated: {}",
                    context.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
            ),
            Line::blank(),
            Line::new(HEADING_SIZE, "Severity Summary"),
        ]);

        let counts = SeverityCounts::tally(context.findings.iter());
        for category in SeverityCategory::ALL {
            lines.push(Line::new(
                BODY_SIZE,
                format!("{}: {}", category.as_str(), counts.get(category)),
            ));
        }
        let uncategorized = context.findings.len().saturating_sub(counts.total());
        if uncategorized > 0 {
            lines.push(Line::new(BODY_SIZE, format!("Other: {}", uncategorized)));
        }
        lines.push(Line::new(
            BODY_SIZE,
            format!("Total findings: {}", context.findings.len()),
        ));

        if context.compliance {
            lines.push(Line::blank());
            lines.push(Line::new(HEADING_SIZE, "PCI DSS Compliance Notice"));
            let notice = if counts.critical + counts.high > 0 {
                "Critical or high severity vulnerabilities were found. PCI DSS requirement 6.3.3 \
                 expects these to be remediated before the affected components are deployed."
            } else {
                "No critical or high severity vulnerabilities were found in the scanned dependencies."
            };
            for wrapped in wrap(notice, WRAP_COLUMNS) {
                lines.push(Line::new(BODY_SIZE, wrapped));
            }
        }

        lines.push(Line::blank());
        lines.push(Line::new(HEADING_SIZE, "Findings"));
        if context.findings.is_empty() {
            lines.push(Line::new(BODY_SIZE, "No known vulnerabilities were reported."));
        }

        for (index, finding) in context.findings.iter().enumerate() {
            lines.push(Line::blank());
            let header = format!(
                "{}. {} [{}] {}",
                index + 1,
                finding.cve_id,
                finding.severity,
                finding.file
            );
            for wrapped in wrap(&header, WRAP_COLUMNS) {
                lines.push(Line::new(BODY_SIZE, wrapped));
            }
            let details = [
                format!("Path: {}", finding.path),
                format!("Version: {}", finding.version),
                finding.description.clone(),
            ];
            for detail in &details {
                for wrapped in wrap(detail, WRAP_COLUMNS - INDENT.len()) {
                    lines.push(Line::new(BODY_SIZE, format!("{}{}", INDENT, wrapped)));
                }
            }
        }

        lines
    }

    fn paginate(lines: Vec<Line>) -> Vec<Vec<Line>> {
        let usable = PAGE_HEIGHT - 2 * MARGIN;
        let mut pages = vec![Vec::new()];
        let mut used = 0;

        for line in lines {
            if used + line.height() > usable {
                pages.push(Vec::new());
                used = 0;
            }
            used += line.height();
            if let Some(page) = pages.last_mut() {
                page.push(line);
            }
        }
        pages
    }

    fn render(context: &ReportContext<'_>) -> Vec<u8> {
        let pages = Self::paginate(Self::layout_lines(context));
        let page_count = pages.len();

        // Object numbers: 1 catalog, 2 page tree, 3 font, then a
        // (page, content) pair per page.
        let page_object = |i: usize| 4 + 2 * i;
        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(3 + 2 * page_count);

        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids: Vec<String> = (0..page_count)
            .map(|i| format!("{} 0 R", page_object(i)))
            .collect();
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_count
            )
            .into_bytes(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );

        for (i, page) in pages.iter().enumerate() {
            let content = Self::content_stream(page, i + 1, page_count);
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH,
                    PAGE_HEIGHT,
                    page_object(i) + 1
                )
                .into_bytes(),
            );
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(&content);
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out: Vec<u8> = PDF_HEADER.to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }

    fn content_stream(lines: &[Line], page_number: usize, page_count: usize) -> Vec<u8> {
        let mut stream = String::new();
        let mut y = PAGE_HEIGHT - MARGIN;
        for line in lines {
            y -= line.height();
            if line.text.is_empty() {
                continue;
            }
            stream.push_str(&format!(
                "BT /F1 {} Tf {} {} Td ({}) Tj ET\n",
                line.size,
                MARGIN,
                y,
                escape(&line.text)
            ));
        }
        stream.push_str(&format!(
            "BT /F1 8 Tf {} {} Td (Page {} of {}) Tj ET",
            PAGE_WIDTH - MARGIN - 60,
            MARGIN / 2,
            page_number,
            page_count
        ));
        stream.into_bytes()
    }
}

impl ReportWriter for PdfReportWriter {
    fn write_report(&self, context: &ReportContext<'_>, destination: &Path) -> PipelineResult<()> {
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| ScanError::io("creating report directory", parent, e))?;

        let bytes = Self::render(context);

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| ScanError::io("creating temporary report", parent, e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| ScanError::io("writing report", destination, e))?;
        temp.persist(destination)
            .map_err(|e| ScanError::io("persisting report", destination, e.error))?;

        tracing::debug!(
            scan_id = %context.scan_id,
            path = %destination.display(),
            bytes = bytes.len(),
            findings = context.findings.len(),
            "PDF report written"
        );
        Ok(())
    }
}

/// Escapes a string for a PDF literal, mapping anything outside printable
/// ASCII to `?`
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Greedy word wrap by character count; overlong words are hard-split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_pipeline::domain::{Finding, ScanId};
    use chrono::Utc;
    use tempfile::TempDir;

    fn finding(cve: &str, severity: &str) -> Finding {
        Finding {
            file: "foo.jar".to_string(),
            path: "lib/foo.jar".to_string(),
            version: "1.2.3".to_string(),
            cve_id: cve.to_string(),
            severity: severity.to_string(),
            description: "Remote code execution (RCE) in foo".to_string(),
        }
    }

    fn context<'a>(scan_id: &'a ScanId, findings: &'a [Finding], compliance: bool) -> ReportContext<'a> {
        ReportContext {
            scan_id,
            filename: "app.zip",
            owner: "alice",
            compliance,
            generated_at: Utc::now(),
            findings,
        }
    }

    fn render_text(context: &ReportContext<'_>) -> String {
        String::from_utf8_lossy(&PdfReportWriter::render(context)).into_owned()
    }

    #[test]
    fn test_write_report_creates_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("reports").join("scan.pdf");
        let scan_id = ScanId::generate();
        let findings = vec![finding("CVE-2021-1", "HIGH")];

        PdfReportWriter::new()
            .write_report(&context(&scan_id, &findings, false), &destination)
            .unwrap();

        let bytes = fs::read(&destination).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_render_escapes_and_summarizes() {
        let scan_id = ScanId::generate();
        let findings = vec![finding("CVE-2021-1", "HIGH"), finding("N/A", "low")];
        let text = render_text(&context(&scan_id, &findings, false));

        assert!(text.contains("(High: 1)"));
        assert!(text.contains("(Low: 1)"));
        assert!(text.contains("Remote code execution \\(RCE\\) in foo"));
        assert!(!text.contains("PCI DSS"));
    }

    #[test]
    fn test_compliance_notice_only_when_requested() {
        let scan_id = ScanId::generate();
        let findings = vec![finding("CVE-2021-1", "CRITICAL")];
        let text = render_text(&context(&scan_id, &findings, true));
        assert!(text.contains("PCI DSS Compliance Notice"));
    }

    #[test]
    fn test_many_findings_paginate() {
        let scan_id = ScanId::generate();
        let findings: Vec<Finding> = (0..60).map(|i| finding(&format!("CVE-2021-{}", i), "MEDIUM")).collect();
        let text = render_text(&context(&scan_id, &findings, false));

        let pages = text.matches("/Type /Page ").count();
        assert!(pages > 1);
        assert!(text.contains(&format!("/Count {}", pages)));
        assert!(text.contains(&format!("(Page {} of {})", pages, pages)));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let scan_id = ScanId::generate();
        let bytes = PdfReportWriter::render(&context(&scan_id, &[], false));
        // Everything after the binary header comment is ASCII
        let body = std::str::from_utf8(&bytes[PDF_HEADER.len()..]).unwrap();
        let at = |offset: usize| &body[offset - PDF_HEADER.len()..];

        let xref_start = body.find("\nxref\n").unwrap() + 1;
        let entries: Vec<&str> = body[xref_start..]
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .collect();
        assert_eq!(entries.len(), 5);
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(at(offset).starts_with(&format!("{} 0 obj\n", i + 1)));
        }
    }

    #[test]
    fn test_long_names_stay_within_margin() {
        let scan_id = ScanId::generate();
        let long_name = format!("{}.zip", "very-long-archive-name-".repeat(8));
        let mut long_finding = finding("CVE-2021-1", "HIGH");
        long_finding.file = format!("{}.jar", "shaded-dependency-bundle-".repeat(6));
        long_finding.path = format!("lib/{}", long_finding.file);
        let findings = vec![long_finding];
        let mut report = context(&scan_id, &findings, false);
        report.filename = long_name.as_str();

        let lines = PdfReportWriter::layout_lines(&report);

        for line in &lines {
            assert!(
                line.text.chars().count() <= WRAP_COLUMNS,
                "line overflows: {:?}",
                line.text
            );
        }
        let archive_lines: String = lines
            .iter()
            .skip_while(|l| !l.text.starts_with("Archive: "))
            .take_while(|l| !l.text.starts_with("Owner: "))
            .map(|l| l.text.as_str())
            .collect();
        // Hard splits drop only the separating space
        assert_eq!(archive_lines, format!("Archive:{}", long_name));
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape("a\\b(c)"), "a\\\\b\\(c\\)");
        assert_eq!(escape("naïve"), "na?ve");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("", 10), vec![String::new()]);
        assert_eq!(wrap("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }
}

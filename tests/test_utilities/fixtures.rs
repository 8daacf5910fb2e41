use serde_json::json;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Builds an in-memory zip archive from `(name, contents)` pairs
pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A small source tree with one vulnerable jar
pub fn sample_archive() -> Vec<u8> {
    zip_archive(&[
        ("app/pom.xml", "<project/>"),
        ("app/lib/foo.jar", "not really a jar"),
    ])
}

/// dependency-check JSON with `count` HIGH findings in one dependency
pub fn report_with_high_findings(count: usize) -> String {
    let vulnerabilities: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "name": format!("CVE-2024-{:04}", i + 1),
                "severity": "HIGH",
                "description": "Remote code execution"
            })
        })
        .collect();
    json!({
        "reportSchema": "1.1",
        "dependencies": [{
            "fileName": "foo.jar",
            "filePath": "app/lib/foo.jar",
            "packages": [{ "id": "pkg:maven/org.example/foo@1.2.3" }],
            "vulnerabilities": vulnerabilities
        }]
    })
    .to_string()
}

/// dependency-check JSON for a tree without vulnerable dependencies
pub fn clean_report() -> String {
    json!({ "reportSchema": "1.1", "dependencies": [] }).to_string()
}

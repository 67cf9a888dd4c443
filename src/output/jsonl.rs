#![forbid(unsafe_code)]

//! JSONL output formatter for machine-readable output
//!
//! Outputs one JSON object per line in a deterministic order:
//! 1. One `failure` record per file that could not be processed
//! 2. One `diagnostic` record per warning (sorted by file, path, rule)
//! 3. One `changed` record per output file written or found stale
//! 4. One `removed` record per generated file deleted
//! 5. One `summary` record

use super::report::{Report, RunMode};
use crate::engine::Diagnostic;
use serde::Serialize;
use std::path::PathBuf;

/// JSONL output formatter
pub struct JsonlFormatter;

impl JsonlFormatter {
    pub fn new() -> Self {
        JsonlFormatter
    }

    /// Format the report as JSONL
    pub fn format(&self, report: &Report, mode: RunMode) -> String {
        let mut output = String::new();

        for failure in &report.failures {
            push_line(
                &mut output,
                &FailureRecord {
                    record_type: "failure",
                    file: failure.file.clone(),
                    message: failure.message.clone(),
                },
            );
        }

        for diagnostic in &report.diagnostics {
            push_line(
                &mut output,
                &DiagnosticRecord {
                    record_type: "diagnostic",
                    diagnostic,
                },
            );
        }

        for path in &report.changed {
            push_line(
                &mut output,
                &ChangedRecord {
                    record_type: "changed",
                    file: path.clone(),
                },
            );
        }

        for path in &report.removed {
            push_line(
                &mut output,
                &ChangedRecord {
                    record_type: "removed",
                    file: path.clone(),
                },
            );
        }

        push_line(
            &mut output,
            &SummaryRecord {
                record_type: "summary",
                mode: mode.as_str(),
                files: report.files as u64,
                generated: report.generated as u64,
                changed: report.changed.len() as u64,
                removed: report.removed.len() as u64,
                warnings: report.warnings() as u64,
                failures: report.failures.len() as u64,
            },
        );

        output
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn push_line(output: &mut String, record: &impl Serialize) {
    if let Ok(json) = serde_json::to_string(record) {
        output.push_str(&json);
        output.push('\n');
    }
}

#[derive(Debug, Serialize)]
struct FailureRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    file: PathBuf,
    message: String,
}

#[derive(Debug, Serialize)]
struct DiagnosticRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
}

#[derive(Debug, Serialize)]
struct ChangedRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    file: PathBuf,
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    mode: &'static str,
    files: u64,
    generated: u64,
    changed: u64,
    removed: u64,
    warnings: u64,
    failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FileFailure;
    use crate::types::Severity;

    fn diagnostic(path: &str, rule: &str) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            file: Some(PathBuf::from("src/model.rs")),
            record: "Order".into(),
            path: path.into(),
            rule: rule.into(),
            message: format!("{rule} skipped"),
        }
    }

    #[test]
    fn test_empty_report_has_summary_only() {
        let output = JsonlFormatter::new().format(&Report::default(), RunMode::Check);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let summary: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["mode"], "check");
        assert_eq!(summary["files"], 0);
        assert_eq!(summary["warnings"], 0);
    }

    #[test]
    fn test_record_order_and_fields() {
        let report = Report {
            diagnostics: vec![diagnostic("Order.items", "dive"), diagnostic("Order.note", "cel")],
            failures: vec![FileFailure {
                file: PathBuf::from("src/bad.rs"),
                message: "Syntax error at line 1: unexpected input".into(),
            }],
            files: 2,
            generated: 1,
            changed: vec![PathBuf::from("src/model_validate.rs")],
            removed: vec![PathBuf::from("src/old_validate.rs")],
        };
        let output = JsonlFormatter::new().format(&report, RunMode::Generate);
        let records: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        let types: Vec<&str> = records.iter().map(|r| r["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["failure", "diagnostic", "diagnostic", "changed", "removed", "summary"]
        );

        assert_eq!(records[1]["severity"], "warning");
        assert_eq!(records[1]["file"], "src/model.rs");
        assert_eq!(records[1]["record"], "Order");
        assert_eq!(records[1]["path"], "Order.items");
        assert_eq!(records[1]["rule"], "dive");

        assert_eq!(records[3]["file"], "src/model_validate.rs");
        assert_eq!(records[4]["file"], "src/old_validate.rs");
        assert_eq!(records[5]["mode"], "generate");
        assert_eq!(records[5]["changed"], 1);
        assert_eq!(records[5]["removed"], 1);
        assert_eq!(records[5]["warnings"], 2);
        assert_eq!(records[5]["failures"], 1);
    }
}

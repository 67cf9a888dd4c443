#![forbid(unsafe_code)]

//! Summary of a generate or check run, shared by the formatters

use crate::engine::{Diagnostic, GenerationResult};
use crate::types::Severity;
use std::path::PathBuf;

/// Whether outputs were written or only compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Generate,
    Check,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Generate => "generate",
            RunMode::Check => "check",
        }
    }

    /// Prefix for each changed output file
    pub fn line_label(&self) -> &'static str {
        match self {
            RunMode::Generate => "Wrote",
            RunMode::Check => "Stale",
        }
    }

    pub fn summary_label(&self) -> &'static str {
        match self {
            RunMode::Generate => "written",
            RunMode::Check => "stale",
        }
    }
}

/// A source file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: PathBuf,
    pub message: String,
}

/// Outcome of one run over a set of source files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Diagnostics sorted by file, path and rule
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<FileFailure>,
    /// Number of source files processed
    pub files: usize,
    /// Number of files that produced a validator module
    pub generated: usize,
    /// Generated files written to disk (generate) or found out of date (check)
    pub changed: Vec<PathBuf>,
    /// Generated files deleted because their source has no checks left
    pub removed: Vec<PathBuf>,
}

impl Report {
    /// Builds a report from a generation result
    ///
    /// `changed` lists output files written or found stale by the caller.
    pub fn from_result(result: &GenerationResult, changed: Vec<PathBuf>) -> Self {
        let mut diagnostics: Vec<Diagnostic> = result.diagnostics().cloned().collect();
        diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.rule.cmp(&b.rule))
        });
        let failures = result
            .errors()
            .map(|(file, e)| FileFailure {
                file: file.to_path_buf(),
                message: e.to_string(),
            })
            .collect();
        Self {
            diagnostics,
            failures,
            files: result.files_processed(),
            generated: result.files.iter().filter(|f| f.content.is_some()).count(),
            changed,
            removed: Vec::new(),
        }
    }

    pub fn with_removed(mut self, removed: Vec<PathBuf>) -> Self {
        self.removed = removed;
        self
    }

    pub fn warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity <= Severity::Warning)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FileEntry, Generator};
    use crate::rules::RuleRegistry;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_report_from_result() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("a.rs");
        let bad = dir.path().join("b.rs");
        fs::write(
            &good,
            "struct A {\n    /// +cel=value.split(',').size() > 1\n    csv: String,\n    /// +required\n    name: String,\n}\n",
        )
        .unwrap();
        fs::write(&bad, "struct B {").unwrap();

        let generator = Generator::new(RuleRegistry::with_builtins().unwrap());
        let result = generator.generate(vec![FileEntry::new(good.clone()), FileEntry::new(bad.clone())]);
        let report = Report::from_result(&result, vec![]);

        assert_eq!(report.files, 2);
        assert_eq!(report.generated, 1);
        assert_eq!(report.warnings(), 1);
        assert_eq!(report.diagnostics[0].path, "A.csv");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, bad);
    }
}

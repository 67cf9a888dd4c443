#![forbid(unsafe_code)]

//! Parallel generation across source files
//!
//! Each file is parsed, walked and rendered independently with its own
//! [`GenerationContext`], so files are processed in parallel with rayon and
//! the output does not depend on processing order.

use super::context::{Diagnostic, GenerationContext};
use super::emitter::{GENERATED_MARKER, emit_file};
use super::file_walker::{FileEntry, output_path};
use crate::config::DEFAULT_SUFFIX;
use crate::error::FieldguardError;
use crate::frontend;
use crate::rules::RuleRegistry;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What [`FileOutcome::write`] did to the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Unchanged,
    Written,
    /// A previously generated module with nothing left to check was deleted
    Removed,
}

/// Result of generating one source file
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// Where the generated module is written
    pub output: PathBuf,
    /// Rendered module, `None` when no record has a rule
    pub content: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the file could not be read or parsed
    pub error: Option<FieldguardError>,
}

impl FileOutcome {
    /// True when the file on disk differs from what would be written
    ///
    /// A generated module left behind by a source that no longer has any
    /// check is stale too. Files without the generated header are never
    /// touched.
    pub fn is_stale(&self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let existing = fs::read_to_string(&self.output).ok();
        match (&self.content, existing) {
            (Some(content), Some(existing)) => *content != existing,
            (Some(_), None) => true,
            (None, Some(existing)) => is_generated(&existing),
            (None, None) => false,
        }
    }

    /// Brings the output file in line with the generated content
    pub fn write(&self) -> Result<WriteAction, FieldguardError> {
        if self.error.is_some() {
            return Ok(WriteAction::Unchanged);
        }
        let existing = fs::read_to_string(&self.output).ok();
        match (&self.content, existing) {
            (Some(content), Some(existing)) if *content == existing => Ok(WriteAction::Unchanged),
            (Some(content), _) => {
                fs::write(&self.output, content)?;
                tracing::info!(output = %self.output.display(), "wrote validators");
                Ok(WriteAction::Written)
            }
            (None, Some(existing)) if is_generated(&existing) => {
                fs::remove_file(&self.output)?;
                tracing::info!(output = %self.output.display(), "removed validators with no checks left");
                Ok(WriteAction::Removed)
            }
            (None, _) => Ok(WriteAction::Unchanged),
        }
    }
}

fn is_generated(text: &str) -> bool {
    text.starts_with(GENERATED_MARKER)
}

/// Result of generating all files
#[derive(Debug)]
pub struct GenerationResult {
    pub files: Vec<FileOutcome>,
}

impl GenerationResult {
    pub fn files_processed(&self) -> usize {
        self.files.len()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| &f.diagnostics)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&Path, &FieldguardError)> {
        self.files
            .iter()
            .filter_map(|f| f.error.as_ref().map(|e| (f.source.as_path(), e)))
    }
}

/// Generates validator modules for source files
pub struct Generator {
    registry: Arc<RuleRegistry>,
    suffix: String,
    messages: HashMap<String, String>,
}

impl Generator {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            suffix: DEFAULT_SUFFIX.to_string(),
            messages: HashMap::new(),
        }
    }

    /// Sets the suffix of generated files
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sets message templates keyed by rule identifier
    pub fn with_messages(mut self, messages: HashMap<String, String>) -> Self {
        self.messages = messages;
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Generates every file in parallel, keeping input order in the result
    pub fn generate(&self, files: Vec<FileEntry>) -> GenerationResult {
        let files = files
            .par_iter()
            .map(|file| self.generate_file(&file.path))
            .collect();
        GenerationResult { files }
    }

    /// Generates the module for one source file without writing it
    pub fn generate_file(&self, path: &Path) -> FileOutcome {
        let output = output_path(path, &self.suffix);
        let mut ctx = GenerationContext::for_file(path).with_messages(self.messages.clone());

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (content, error) = match frontend::parse_file(path) {
            Ok(schema) => (emit_file(&schema, &self.registry, &source_name, &mut ctx), None),
            Err(source) => {
                tracing::warn!(file = %path.display(), "skipping file: {source}");
                let error = FieldguardError::Frontend {
                    file: path.to_path_buf(),
                    source,
                };
                (None, Some(error))
            }
        };

        FileOutcome {
            source: path.to_path_buf(),
            output,
            content,
            diagnostics: ctx.into_diagnostics(),
            error,
        }
    }

    /// Generates the module for source text held in memory
    ///
    /// # Errors
    ///
    /// Returns `FieldguardError::Frontend` if `source` does not parse.
    pub fn generate_source(
        &self,
        name: &str,
        source: &str,
        ctx: &mut GenerationContext,
    ) -> Result<Option<String>, FieldguardError> {
        let schema = frontend::parse_source(source).map_err(|e| FieldguardError::Frontend {
            file: PathBuf::from(name),
            source: e,
        })?;
        Ok(emit_file(&schema, &self.registry, name, ctx))
    }
}

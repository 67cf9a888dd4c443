//! Source file discovery with gitignore support
//!
//! Finds the Rust files to generate validators for. Files are matched
//! against include/exclude globs relative to the walk root; generated files
//! (those ending in the output suffix) are never returned.

use crate::types::GlobPattern;
use globset::{Glob, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during file walking
#[derive(Debug, Error)]
pub enum FileWalkerError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason why a file was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File did not match include patterns, or matched an exclude pattern
    ExcludedByPattern,
    /// File is not a `.rs` file
    NotRustSource,
    /// File is itself generated output
    Generated,
    /// File is not a regular file (e.g., directory, symlink)
    NotAFile,
}

/// Result of file walking - either a file to process or a skipped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkResult {
    File(FileEntry),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
}

impl FileEntry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the generated file next to this source
    ///
    /// `src/user.rs` with suffix `_validate.rs` becomes `src/user_validate.rs`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        output_path(&self.path, suffix)
    }
}

/// Sibling output path for `source`
pub fn output_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{suffix}"))
}

/// Iterator over discovered files
pub struct FileWalker {
    root: PathBuf,
    walker: ignore::Walk,
    include_set: Option<globset::GlobSet>,
    exclude_set: Option<globset::GlobSet>,
    suffix: String,
    verbose: bool,
}

impl FileWalker {
    /// Creates a new FileWalker
    ///
    /// # Arguments
    /// * `root` - Root directory to walk
    /// * `include` - Include patterns (empty means include all)
    /// * `exclude` - Exclude patterns (applied after include)
    /// * `suffix` - Suffix of generated files, which are always skipped
    pub fn new(
        root: &Path,
        include: &[GlobPattern],
        exclude: &[GlobPattern],
        suffix: &str,
    ) -> Result<Self, FileWalkerError> {
        Self::with_verbose(root, include, exclude, suffix, false)
    }

    /// Creates a new FileWalker that also reports skipped files when `verbose`
    pub fn with_verbose(
        root: &Path,
        include: &[GlobPattern],
        exclude: &[GlobPattern],
        suffix: &str,
        verbose: bool,
    ) -> Result<Self, FileWalkerError> {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        let include_set = if include.is_empty() {
            None
        } else {
            Some(Self::build_globset(include)?)
        };

        let mut exclude_patterns = Vec::from(exclude);
        exclude_patterns.push(GlobPattern::new("**/.git/**"));
        exclude_patterns.push(GlobPattern::new("**/target/**"));
        let exclude_set = Some(Self::build_globset(&exclude_patterns)?);

        Ok(Self {
            root: root.to_path_buf(),
            walker,
            include_set,
            exclude_set,
            suffix: suffix.to_string(),
            verbose,
        })
    }

    fn build_globset(patterns: &[GlobPattern]) -> Result<globset::GlobSet, FileWalkerError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_str()).map_err(|e| FileWalkerError::InvalidGlob {
                pattern: pattern.as_str().to_string(),
                source: e,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| FileWalkerError::InvalidGlob {
            pattern: "<globset>".to_string(),
            source: e,
        })
    }

    /// Walks the directory tree and returns an iterator over matching files
    pub fn walk(self) -> impl Iterator<Item = Result<FileEntry, FileWalkerError>> {
        self.walk_with_skip_info().filter_map(|result| match result {
            Ok(WalkResult::File(file)) => Some(Ok(file)),
            Ok(WalkResult::Skipped { .. }) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Walks the directory tree and returns an iterator with skip information
    pub fn walk_with_skip_info(self) -> impl Iterator<Item = Result<WalkResult, FileWalkerError>> {
        let FileWalker {
            root,
            walker,
            include_set,
            exclude_set,
            suffix,
            verbose,
        } = self;

        walker.filter_map(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => return Some(Err(FileWalkerError::Walk(e))),
            };
            let path = entry.path();
            let skipped = |reason| {
                verbose.then(|| {
                    Ok(WalkResult::Skipped {
                        path: path.to_path_buf(),
                        reason,
                    })
                })
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return skipped(SkipReason::NotAFile);
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if let Some(ref include_set) = include_set
                && !include_set.is_match(relative)
                && !include_set.is_match(path)
            {
                return skipped(SkipReason::ExcludedByPattern);
            }
            if let Some(ref exclude_set) = exclude_set
                && (exclude_set.is_match(relative) || exclude_set.is_match(path))
            {
                return skipped(SkipReason::ExcludedByPattern);
            }

            if path.extension().is_none_or(|ext| ext != "rs") {
                return skipped(SkipReason::NotRustSource);
            }
            if path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(suffix.as_str()))
            {
                return skipped(SkipReason::Generated);
            }

            Some(Ok(WalkResult::File(FileEntry::new(path.to_path_buf()))))
        })
    }
}

//! Test utilities for fieldguard integration tests

#![allow(dead_code)]

use fieldguard::engine::{Diagnostic, GenerationContext, Generator};
use fieldguard::rules::RuleRegistry;
use std::fs;
use std::path::{Path, PathBuf};

/// Result type alias for tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Extract Ok value or panic with context
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Extract Some value or panic with context
#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {
        match $expr {
            Some(v) => v,
            None => panic!("assertion failed: expected Some, got None"),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Some(v) => v,
            None => panic!("{}: got None", $msg),
        }
    };
}

/// Generator with every built-in rule
pub fn generator() -> Generator {
    Generator::new(RuleRegistry::with_builtins().expect("built-in rules register"))
}

/// Generates the module for in-memory source, returning it with diagnostics
pub fn generate(source: &str) -> (Option<String>, Vec<Diagnostic>) {
    let mut ctx = GenerationContext::new();
    let output = generator()
        .generate_source("model.rs", source, &mut ctx)
        .expect("source parses");
    (output, ctx.into_diagnostics())
}

/// Writes `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directories");
    }
    fs::write(&path, content).expect("write test file");
    path
}

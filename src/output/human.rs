#![forbid(unsafe_code)]

//! Human-readable output with optional color

use super::report::{Report, RunMode};
use crate::config::ColorOption;
use crate::types::Severity;
use std::io::{self, IsTerminal};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Writes diagnostics and a one-line summary for a run
pub struct HumanFormatter {
    color: ColorChoice,
}

impl HumanFormatter {
    pub fn new(color: ColorOption) -> Self {
        let color = match color {
            ColorOption::Always => ColorChoice::Always,
            ColorOption::Never => ColorChoice::Never,
            ColorOption::Auto if io::stderr().is_terminal() => ColorChoice::Auto,
            ColorOption::Auto => ColorChoice::Never,
        };
        Self { color }
    }

    /// Writes the report to `out`
    pub fn write(&self, out: &mut dyn WriteColor, report: &Report, mode: RunMode) -> io::Result<()> {
        for failure in &report.failures {
            write_label(out, "error", Color::Red)?;
            writeln!(out, ": {}", failure.message)?;
        }

        for diagnostic in &report.diagnostics {
            let (label, color) = match diagnostic.severity {
                Severity::Warning => ("warning", Color::Yellow),
                Severity::Info => ("info", Color::Cyan),
            };
            write_label(out, label, color)?;
            writeln!(out, "[{}]: {}", diagnostic.rule, diagnostic.message)?;
            match &diagnostic.file {
                Some(file) => writeln!(out, "  --> {} ({})", file.display(), diagnostic.path)?,
                None => writeln!(out, "  --> {}", diagnostic.path)?,
            }
        }

        for path in &report.changed {
            writeln!(out, "{} {}", mode.line_label(), path.display())?;
        }
        for path in &report.removed {
            writeln!(out, "Removed {}", path.display())?;
        }

        if !report.diagnostics.is_empty()
            || !report.failures.is_empty()
            || !report.changed.is_empty()
            || !report.removed.is_empty()
        {
            writeln!(out)?;
        }
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(
            out,
            "{} files, {} with validators, {} {}",
            report.files,
            report.generated,
            report.changed.len(),
            mode.summary_label()
        )?;
        if !report.removed.is_empty() {
            write!(out, ", {} removed", report.removed.len())?;
        }
        out.reset()?;
        writeln!(
            out,
            ", {} warnings, {} errors",
            report.warnings(),
            report.failures.len()
        )?;
        Ok(())
    }

    /// Writes the report to stderr
    pub fn write_to_stderr(&self, report: &Report, mode: RunMode) -> io::Result<()> {
        let mut stream = StandardStream::stderr(self.color);
        self.write(&mut stream, report, mode)
    }

    /// Renders the report without color
    pub fn format(&self, report: &Report, mode: RunMode) -> String {
        let mut buffer = Buffer::no_color();
        // Writing to an in-memory buffer does not fail
        let _ = self.write(&mut buffer, report, mode);
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new(ColorOption::Auto)
    }
}

fn write_label(out: &mut dyn WriteColor, label: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()
}

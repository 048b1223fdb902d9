//! Report generation with multiple output formats
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - RunReport (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Domain logic remains pure while supporting multiple presentation needs

use crate::domain::violations::{
    FileReport, FileStatus, RunReport, ScrubError, ScrubResult, Severity, Violation,
};
use std::io::Write;

/// Supported output formats for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with colors and context
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// GitHub Actions format for workflow integration
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to show context lines under violations
    pub show_context: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_context: true,
            max_violations: None,
            min_severity: None,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a run report in the specified format
    pub fn format_report(&self, report: &RunReport, format: OutputFormat) -> ScrubResult<String> {
        let filtered = self.filter_report(report);

        match format {
            OutputFormat::Human => self.format_human(&filtered),
            OutputFormat::Json => self.format_json(&filtered),
            OutputFormat::GitHub => self.format_github(&filtered),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &RunReport,
        format: OutputFormat,
        mut writer: W,
    ) -> ScrubResult<()> {
        let formatted = self.format_report(report, format)?;
        writer
            .write_all(formatted.as_bytes())
            .map_err(|e| ScrubError::Io { source: e })?;
        Ok(())
    }

    /// Drop violations below the configured severity and over the budget
    fn filter_report(&self, report: &RunReport) -> RunReport {
        let mut filtered = report.clone();

        if let Some(min_severity) = self.options.min_severity {
            for file in &mut filtered.files {
                file.violations.retain(|v| v.severity >= min_severity);
            }
        }

        if let Some(max) = self.options.max_violations {
            let mut budget = max;
            for file in &mut filtered.files {
                let keep = budget.min(file.violations.len());
                file.violations.truncate(keep);
                budget -= keep;
            }
        }

        filtered
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &RunReport) -> ScrubResult<String> {
        let mut output = String::new();

        if !report.has_violations() && !report.has_failures() {
            if self.options.use_colors {
                output.push_str("✅ \x1b[32mNo style violations found\x1b[0m\n");
            } else {
                output.push_str("✅ No style violations found\n");
            }
        } else {
            let blocking = report
                .violations()
                .any(|v| v.severity == Severity::Error)
                || report.has_failures();
            let icon = if blocking { "❌" } else { "⚠️" };
            if self.options.use_colors {
                let color = if blocking { "31" } else { "33" };
                output.push_str(&format!(
                    "{} \x1b[{}mStyle violations found\x1b[0m\n\n",
                    icon, color
                ));
            } else {
                output.push_str(&format!("{} Style violations found\n\n", icon));
            }

            for file in &report.files {
                if file.status == FileStatus::Clean {
                    continue;
                }
                output.push_str(&self.format_file_header(file));
                if let Some(error) = &file.error {
                    output.push_str(&format!("  error: {error}\n\n"));
                    continue;
                }
                for violation in &file.violations {
                    output.push_str(&self.format_violation(violation));
                }
                output.push('\n');
            }
        }

        output.push_str(&self.format_summary(report));

        Ok(output)
    }

    /// Format the per-file section header with outcome annotations
    fn format_file_header(&self, file: &FileReport) -> String {
        let mut outcome = match file.status {
            FileStatus::Fixed => {
                let stages: Vec<&str> = file.changed_by.iter().map(|s| s.as_str()).collect();
                format!("fixed ({})", stages.join(", "))
            }
            status => status.as_str().to_string(),
        };
        if file.staged {
            outcome.push_str(", staged");
        }

        if self.options.use_colors {
            format!("📁 {} \x1b[2m({})\x1b[0m\n", file.path.display(), outcome)
        } else {
            format!("📁 {} ({})\n", file.path.display(), outcome)
        }
    }

    /// Format a single violation line, optionally followed by its context
    fn format_violation(&self, violation: &Violation) -> String {
        let mut output = String::new();

        let severity_color = match violation.severity {
            Severity::Error => "31",
            Severity::Warning => "33",
        };

        let position = match violation.column {
            Some(col) => format!("{}:{}", violation.line, col),
            None => violation.line.to_string(),
        };

        if self.options.use_colors {
            output.push_str(&format!(
                "  \x1b[2m{}:{}\x1b[0m [\x1b[{}m{}\x1b[0m] {}\n",
                position,
                violation.code,
                severity_color,
                violation.severity.as_str(),
                violation.message
            ));
        } else {
            output.push_str(&format!(
                "  {}:{} [{}] {}\n",
                position,
                violation.code,
                violation.severity.as_str(),
                violation.message
            ));
        }

        if self.options.show_context {
            if let Some(context) = &violation.context {
                if self.options.use_colors {
                    output.push_str(&format!("    \x1b[2m│ {}\x1b[0m\n", context));
                } else {
                    output.push_str(&format!("    │ {}\n", context));
                }
            }
        }

        output
    }

    /// Format report in JSON format
    fn format_json(&self, report: &RunReport) -> ScrubResult<String> {
        serde_json::to_string_pretty(report)
            .map_err(|e| ScrubError::report(format!("JSON serialization failed: {e}")))
    }

    /// Format report for GitHub Actions workflow commands
    fn format_github(&self, report: &RunReport) -> ScrubResult<String> {
        let mut output = String::new();

        for file in &report.files {
            if let Some(error) = &file.error {
                output.push_str(&format!(
                    "::error file={}::{}\n",
                    file.path.display(),
                    error
                ));
                continue;
            }
            for violation in &file.violations {
                let level = match violation.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                };

                let position = match violation.column {
                    Some(col) => format!("line={},col={}", violation.line, col),
                    None => format!("line={}", violation.line),
                };

                output.push_str(&format!(
                    "::{} file={},{},title={}::{}\n",
                    level,
                    violation.file_path.display(),
                    position,
                    violation.code,
                    violation.message
                ));
            }
        }

        Ok(output)
    }

    /// Format the summary section
    fn format_summary(&self, report: &RunReport) -> String {
        let mut summary = String::new();

        let counts = &report.summary.violations_by_severity;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        if self.options.use_colors {
            summary.push_str("📊 \x1b[1mSummary:\x1b[0m ");
        } else {
            summary.push_str("📊 Summary: ");
        }

        if counts.total() == 0 {
            if self.options.use_colors {
                summary.push_str("\x1b[32m0 violations\x1b[0m");
            } else {
                summary.push_str("0 violations");
            }
        } else {
            let mut parts = Vec::new();

            if counts.error > 0 {
                let text = format!(
                    "{} error{}",
                    counts.error,
                    if counts.error == 1 { "" } else { "s" }
                );
                if self.options.use_colors {
                    parts.push(format!("\x1b[31m{}\x1b[0m", text));
                } else {
                    parts.push(text);
                }
            }

            if counts.warning > 0 {
                let text = format!(
                    "{} warning{}",
                    counts.warning,
                    if counts.warning == 1 { "" } else { "s" }
                );
                if self.options.use_colors {
                    parts.push(format!("\x1b[33m{}\x1b[0m", text));
                } else {
                    parts.push(text);
                }
            }

            summary.push_str(&parts.join(", "));
        }

        summary.push_str(&format!(
            " in {} files ({:.1}s)",
            report.summary.files_collected, execution_time
        ));

        let s = &report.summary;
        if s.files_fixed > 0 {
            summary.push_str(&format!(", {} fixed", s.files_fixed));
        }
        if s.files_staged > 0 {
            summary.push_str(&format!(", {} staged", s.files_staged));
        }
        if s.files_failed > 0 {
            if self.options.use_colors {
                summary.push_str(&format!(", \x1b[31m{} failed\x1b[0m", s.files_failed));
            } else {
                summary.push_str(&format!(", {} failed", s.files_failed));
            }
        }
        summary.push('\n');

        summary
    }
}

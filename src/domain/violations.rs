//! Core domain models for style violations and pipeline results
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - Violations carry their rule code, position, and source context
//! - RunReport acts as an aggregate root managing per-file outcomes
//! - Summary counters are maintained incrementally as outcomes are recorded

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity levels for style violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Warnings that should be addressed but don't block commits on their own
    Warning,
    /// Errors that pre-commit checks treat as blocking
    Error,
}

impl Severity {
    /// Whether this severity level should cause a check to fail
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Pipeline transform that resolves a class of violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FixStage {
    /// Whitespace scrubbing and unused-import removal
    Cleanup,
    /// Blank-line and end-of-file layout normalization
    Layout,
    /// Import block sorting and splitting
    Imports,
}

impl FixStage {
    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cleanup => "cleanup",
            Self::Layout => "layout",
            Self::Imports => "imports",
        }
    }
}

/// A style violation detected in a Python source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Rule code that detected this violation (e.g. `W291`, `F401`)
    pub code: String,
    /// Severity level of this violation
    pub severity: Severity,
    /// File path where the violation was found
    pub file_path: PathBuf,
    /// Line number (1-indexed) where the violation occurs
    pub line: u32,
    /// Column number (1-indexed) where the violation starts
    pub column: Option<u32>,
    /// Human-readable description of the violation
    pub message: String,
    /// Source line the violation was found on
    pub context: Option<String>,
    /// When this violation was detected
    pub detected_at: DateTime<Utc>,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        file_path: PathBuf,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            file_path,
            line,
            column: None,
            message: message.into(),
            context: None,
            detected_at: Utc::now(),
        }
    }

    /// Set the column position
    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// Add the source line as context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether this violation is blocking for check runs
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Format violation for display
    pub fn format_display(&self) -> String {
        let location = match self.column {
            Some(col) => format!(":{}:{col}", self.line),
            None => format!(":{}", self.line),
        };

        format!(
            "{}{} [{}] {} {}",
            self.file_path.display(),
            location,
            self.severity.as_str(),
            self.code,
            self.message
        )
    }
}

/// Outcome of running the pipeline over a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// No violations, contents untouched
    Clean,
    /// Contents were rewritten and a re-check found nothing further
    Fixed,
    /// Violations remain that no fix pass resolved
    Flagged,
    /// The file could not be processed
    Failed,
}

impl FileStatus {
    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Fixed => "fixed",
            Self::Flagged => "flagged",
            Self::Failed => "failed",
        }
    }
}

/// Per-file record of what the pipeline found and did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Path of the processed file
    pub path: PathBuf,
    /// Final outcome for the file
    pub status: FileStatus,
    /// Violations recorded for the file; the pre-fix set for `Fixed` files,
    /// the ones still present for `Flagged` files
    pub violations: Vec<Violation>,
    /// Transforms that modified the file contents
    pub changed_by: Vec<FixStage>,
    /// Whether the rewritten file was staged in the git index
    pub staged: bool,
    /// Processing error, present only when `status` is `Failed`
    pub error: Option<String>,
}

impl FileReport {
    /// Record a file that needed no work
    pub fn clean(path: PathBuf) -> Self {
        Self {
            path,
            status: FileStatus::Clean,
            violations: Vec::new(),
            changed_by: Vec::new(),
            staged: false,
            error: None,
        }
    }

    /// Record a file whose contents were rewritten
    pub fn fixed(
        path: PathBuf,
        violations: Vec<Violation>,
        changed_by: Vec<FixStage>,
        staged: bool,
    ) -> Self {
        Self {
            path,
            status: FileStatus::Fixed,
            violations,
            changed_by,
            staged,
            error: None,
        }
    }

    /// Record a file with violations that no transform could resolve
    pub fn flagged(path: PathBuf, violations: Vec<Violation>) -> Self {
        Self {
            path,
            status: FileStatus::Flagged,
            violations,
            changed_by: Vec::new(),
            staged: false,
            error: None,
        }
    }

    /// Record a file that could not be processed
    pub fn failed(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            status: FileStatus::Failed,
            violations: Vec::new(),
            changed_by: Vec::new(),
            staged: false,
            error: Some(error.into()),
        }
    }

    /// Whether this file's contents were modified
    pub fn was_modified(&self) -> bool {
        !self.changed_by.is_empty()
    }
}

/// Count of violations by severity level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
}

impl ViolationCounts {
    /// Total number of violations across all severities
    pub fn total(&self) -> usize {
        self.error + self.warning
    }

    /// Whether there are any blocking violations
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    /// Add a violation to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
        }
    }
}

/// Summary statistics for a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total number of files collected for processing
    pub files_collected: usize,
    /// Files that needed no work
    pub files_clean: usize,
    /// Files whose contents were rewritten
    pub files_fixed: usize,
    /// Files with violations that nothing rewrote
    pub files_flagged: usize,
    /// Files that could not be processed
    pub files_failed: usize,
    /// Files staged in the git index
    pub files_staged: usize,
    /// Number of violations by severity level
    pub violations_by_severity: ViolationCounts,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when the run started
    pub started_at: DateTime<Utc>,
}

/// Complete report for one pipeline run across all collected files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-file outcomes in processing order
    pub files: Vec<FileReport>,
    /// Summary statistics
    pub summary: RunSummary,
    /// Configuration used for this run
    pub config_fingerprint: Option<String>,
}

impl RunReport {
    /// Create a new empty run report
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            summary: RunSummary {
                started_at: Utc::now(),
                ..Default::default()
            },
            config_fingerprint: None,
        }
    }

    /// Record the outcome for one file, updating summary counters
    pub fn record(&mut self, file: FileReport) {
        self.summary.files_collected += 1;
        match file.status {
            FileStatus::Clean => self.summary.files_clean += 1,
            FileStatus::Fixed => self.summary.files_fixed += 1,
            FileStatus::Flagged => self.summary.files_flagged += 1,
            FileStatus::Failed => self.summary.files_failed += 1,
        }
        if file.staged {
            self.summary.files_staged += 1;
        }
        for violation in &file.violations {
            self.summary.violations_by_severity.add(violation.severity);
        }
        self.files.push(file);
    }

    /// Whether any file had violations
    pub fn has_violations(&self) -> bool {
        self.summary.violations_by_severity.total() > 0
    }

    /// Whether any file could not be processed
    pub fn has_failures(&self) -> bool {
        self.summary.files_failed > 0
    }

    /// Iterate over all violations across all files
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.files.iter().flat_map(|f| f.violations.iter())
    }

    /// Paths of files whose contents were rewritten this run
    pub fn modified_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files
            .iter()
            .filter(|f| f.was_modified())
            .map(|f| &f.path)
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur while scrubbing
#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Exclude pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Staging a file in the git index failed
    #[error("Stage error: {message}")]
    Stage { message: String },

    /// Report rendering failed
    #[error("Report error: {message}")]
    Report { message: String },
}

impl ScrubError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    /// Create a staging error
    pub fn stage(message: impl Into<String>) -> Self {
        Self::Stage {
            message: message.into(),
        }
    }

    /// Create a report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

/// Result type for pyscrub operations
pub type ScrubResult<T> = Result<T, ScrubError>;

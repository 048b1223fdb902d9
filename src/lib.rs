//! Pyscrub - Pre-commit formatting pipeline for Python sources
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from infrastructure concerns
//! - Clean boundaries between core business logic and external dependencies
//! - Hook integration API provides the pre-commit workflow

pub mod check;
pub mod collect;
pub mod config;
pub mod domain;
pub mod fix;
pub mod pipeline;
pub mod python;
pub mod report;
pub mod stage;

// Re-export main types for convenient access
pub use domain::violations::{
    FileReport, FileStatus, FixStage, RunReport, RunSummary, ScrubError, ScrubResult, Severity,
    Violation,
};

pub use config::{ConfigBuilder, ScrubConfig};

pub use pipeline::{RunOptions, ScrubEngine};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use stage::{GitStager, NoStager, Stager};

use std::path::{Path, PathBuf};

/// Main pipeline facade providing high-level scrub operations
pub struct ScrubPipeline {
    root: PathBuf,
    config: ScrubConfig,
    engine: ScrubEngine,
    report_formatter: ReportFormatter,
}

impl ScrubPipeline {
    /// Create a pipeline rooted at the given directory with the given configuration
    ///
    /// Rewritten files are staged with git by default, use [`Self::with_stager`]
    /// to substitute another staging strategy.
    pub fn with_config<P: AsRef<Path>>(root: P, config: ScrubConfig) -> ScrubResult<Self> {
        let root = root.as_ref().to_path_buf();
        let stager = Box::new(GitStager::in_dir(&root));
        let engine = ScrubEngine::new(&root, config.clone(), stager)?;

        Ok(Self {
            root,
            config,
            engine,
            report_formatter: ReportFormatter::default(),
        })
    }

    /// Create a pipeline with default configuration
    pub fn new<P: AsRef<Path>>(root: P) -> ScrubResult<Self> {
        Self::with_config(root, ScrubConfig::with_defaults())
    }

    /// Create a pipeline loading configuration from file
    pub fn from_config_file<P: AsRef<Path>, C: AsRef<Path>>(
        root: P,
        config_path: C,
    ) -> ScrubResult<Self> {
        let config = ScrubConfig::load_from_file(config_path)?;
        Self::with_config(root, config)
    }

    /// Replace the staging strategy
    pub fn with_stager(mut self, stager: Box<dyn Stager>) -> ScrubResult<Self> {
        self.engine = ScrubEngine::new(&self.root, self.config.clone(), stager)?;
        Ok(self)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Run the full pipeline: collect, detect, fix, write back, stage
    pub fn run(&self) -> ScrubResult<RunReport> {
        self.engine.run(&RunOptions::default())
    }

    /// Run the pipeline with custom options
    pub fn run_with_options(&self, options: &RunOptions) -> ScrubResult<RunReport> {
        self.engine.run(options)
    }

    /// Detection-only pass that leaves every file untouched
    pub fn check(&self) -> ScrubResult<RunReport> {
        self.engine.check()
    }

    /// Format a run report for output
    pub fn format_report(&self, report: &RunReport, format: OutputFormat) -> ScrubResult<String> {
        self.report_formatter.format_report(report, format)
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &ScrubConfig {
        &self.config
    }
}

/// Convenience function to scrub a directory with default settings
pub fn scrub_directory<P: AsRef<Path>>(root: P) -> ScrubResult<RunReport> {
    ScrubPipeline::new(root)?.run()
}

/// Convenience function to check a directory without modifying anything
pub fn check_directory<P: AsRef<Path>>(root: P) -> ScrubResult<RunReport> {
    ScrubPipeline::new(root)?.check()
}

/// Pre-commit hook integration utilities
pub mod hook {
    use super::*;

    /// Run the scrub pipeline the way the pre-commit hook does
    ///
    /// Discovers a configuration file in the root directory, falls back to
    /// defaults when none exists, applies fixes, and stages rewritten files.
    pub fn pre_commit_run<P: AsRef<Path>>(root: P) -> ScrubResult<RunReport> {
        let root = root.as_ref();
        let config = match ScrubConfig::discover_in(root) {
            Some(path) => ScrubConfig::load_from_file(path)?,
            None => ScrubConfig::with_defaults(),
        };

        ScrubPipeline::with_config(root, config)?.run()
    }

    /// Whether a finished run must block the commit
    ///
    /// Fixed files do not block, their rewritten contents are already in the
    /// index. Files with remaining violations or processing failures do.
    pub fn should_block(report: &RunReport) -> bool {
        report.summary.files_flagged > 0 || report.summary.files_failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::RecordingStager;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct SharedStager(Arc<RecordingStager>);

    impl Stager for SharedStager {
        fn stage(&self, path: &Path) -> ScrubResult<()> {
            self.0.stage(path)
        }
    }

    fn write_project(root: &Path, files: &[(&str, &str)]) {
        fs::create_dir_all(root.join("app")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        for (name, content) in files {
            fs::write(root.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_pipeline_fixes_and_records_staging() {
        let temp = TempDir::new().unwrap();
        write_project(
            temp.path(),
            &[
                ("app/bot.py", "import sys\n\nprint(sys.path)\n"),
                ("app/utils.py", "import os\nimport sys\n\nprint(sys.path)\n"),
            ],
        );

        let recorder = Arc::new(RecordingStager::new());
        let pipeline = ScrubPipeline::new(temp.path())
            .unwrap()
            .with_stager(Box::new(SharedStager(Arc::clone(&recorder))))
            .unwrap();

        let report = pipeline.run().unwrap();

        assert_eq!(report.summary.files_collected, 2);
        assert_eq!(report.summary.files_clean, 1);
        assert_eq!(report.summary.files_fixed, 1);
        assert_eq!(recorder.staged_paths().len(), 1);
        assert!(recorder.staged_paths()[0].ends_with("app/utils.py"));
        assert_eq!(
            fs::read_to_string(temp.path().join("app/utils.py")).unwrap(),
            "import sys\n\nprint(sys.path)\n"
        );
    }

    #[test]
    fn test_check_reports_without_touching_files() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), &[("app/messy.py", "x = 1 \n")]);

        let pipeline = ScrubPipeline::new(temp.path()).unwrap();
        let report = pipeline.check().unwrap();

        assert_eq!(report.summary.files_flagged, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("app/messy.py")).unwrap(),
            "x = 1 \n"
        );
    }

    #[test]
    fn test_format_report_human() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), &[("app/messy.py", "x = 1 \n")]);

        let pipeline = ScrubPipeline::new(temp.path())
            .unwrap()
            .with_report_formatter(ReportFormatter::new(ReportOptions {
                use_colors: false,
                ..Default::default()
            }));
        let report = pipeline.check().unwrap();
        let output = pipeline.format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.contains("W291"));
        assert!(output.contains("trailing whitespace"));
    }

    #[test]
    fn test_should_block_semantics() {
        let temp = TempDir::new().unwrap();
        let long = format!("x = \"{}\"\n", "a".repeat(100));
        let mixed = format!("y = 1 \n{long}");
        write_project(
            temp.path(),
            &[
                ("app/fixable.py", "x = 1 \n"),
                ("app/long.py", long.as_str()),
                ("app/mixed.py", mixed.as_str()),
            ],
        );

        let recorder = Arc::new(RecordingStager::new());
        let pipeline = ScrubPipeline::new(temp.path())
            .unwrap()
            .with_stager(Box::new(SharedStager(Arc::clone(&recorder))))
            .unwrap();

        let report = pipeline.run().unwrap();

        // the long lines cannot be fixed, so the run must block the commit
        assert_eq!(report.summary.files_fixed, 1);
        assert_eq!(report.summary.files_flagged, 2);
        assert!(hook::should_block(&report));

        // the mixed file's whitespace fix is staged, but its long line
        // still blocks just like the one sitting in a file of its own
        let entry = report
            .files
            .iter()
            .find(|f| f.path.ends_with("mixed.py"))
            .unwrap();
        assert_eq!(entry.status, FileStatus::Flagged);
        assert!(entry.was_modified());
        assert!(entry.staged);
        assert_eq!(recorder.staged_paths().len(), 2);
        assert_eq!(
            fs::read_to_string(temp.path().join("app/mixed.py")).unwrap(),
            format!("y = 1\n{long}")
        );

        let report = pipeline.run().unwrap();
        assert_eq!(report.summary.files_fixed, 0);
        assert!(hook::should_block(&report));
        assert_eq!(recorder.staged_paths().len(), 2);
    }

    #[test]
    fn test_hook_discovers_config() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), &[("app/keep.py", "import os  # noqa\n")]);
        fs::write(
            temp.path().join("pyscrub.yaml"),
            "version: \"1.0\"\npaths:\n  directories:\n    - app\n",
        )
        .unwrap();

        let report = hook::pre_commit_run(temp.path()).unwrap();
        assert_eq!(report.summary.files_collected, 1);
        assert!(!hook::should_block(&report));
    }

    #[test]
    fn test_convenience_check_directory() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), &[("app/ok.py", "x = 1\n")]);

        let report = check_directory(temp.path()).unwrap();
        assert_eq!(report.summary.files_clean, 1);
        assert!(!hook::should_block(&report));
    }
}

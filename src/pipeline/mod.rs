//! Main scrub orchestrator
//!
//! CDD Principle: Domain Services - ScrubEngine orchestrates the scrub workflow
//! - Coordinates collection, analysis, fixing, write-back, and staging
//! - Files are processed sequentially in collection order so runs and the
//!   resulting git index are reproducible
//! - Per-file errors become Failed entries in the report and never abort
//!   the rest of the run

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::check::StyleChecker;
use crate::collect::FileCollector;
use crate::config::ScrubConfig;
use crate::domain::violations::{FileReport, FileStatus, FixStage, RunReport, ScrubResult};
use crate::fix::FixEngine;
use crate::python::{imports, SourceText};
use crate::stage::Stager;

/// Options for customizing a scrub run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Whether fixable violations are rewritten in place
    pub apply_fixes: bool,
    /// Whether rewritten files are staged in the git index
    pub stage: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            apply_fixes: true,
            stage: true,
        }
    }
}

impl RunOptions {
    /// Options for a detection-only pass that leaves files alone
    pub fn check_only() -> Self {
        Self {
            apply_fixes: false,
            stage: false,
        }
    }
}

/// Main engine that runs the scrub workflow over the configured directories
pub struct ScrubEngine {
    config: ScrubConfig,
    collector: FileCollector,
    checker: StyleChecker,
    fixer: FixEngine,
    stager: Box<dyn Stager>,
}

impl ScrubEngine {
    /// Create an engine rooted at the given directory
    pub fn new<P: AsRef<Path>>(
        root: P,
        config: ScrubConfig,
        stager: Box<dyn Stager>,
    ) -> ScrubResult<Self> {
        let collector = FileCollector::new(root, &config)?;
        Ok(Self {
            checker: StyleChecker::new(config.clone()),
            fixer: FixEngine::new(config.clone()),
            config,
            collector,
            stager,
        })
    }

    /// Run the full pipeline and report every file's outcome
    pub fn run(&self, options: &RunOptions) -> ScrubResult<RunReport> {
        let start_time = Instant::now();
        let mut report = RunReport::new();

        let files = self.collector.collect()?;
        tracing::debug!("Collected {} files", files.len());

        for path in &files {
            tracing::info!("Processing {}", path.display());
            let file_report = self.process_file(path, options);
            match file_report.status {
                FileStatus::Failed => tracing::warn!(
                    "{}: {}",
                    path.display(),
                    file_report.error.as_deref().unwrap_or("processing failed")
                ),
                _ => tracing::debug!("{}: {:?}", path.display(), file_report.status),
            }
            report.record(file_report);
        }

        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());

        Ok(report)
    }

    /// Detection-only pass over the configured directories
    pub fn check(&self) -> ScrubResult<RunReport> {
        self.run(&RunOptions::check_only())
    }

    /// Process one file through detect, fix, write-back, and staging
    ///
    /// Returns a report rather than an error so one broken file cannot stop
    /// the run. Contents are written back only when a transform changed them,
    /// which keeps clean files byte-identical on disk.
    fn process_file(&self, path: &Path, options: &RunOptions) -> FileReport {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                return FileReport::failed(
                    path.to_path_buf(),
                    format!("Failed to read file: {e}"),
                )
            }
        };

        let analysis = self.checker.analyze(path, &content);

        if !options.apply_fixes {
            return if analysis.has_violations() {
                FileReport::flagged(path.to_path_buf(), analysis.violations)
            } else {
                FileReport::clean(path.to_path_buf())
            };
        }

        let mut text = SourceText::parse(&content);
        let mut changed_by = Vec::new();

        // fix passes run only for files that reported violations, the
        // import sorter runs for every file
        if analysis.has_violations() {
            if self.fixer.cleanup(&mut text, &analysis) {
                changed_by.push(FixStage::Cleanup);
            }
            if self.fixer.layout(&mut text) {
                changed_by.push(FixStage::Layout);
            }
        }
        if imports::sort_imports(&mut text, &self.config.imports.first_party) {
            changed_by.push(FixStage::Imports);
        }

        if changed_by.is_empty() {
            return if analysis.has_violations() {
                FileReport::flagged(path.to_path_buf(), analysis.violations)
            } else {
                FileReport::clean(path.to_path_buf())
            };
        }

        if let Err(e) = fs::write(path, text.render()) {
            return FileReport::failed(path.to_path_buf(), format!("Failed to write file: {e}"));
        }

        let mut staged = false;
        if options.stage {
            if let Err(e) = self.stager.stage(path) {
                return FileReport {
                    path: path.to_path_buf(),
                    status: FileStatus::Failed,
                    violations: analysis.violations,
                    changed_by,
                    staged: false,
                    error: Some(e.to_string()),
                };
            }
            staged = true;
        }

        // re-check the rewritten contents: anything left over is beyond the
        // passes, and the file must keep blocking even though the partial
        // rewrite is already staged
        let remaining = self.checker.analyze_text(path, &text).violations;
        if remaining.is_empty() {
            FileReport::fixed(path.to_path_buf(), analysis.violations, changed_by, staged)
        } else {
            FileReport {
                path: path.to_path_buf(),
                status: FileStatus::Flagged,
                violations: remaining,
                changed_by,
                staged,
                error: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::RecordingStager;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct SharedStager(Arc<RecordingStager>);

    impl Stager for SharedStager {
        fn stage(&self, path: &Path) -> ScrubResult<()> {
            self.0.stage(path)
        }
    }

    fn engine_with_recorder(root: &Path) -> (ScrubEngine, Arc<RecordingStager>) {
        let recorder = Arc::new(RecordingStager::new());
        let engine = ScrubEngine::new(
            root,
            ScrubConfig::with_defaults(),
            Box::new(SharedStager(Arc::clone(&recorder))),
        )
        .unwrap();
        (engine, recorder)
    }

    fn write_app_file(root: &Path, name: &str, content: &str) -> PathBuf {
        let path = root.join("app").join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn setup(root: &Path) {
        fs::create_dir_all(root.join("app")).unwrap();
    }

    #[test]
    fn test_clean_file_is_left_alone() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let content = "import sys\n\nprint(sys.path)\n";
        let path = write_app_file(temp.path(), "clean.py", content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.summary.files_clean, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert!(recorder.staged_paths().is_empty());
    }

    #[test]
    fn test_messy_file_is_fixed_and_staged() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let content = "import sys\nimport os\nx = 1 \ndef f():\n    return sys.path\n";
        let path = write_app_file(temp.path(), "messy.py", content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.summary.files_fixed, 1);
        assert_eq!(report.summary.files_staged, 1);
        assert_eq!(recorder.staged_paths(), vec![path.clone()]);

        let fixed = fs::read_to_string(&path).unwrap();
        assert_eq!(fixed, "import sys\nx = 1\n\n\ndef f():\n    return sys.path\n");

        let file = &report.files[0];
        assert_eq!(file.status, FileStatus::Fixed);
        assert!(file.changed_by.contains(&FixStage::Cleanup));
        assert!(file.changed_by.contains(&FixStage::Layout));
    }

    #[test]
    fn test_detect_only_file_is_flagged_not_rewritten() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let long = format!("x = \"{}\"\n", "a".repeat(100));
        let path = write_app_file(temp.path(), "long.py", &long);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.summary.files_flagged, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), long);
        assert!(recorder.staged_paths().is_empty());
    }

    #[test]
    fn test_partially_fixable_file_stays_flagged() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let long = format!("z = \"{}\"", "a".repeat(100));
        let content = format!("y = 1 \n{long}\n");
        let path = write_app_file(temp.path(), "mixed.py", &content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        // the whitespace fix lands and is staged, the long line keeps blocking
        let file = &report.files[0];
        assert_eq!(file.status, FileStatus::Flagged);
        assert_eq!(file.changed_by, vec![FixStage::Cleanup]);
        assert!(file.staged);
        assert!(file.violations.iter().all(|v| v.code == "E501"));
        assert_eq!(report.summary.files_fixed, 0);
        assert_eq!(report.summary.files_flagged, 1);
        assert_eq!(report.summary.files_staged, 1);
        assert_eq!(recorder.staged_paths(), vec![path.clone()]);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("y = 1\n{long}\n")
        );
    }

    #[test]
    fn test_check_does_not_modify() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let content = "x = 1 \n";
        let path = write_app_file(temp.path(), "messy.py", content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.check().unwrap();

        assert_eq!(report.summary.files_flagged, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert!(recorder.staged_paths().is_empty());
    }

    #[test]
    fn test_unreadable_file_fails_without_stopping_run() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        fs::write(temp.path().join("app/bad.py"), [0x80u8, 0x81, 0x82]).unwrap();
        write_app_file(temp.path(), "good.py", "x = 1\n");

        let (engine, _) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.summary.files_failed, 1);
        assert_eq!(report.summary.files_clean, 1);
        assert!(report.has_failures());
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let content = "import os\nimport sys\nx = 1 \nprint(sys.path)\n";
        let path = write_app_file(temp.path(), "messy.py", content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        engine.run(&RunOptions::default()).unwrap();
        let after_first = fs::read_to_string(&path).unwrap();
        assert_eq!(recorder.staged_paths().len(), 1);

        let report = engine.run(&RunOptions::default()).unwrap();
        let after_second = fs::read_to_string(&path).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(report.summary.files_fixed, 0);
        assert_eq!(recorder.staged_paths().len(), 1);
    }

    #[test]
    fn test_unsorted_imports_sorted_without_other_violations() {
        let temp = TempDir::new().unwrap();
        setup(temp.path());
        let content = "import sys\nimport json\n\nprint(json.dumps(sys.path))\n";
        let path = write_app_file(temp.path(), "imports.py", content);

        let (engine, recorder) = engine_with_recorder(temp.path());
        let report = engine.run(&RunOptions::default()).unwrap();

        assert_eq!(report.summary.files_fixed, 1);
        assert_eq!(report.files[0].changed_by, vec![FixStage::Imports]);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "import json\nimport sys\n\nprint(json.dumps(sys.path))\n"
        );
        assert_eq!(recorder.staged_paths().len(), 1);
    }
}

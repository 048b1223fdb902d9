//! Staging rewritten files in the git index
//!
//! Architecture: Dependency Inversion - the pipeline talks to a Stager trait
//! - GitStager shells out to `git add` for pre-commit hook runs
//! - NoStager satisfies --no-stage and check-only invocations
//! - RecordingStager captures paths so tests can assert what was staged

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use crate::domain::violations::{ScrubError, ScrubResult};

/// Places rewritten files into the git index
pub trait Stager: Send + Sync {
    /// Stage a single file
    fn stage(&self, path: &Path) -> ScrubResult<()>;
}

/// Stages files by invoking `git add` in the repository
#[derive(Debug, Default)]
pub struct GitStager {
    /// Directory to run git from, defaults to the current directory
    work_dir: Option<PathBuf>,
}

impl GitStager {
    /// Create a stager that runs git in the current directory
    pub fn new() -> Self {
        Self { work_dir: None }
    }

    /// Create a stager that runs git in the given directory
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            work_dir: Some(dir.as_ref().to_path_buf()),
        }
    }
}

impl Stager for GitStager {
    fn stage(&self, path: &Path) -> ScrubResult<()> {
        let mut command = Command::new("git");
        command.args(["add", "--"]).arg(path);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .map_err(|e| ScrubError::stage(format!("Failed to execute git add: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScrubError::stage(format!(
                "git add failed for '{}': {}",
                path.display(),
                stderr.trim()
            )));
        }

        tracing::debug!("Staged {}", path.display());
        Ok(())
    }
}

/// Stager that leaves the index alone
#[derive(Debug, Default)]
pub struct NoStager;

impl Stager for NoStager {
    fn stage(&self, _path: &Path) -> ScrubResult<()> {
        Ok(())
    }
}

/// Stager that records the paths it was asked to stage
#[derive(Debug, Default)]
pub struct RecordingStager {
    staged: Mutex<Vec<PathBuf>>,
}

impl RecordingStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths staged so far, in call order
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.staged.lock().expect("stager lock poisoned").clone()
    }
}

impl Stager for RecordingStager {
    fn stage(&self, path: &Path) -> ScrubResult<()> {
        self.staged
            .lock()
            .expect("stager lock poisoned")
            .push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_recording_stager_captures_paths() {
        let stager = RecordingStager::new();
        stager.stage(Path::new("app/a.py")).unwrap();
        stager.stage(Path::new("app/b.py")).unwrap();
        assert_eq!(
            stager.staged_paths(),
            vec![PathBuf::from("app/a.py"), PathBuf::from("app/b.py")]
        );
    }

    #[test]
    fn test_no_stager_is_silent() {
        assert!(NoStager.stage(Path::new("anything.py")).is_ok());
    }

    #[test]
    fn test_git_stager_adds_to_index() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let init = Command::new("git")
            .args(["init", "--quiet"])
            .current_dir(root)
            .output()
            .unwrap();
        assert!(init.status.success());
        fs::write(root.join("hook.py"), "x = 1\n").unwrap();

        let stager = GitStager::in_dir(root);
        stager.stage(Path::new("hook.py")).unwrap();

        let listed = Command::new("git")
            .args(["ls-files", "--cached"])
            .current_dir(root)
            .output()
            .unwrap();
        let cached = String::from_utf8_lossy(&listed.stdout);
        assert!(cached.lines().any(|l| l == "hook.py"));
    }

    #[test]
    fn test_git_stager_reports_failure_outside_repo() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("loose.py"), "x = 1\n").unwrap();

        let stager = GitStager::in_dir(temp.path());
        let result = stager.stage(Path::new("loose.py"));
        assert!(matches!(result, Err(ScrubError::Stage { .. })));
    }
}

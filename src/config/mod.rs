//! Configuration loading and management for pyscrub
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects with defaults filled in
//! - Default configuration mirrors the classic pre-commit layout (`app/` and `tests/`)
//! - Rule toggles are validated against the static catalog before a run starts

use crate::domain::rules;
use crate::domain::violations::{ScrubError, ScrubResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names looked for in the working directory, in order
pub const DEFAULT_CONFIG_FILES: &[&str] = &["pyscrub.yaml", "pyscrub.yml", ".pyscrub.yaml"];

/// Main configuration structure for pyscrub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubConfig {
    /// Configuration format version
    pub version: String,
    /// Where to look for Python files
    #[serde(default)]
    pub paths: PathConfig,
    /// Whitespace and layout limits
    #[serde(default)]
    pub style: StyleConfig,
    /// Import classification settings
    #[serde(default)]
    pub imports: ImportConfig,
    /// Per-rule enablement overrides, keyed by rule code; absent codes stay enabled
    #[serde(default)]
    pub rules: HashMap<String, bool>,
}

/// Where the pipeline looks for Python files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Directories scanned for `.py` files, non-recursively, relative to the working directory
    pub directories: Vec<String>,
    /// Glob patterns for files to skip even when found in a scanned directory
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            directories: vec!["app".to_string(), "tests".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// Whitespace and layout limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Maximum line length for E501, measured with tabs expanded
    #[serde(default = "default_line_length")]
    pub line_length: usize,
    /// Number of columns a tab stop occupies
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    /// Maximum consecutive blank lines allowed by E303
    #[serde(default = "default_max_blank_lines")]
    pub max_blank_lines: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            line_length: default_line_length(),
            tab_width: default_tab_width(),
            max_blank_lines: default_max_blank_lines(),
        }
    }
}

/// Import classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Top-level module names treated as first-party when grouping imports
    #[serde(default = "default_first_party")]
    pub first_party: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            first_party: default_first_party(),
        }
    }
}

fn default_line_length() -> usize {
    88
}

fn default_tab_width() -> usize {
    4
}

fn default_max_blank_lines() -> usize {
    2
}

fn default_first_party() -> Vec<String> {
    vec!["app".to_string(), "tests".to_string()]
}

impl ScrubConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ScrubResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            ScrubError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            ScrubError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> ScrubResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ScrubError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathConfig::default(),
            style: StyleConfig::default(),
            imports: ImportConfig::default(),
            rules: HashMap::new(),
        }
    }

    /// Look for a configuration file in the working directory
    pub fn discover() -> Option<PathBuf> {
        Self::discover_in(".")
    }

    /// Look for a configuration file in the given directory
    pub fn discover_in<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|candidate| candidate.exists())
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> ScrubResult<()> {
        // Check version compatibility
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(ScrubError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        if self.paths.directories.is_empty() {
            return Err(ScrubError::config(
                "At least one directory must be configured under 'paths.directories'",
            ));
        }

        for directory in &self.paths.directories {
            if directory.is_empty() {
                return Err(ScrubError::config("Directory names must not be empty"));
            }
            if Path::new(directory).is_absolute() {
                return Err(ScrubError::config(format!(
                    "Directory '{directory}' must be relative to the working directory"
                )));
            }
        }

        // Validate exclude globs can compile
        for pattern in &self.paths.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                ScrubError::config(format!("Invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        if self.style.line_length < 40 {
            return Err(ScrubError::config(format!(
                "line_length {} is too small; the minimum is 40",
                self.style.line_length
            )));
        }

        if !(1..=16).contains(&self.style.tab_width) {
            return Err(ScrubError::config(format!(
                "tab_width {} is out of range; expected 1..=16",
                self.style.tab_width
            )));
        }

        if self.style.max_blank_lines == 0 {
            return Err(ScrubError::config(
                "max_blank_lines must be at least 1",
            ));
        }

        // Rule toggles must name catalog rules, otherwise a typo would silently
        // leave the intended rule enabled
        for code in self.rules.keys() {
            if !rules::is_known_code(code) {
                return Err(ScrubError::config(format!(
                    "Unknown rule code '{code}' in rules section"
                )));
            }
        }

        Ok(())
    }

    /// Whether a rule is enabled under this configuration
    pub fn rule_enabled(&self, code: &str) -> bool {
        self.rules.get(code).copied().unwrap_or(true)
    }

    /// Iterate over the catalog rules this configuration keeps enabled
    pub fn enabled_rules(&self) -> impl Iterator<Item = &'static rules::RuleSpec> + '_ {
        rules::RULES
            .iter()
            .filter(|spec| self.rule_enabled(spec.code))
    }

    /// Create a fingerprint of the configuration for report metadata
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.version.hash(&mut hasher);
        for directory in &self.paths.directories {
            directory.hash(&mut hasher);
        }
        for pattern in &self.paths.exclude {
            pattern.hash(&mut hasher);
        }
        self.style.line_length.hash(&mut hasher);
        self.style.tab_width.hash(&mut hasher);
        self.style.max_blank_lines.hash(&mut hasher);
        for name in &self.imports.first_party {
            name.hash(&mut hasher);
        }

        // Sort rule toggles to ensure consistent ordering
        let mut toggles: Vec<_> = self.rules.iter().collect();
        toggles.sort_by_key(|(code, _)| code.as_str());
        for (code, enabled) in toggles {
            code.hash(&mut hasher);
            enabled.hash(&mut hasher);
        }

        format!("{:x}", hasher.finish())
    }
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: ScrubConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ScrubConfig::default(),
        }
    }

    /// Replace the scanned directories
    pub fn directories<I, S>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.paths.directories = directories.into_iter().map(Into::into).collect();
        self
    }

    /// Add an exclude glob pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.exclude.push(pattern.into());
        self
    }

    /// Set the E501 line length limit
    pub fn line_length(mut self, limit: usize) -> Self {
        self.config.style.line_length = limit;
        self
    }

    /// Set the tab stop width
    pub fn tab_width(mut self, width: usize) -> Self {
        self.config.style.tab_width = width;
        self
    }

    /// Set the E303 blank line limit
    pub fn max_blank_lines(mut self, limit: usize) -> Self {
        self.config.style.max_blank_lines = limit;
        self
    }

    /// Replace the first-party module names used for import grouping
    pub fn first_party<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.imports.first_party = names.into_iter().map(Into::into).collect();
        self
    }

    /// Disable a rule by code
    pub fn disable_rule(mut self, code: impl Into<String>) -> Self {
        self.config.rules.insert(code.into(), false);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ScrubResult<ScrubConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

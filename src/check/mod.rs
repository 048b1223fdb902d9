//! Style rule checks over Python source lines
//!
//! Architecture: Strategy Pattern - Each rule family is a focused scan over
//! shared lexical facts
//! - Physical checks look at one line at a time (whitespace, tabs, length)
//! - Blank-line checks reason about definition headers and blank runs
//! - Import checks reuse the import block parser so detection and rewriting
//!   can never disagree about what the block contains
//!
//! Detection happens on the original contents, before any transform runs, so
//! reported line numbers always refer to the file as the author last saw it.

use std::path::Path;

use crate::config::ScrubConfig;
use crate::domain::rules;
use crate::domain::violations::{Severity, Violation};
use crate::python::{self, imports, LineFacts, Noqa, SourceText};

/// Everything the checker learned about one file
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    /// Violations in position order, `# noqa` suppressions already applied
    pub violations: Vec<Violation>,
    /// Unused import bindings by physical line, F401 suppressions applied
    pub unused_imports: Vec<(usize, Vec<String>)>,
}

impl FileAnalysis {
    /// Whether any violation survived suppression
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Line-based style checker configured with rule toggles and limits
pub struct StyleChecker {
    config: ScrubConfig,
}

impl StyleChecker {
    /// Create a checker for the given configuration
    pub fn new(config: ScrubConfig) -> Self {
        Self { config }
    }

    /// Analyze one file's contents
    pub fn analyze(&self, path: &Path, content: &str) -> FileAnalysis {
        let text = SourceText::parse(content);
        self.analyze_text(path, &text)
    }

    /// Analyze already-split source text
    pub fn analyze_text(&self, path: &Path, text: &SourceText) -> FileAnalysis {
        let lines = &text.lines;
        let facts = python::scan_lines(lines);
        let noqa: Vec<Noqa> = lines
            .iter()
            .zip(&facts)
            .map(|(line, f)| python::parse_noqa(line, f))
            .collect();

        let mut violations: Vec<Violation> = Vec::new();
        self.check_physical(path, lines, &facts, &mut violations);
        self.check_blank_lines(path, lines, &facts, &mut violations);
        self.check_eof(path, text, &facts, &mut violations);
        let unused_imports = self.check_imports(path, lines, &facts, &noqa, &mut violations);

        violations.retain(|v| {
            let idx = (v.line as usize).saturating_sub(1);
            noqa.get(idx).map_or(true, |n| !n.suppresses(&v.code))
        });
        violations.sort_by(|a, b| {
            a.line
                .cmp(&b.line)
                .then_with(|| a.column.unwrap_or(0).cmp(&b.column.unwrap_or(0)))
                .then_with(|| a.code.cmp(&b.code))
        });

        tracing::debug!(
            "Checked {}: {} violation(s)",
            path.display(),
            violations.len()
        );

        FileAnalysis {
            violations,
            unused_imports,
        }
    }

    fn enabled(&self, code: &str) -> bool {
        self.config.rule_enabled(code)
    }

    fn violation(
        &self,
        code: &str,
        path: &Path,
        line: u32,
        message: impl Into<String>,
    ) -> Violation {
        let severity = rules::rule(code)
            .map(|spec| spec.severity)
            .unwrap_or(Severity::Error);
        Violation::new(code, severity, path.to_path_buf(), line, message)
    }

    fn check_physical(
        &self,
        path: &Path,
        lines: &[String],
        facts: &[LineFacts],
        out: &mut Vec<Violation>,
    ) {
        let limit = self.config.style.line_length;
        let tab = self.config.style.tab_width;

        for (i, line) in lines.iter().enumerate() {
            let n = (i + 1) as u32;
            let blank = python::is_blank(line);

            if self.enabled("W191") && !blank && !facts[i].in_string {
                if let Some(pos) = leading_tab_position(line) {
                    out.push(
                        self.violation("W191", path, n, "indentation contains tabs")
                            .with_column((pos + 1) as u32)
                            .with_context(line.trim_end()),
                    );
                }
            }

            if blank {
                if self.enabled("W293") && !line.is_empty() {
                    out.push(
                        self.violation("W293", path, n, "whitespace on blank line").with_column(1),
                    );
                }
            } else if self.enabled("W291") && line.ends_with([' ', '\t']) {
                let col = line.trim_end().chars().count() + 1;
                out.push(
                    self.violation("W291", path, n, "trailing whitespace")
                        .with_column(col as u32)
                        .with_context(line.trim_end()),
                );
            }

            if self.enabled("E501") {
                let width = python::expanded_width(line, tab);
                if width > limit {
                    out.push(
                        self.violation(
                            "E501",
                            path,
                            n,
                            format!("line too long ({width} > {limit} characters)"),
                        )
                        .with_column((limit + 1) as u32)
                        .with_context(line.trim_end()),
                    );
                }
            }
        }
    }

    fn check_blank_lines(
        &self,
        path: &Path,
        lines: &[String],
        facts: &[LineFacts],
        out: &mut Vec<Violation>,
    ) {
        let tab = self.config.style.tab_width;
        let max_blank = self.config.style.max_blank_lines;

        if self.enabled("E301") || self.enabled("E302") {
            for start in python::find_block_starts(lines, facts, tab) {
                let n = (start.def_line + 1) as u32;
                let context = lines[start.def_line].trim_end();
                if start.top_level {
                    if self.enabled("E302")
                        && start.has_preceding_code
                        && start.blanks_above < 2
                    {
                        out.push(
                            self.violation(
                                "E302",
                                path,
                                n,
                                format!("expected 2 blank lines, got {}", start.blanks_above),
                            )
                            .with_column(1)
                            .with_context(context),
                        );
                    }
                } else if self.enabled("E301")
                    && start.blanks_above == 0
                    && !start.after_block_open
                    && start.has_preceding_code
                {
                    out.push(
                        self.violation("E301", path, n, "expected 1 blank line, got 0")
                            .with_column(1)
                            .with_context(context),
                    );
                }
            }
        }

        if self.enabled("E303") {
            let mut run = 0usize;
            for (i, line) in lines.iter().enumerate() {
                if facts[i].in_string {
                    run = 0;
                    continue;
                }
                if python::is_blank(line) {
                    run += 1;
                    continue;
                }
                if run > max_blank {
                    out.push(
                        self.violation(
                            "E303",
                            path,
                            (i + 1) as u32,
                            format!("too many blank lines ({run})"),
                        )
                        .with_column(1)
                        .with_context(line.trim_end()),
                    );
                }
                run = 0;
            }
            // a trailing blank run belongs to W391
        }
    }

    fn check_eof(
        &self,
        path: &Path,
        text: &SourceText,
        facts: &[LineFacts],
        out: &mut Vec<Violation>,
    ) {
        if text.is_empty() {
            return;
        }
        let last = text.lines.len() - 1;
        let n = (last + 1) as u32;

        if self.enabled("W292") && !text.final_newline {
            let col = text.lines[last].chars().count() + 1;
            out.push(
                self.violation("W292", path, n, "no newline at end of file")
                    .with_column(col as u32),
            );
        }

        if self.enabled("W391") && python::is_blank(&text.lines[last]) && !facts[last].in_string {
            out.push(
                self.violation("W391", path, n, "blank line at end of file").with_column(1),
            );
        }
    }

    fn check_imports(
        &self,
        path: &Path,
        lines: &[String],
        facts: &[LineFacts],
        noqa: &[Noqa],
        out: &mut Vec<Violation>,
    ) -> Vec<(usize, Vec<String>)> {
        let Some(block) = imports::find_file_block(lines, facts) else {
            return Vec::new();
        };

        if self.enabled("E401") {
            for stmt in &block.statements {
                if let imports::ImportKind::Plain { modules } = &stmt.kind {
                    if modules.len() > 1 {
                        let line = &lines[stmt.line_index];
                        let mut violation = self
                            .violation(
                                "E401",
                                path,
                                (stmt.line_index + 1) as u32,
                                "multiple imports on one line",
                            )
                            .with_context(line.trim_end());
                        if let Some(idx) = line.find(',') {
                            violation =
                                violation.with_column((line[..idx].chars().count() + 1) as u32);
                        }
                        out.push(violation);
                    }
                }
            }
        }

        if self.enabled("I001") {
            let normalized =
                imports::normalized_lines(&block, &self.config.imports.first_party);
            if lines[block.start..block.end] != normalized[..] {
                out.push(
                    self.violation(
                        "I001",
                        path,
                        (block.start + 1) as u32,
                        "import block is un-sorted or un-formatted",
                    )
                    .with_column(1),
                );
            }
        }

        let mut unused = Vec::new();
        if self.enabled("F401") {
            for (line_idx, names) in imports::unused_bindings(lines, &block) {
                if noqa.get(line_idx).map_or(false, |n| n.suppresses("F401")) {
                    continue;
                }
                for name in &names {
                    out.push(
                        self.violation(
                            "F401",
                            path,
                            (line_idx + 1) as u32,
                            format!("'{name}' imported but unused"),
                        )
                        .with_column(1)
                        .with_context(lines[line_idx].trim_end()),
                    );
                }
                unused.push((line_idx, names));
            }
        }
        unused
    }
}

fn leading_tab_position(line: &str) -> Option<usize> {
    for (idx, ch) in line.chars().enumerate() {
        match ch {
            '\t' => return Some(idx),
            ' ' => continue,
            _ => return None,
        }
    }
    None
}

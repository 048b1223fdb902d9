//! Content transforms that resolve fixable violations
//!
//! Architecture: Pipes and Filters - Two ordered passes rewrite file contents
//! - The cleanup pass edits within lines (whitespace, tabs) and removes
//!   unused imports, working on the same line numbering the analysis used
//! - The layout pass renumbers lines (blank runs, end of file), so it always
//!   runs after cleanup
//!
//! Both passes are no-ops on content that is already in canonical form, and
//! neither ever lengthens a line, so repeated application converges.

use std::collections::HashMap;

use crate::check::FileAnalysis;
use crate::config::ScrubConfig;
use crate::python::{self, imports, Noqa, SourceText};

/// Rewrites file contents to resolve the fixable violation classes
pub struct FixEngine {
    config: ScrubConfig,
}

impl FixEngine {
    /// Create a fix engine for the given configuration
    pub fn new(config: ScrubConfig) -> Self {
        Self { config }
    }

    /// Whitespace scrubbing and unused-import removal
    ///
    /// `analysis` must come from the same contents `text` was parsed from:
    /// unused-import line indices are resolved against the current lines.
    /// Within-line edits happen first, then whole-line removals, so every
    /// index stays valid throughout the pass.
    pub fn cleanup(&self, text: &mut SourceText, analysis: &FileAnalysis) -> bool {
        let mut changed = false;
        let facts = python::scan_lines(&text.lines);
        let noqa: Vec<Noqa> = text
            .lines
            .iter()
            .zip(&facts)
            .map(|(line, f)| python::parse_noqa(line, f))
            .collect();

        let tab = self.config.style.tab_width;
        let fix_tabs = self.config.rule_enabled("W191");
        let fix_trailing = self.config.rule_enabled("W291");
        let fix_blank_ws = self.config.rule_enabled("W293");

        for (i, line) in text.lines.iter_mut().enumerate() {
            if python::is_blank(line) {
                if fix_blank_ws && !line.is_empty() {
                    line.clear();
                    changed = true;
                }
                continue;
            }
            if fix_tabs
                && !facts[i].in_string
                && has_leading_tab(line)
                && !noqa[i].suppresses("W191")
            {
                *line = python::expand_leading_tabs(line, tab);
                changed = true;
            }
            if fix_trailing && line.ends_with([' ', '\t']) && !noqa[i].suppresses("W291") {
                // trimming the tail never moves a comment start, so the
                // precomputed facts stay valid for the import edits below
                *line = line.trim_end().to_string();
                changed = true;
            }
        }

        if self.config.rule_enabled("F401") && !analysis.unused_imports.is_empty() {
            let mut removals: Vec<usize> = Vec::new();
            for (idx, names) in &analysis.unused_imports {
                let i = *idx;
                if i >= text.lines.len() {
                    continue;
                }
                match imports::rewrite_without(&text.lines[i], &facts[i], names) {
                    imports::LineEdit::Keep => {}
                    imports::LineEdit::Replace(new_line) => {
                        text.lines[i] = new_line;
                        changed = true;
                    }
                    imports::LineEdit::Remove => removals.push(i),
                }
            }
            for i in removals.into_iter().rev() {
                text.lines.remove(i);
                changed = true;
            }
        }

        changed
    }

    /// Blank-line layout and end-of-file normalization
    pub fn layout(&self, text: &mut SourceText) -> bool {
        let mut changed = false;
        let facts = python::scan_lines(&text.lines);
        let noqa: Vec<Noqa> = text
            .lines
            .iter()
            .zip(&facts)
            .map(|(line, f)| python::parse_noqa(line, f))
            .collect();

        let tab = self.config.style.tab_width;
        let max_blank = self.config.style.max_blank_lines;
        let fix_e301 = self.config.rule_enabled("E301");
        let fix_e302 = self.config.rule_enabled("E302");
        let fix_e303 = self.config.rule_enabled("E303");
        let fix_w391 = self.config.rule_enabled("W391");
        let fix_w292 = self.config.rule_enabled("W292");

        // minimum blank lines required before each definition anchor
        let mut required: HashMap<usize, usize> = HashMap::new();
        for start in python::find_block_starts(&text.lines, &facts, tab) {
            if !start.has_preceding_code {
                continue;
            }
            if start.top_level {
                if fix_e302 && !noqa[start.def_line].suppresses("E302") {
                    required.insert(start.anchor_line, 2);
                }
            } else if fix_e301
                && !start.after_block_open
                && !noqa[start.def_line].suppresses("E301")
            {
                required.insert(start.anchor_line, 1);
            }
        }

        let lines_in = std::mem::take(&mut text.lines);
        let mut out: Vec<String> = Vec::with_capacity(lines_in.len());
        let mut pending: Vec<String> = Vec::new();

        for (i, line) in lines_in.into_iter().enumerate() {
            if facts[i].in_string {
                out.append(&mut pending);
                out.push(line);
                continue;
            }
            if python::is_blank(&line) {
                pending.push(line);
                continue;
            }

            let existing = pending.len();
            let floor = required.get(&i).copied().unwrap_or(0);
            let mut n = existing.max(floor);
            if fix_e303 {
                n = n.min(max_blank.max(floor));
            }
            if n < existing && noqa[i].suppresses("E303") {
                n = existing;
            }
            if n != existing {
                changed = true;
            }
            if n <= existing {
                pending.truncate(n);
                out.append(&mut pending);
            } else {
                out.append(&mut pending);
                for _ in existing..n {
                    out.push(String::new());
                }
            }
            out.push(line);
        }

        if fix_w391 {
            if !pending.is_empty() {
                changed = true;
            }
        } else {
            out.append(&mut pending);
        }
        text.lines = out;

        // the suppression lives on the original last line, the one that
        // actually lacked the terminator
        let w292_suppressed = noqa.last().map_or(false, |n| n.suppresses("W292"));
        if fix_w292 && !text.lines.is_empty() && !text.final_newline && !w292_suppressed {
            text.final_newline = true;
            changed = true;
        }

        changed
    }
}

fn has_leading_tab(line: &str) -> bool {
    for ch in line.chars() {
        match ch {
            '\t' => return true,
            ' ' => continue,
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::StyleChecker;
    use crate::config::ConfigBuilder;
    use std::path::Path;

    fn engine() -> FixEngine {
        FixEngine::new(ScrubConfig::with_defaults())
    }

    fn analyzed(content: &str) -> FileAnalysis {
        StyleChecker::new(ScrubConfig::with_defaults()).analyze(Path::new("m.py"), content)
    }

    fn fix_all(content: &str) -> String {
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        engine.cleanup(&mut text, &analysis);
        engine.layout(&mut text);
        text.render()
    }

    #[test]
    fn test_cleanup_whitespace() {
        let content = "def f():\n\treturn 1 \n   \n";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        assert!(engine.cleanup(&mut text, &analysis));
        assert_eq!(text.lines, vec!["def f():", "    return 1", ""]);
    }

    #[test]
    fn test_cleanup_removes_unused_imports() {
        let content = "import os\nimport sys, json\n\nprint(sys.path)\n";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        assert!(engine.cleanup(&mut text, &analysis));
        assert_eq!(text.render(), "import sys\n\nprint(sys.path)\n");
    }

    #[test]
    fn test_cleanup_keeps_noqa_imports() {
        let content = "import os  # noqa: F401\n";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        assert!(!engine.cleanup(&mut text, &analysis));
        assert_eq!(text.render(), content);
    }

    #[test]
    fn test_cleanup_preserves_string_indentation() {
        let content = "doc = \"\"\"\n\tliteral tab\n\"\"\"\n";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        engine.cleanup(&mut text, &analysis);
        assert_eq!(text.lines[1], "\tliteral tab");
    }

    #[test]
    fn test_layout_inserts_top_level_blanks() {
        assert_eq!(
            fix_all("x = 1\ndef f():\n    return x\n"),
            "x = 1\n\n\ndef f():\n    return x\n"
        );
    }

    #[test]
    fn test_layout_inserts_nested_blank() {
        assert_eq!(
            fix_all("class A:\n    def f(self):\n        pass\n    def g(self):\n        pass\n"),
            "class A:\n    def f(self):\n        pass\n\n    def g(self):\n        pass\n"
        );
    }

    #[test]
    fn test_layout_collapses_blank_runs() {
        assert_eq!(fix_all("x = 1\n\n\n\n\ny = 2\n"), "x = 1\n\ny = 2\n");
    }

    #[test]
    fn test_layout_fixes_eof() {
        assert_eq!(fix_all("x = 1"), "x = 1\n");
        assert_eq!(fix_all("x = 1\n\n\n"), "x = 1\n");
    }

    #[test]
    fn test_layout_keeps_blanks_inside_docstring() {
        let content = "DOC = \"\"\"\na\n\n\n\n\nb\n\"\"\"\nx = DOC\n";
        assert_eq!(fix_all(content), content);
    }

    #[test]
    fn test_canonical_content_unchanged() {
        let content = "\
import os
import sys


def main():
    print(os.sep, sys.path)


class App:
    def run(self):
        return main()
";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        assert!(!engine.cleanup(&mut text, &analysis));
        assert!(!engine.layout(&mut text));
        assert_eq!(text.render(), content);
    }

    #[test]
    fn test_fixes_converge() {
        let messy = "import os\nx = 1 \ndef f():\n\treturn x\n\n\n\n";
        let once = fix_all(&messy);
        let twice = fix_all(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_recheck_after_fixes_finds_nothing_fixable() {
        let messy = "import os\nimport sys, json\nx = 1 \ndef f():\n\treturn sys.path, json\n";
        let before = analyzed(messy);
        assert!(before.has_violations());

        let engine = engine();
        let mut text = SourceText::parse(messy);
        engine.cleanup(&mut text, &before);
        engine.layout(&mut text);
        imports::sort_imports(&mut text, &[]);

        let after = analyzed(&text.render());
        assert!(after.violations.len() <= before.violations.len());
        assert!(after.violations.iter().all(|v| v.code == "E501"));
    }

    #[test]
    fn test_sorting_never_widens_import_lines() {
        // both lines sit exactly at the length limit, so any widening
        // during the rewrite would mint fresh E501s
        let limit = ScrubConfig::with_defaults().style.line_length;
        let sys_line = format!("import sys # {}", "x".repeat(limit - "import sys # ".len()));
        let os_line = format!("import os # {}", "x".repeat(limit - "import os # ".len()));
        assert_eq!(sys_line.len(), limit);
        assert_eq!(os_line.len(), limit);
        let content = format!("{sys_line}\n{os_line}\n\nprint(os, sys)\n");

        let before = analyzed(&content);
        assert_eq!(before.violations.len(), 1);
        assert_eq!(before.violations[0].code, "I001");

        let mut text = SourceText::parse(&content);
        assert!(imports::sort_imports(&mut text, &[]));
        let rendered = text.render();
        assert!(rendered.lines().all(|line| line.len() <= limit));

        let after = analyzed(&rendered);
        assert!(after.violations.len() <= before.violations.len());
        assert!(after.violations.is_empty());
    }

    #[test]
    fn test_disabled_rules_not_fixed() {
        let config = ConfigBuilder::new()
            .disable_rule("W191")
            .disable_rule("W291")
            .build()
            .unwrap();
        let engine = FixEngine::new(config.clone());
        let content = "if True:\n\tx = 1 \n";
        let analysis = StyleChecker::new(config).analyze(Path::new("m.py"), content);
        let mut text = SourceText::parse(content);
        engine.cleanup(&mut text, &analysis);
        assert_eq!(text.lines[1], "\tx = 1 ");
    }

    #[test]
    fn test_crlf_preserved_through_fixes() {
        let content = "x = 1 \r\ny = 2\r\n";
        let engine = engine();
        let analysis = analyzed(content);
        let mut text = SourceText::parse(content);
        assert!(engine.cleanup(&mut text, &analysis));
        assert_eq!(text.render(), "x = 1\r\ny = 2\r\n");
    }

    #[test]
    fn test_mixed_endings_rewritten_in_dominant_style() {
        let engine = engine();

        let mostly_lf = "x = 1 \r\ny = 2\nz = 3\n";
        let analysis = analyzed(mostly_lf);
        let mut text = SourceText::parse(mostly_lf);
        assert!(engine.cleanup(&mut text, &analysis));
        assert_eq!(text.render(), "x = 1\ny = 2\nz = 3\n");

        let mostly_crlf = "a = 1 \r\nb = 2\r\nc = 3\n";
        let analysis = analyzed(mostly_crlf);
        let mut text = SourceText::parse(mostly_crlf);
        assert!(engine.cleanup(&mut text, &analysis));
        assert_eq!(text.render(), "a = 1\r\nb = 2\r\nc = 3\r\n");
    }
}

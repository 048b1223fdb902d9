//! Physical-line model of Python source files
//!
//! Architecture: Shared Kernel - One lexical scan feeds every rule and transform
//! - Files are modeled as physical lines plus their original newline style
//! - A single forward scan classifies lines (inside string, continuation, comment)
//! - The checker and the fixers consume the same facts so they never disagree
//!   about what a blank line or a definition header is

use lazy_static::lazy_static;
use regex::Regex;

pub mod imports;

lazy_static! {
    static ref NOQA_RE: Regex =
        Regex::new(r"(?i)#\s*noqa(?::\s*(?P<codes>[A-Z]+[0-9]+(?:[,\s]+[A-Z]+[0-9]+)*))?")
            .expect("noqa regex is valid");
    static ref ENCODING_RE: Regex =
        Regex::new(r"^[ \t]*#.*coding[:=][ \t]*[-_.a-zA-Z0-9]+").expect("encoding regex is valid");
    static ref STRING_OPEN_RE: Regex =
        Regex::new(r#"(?i)^[rbuf]{0,3}["']"#).expect("string open regex is valid");
}

/// Line ending style of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    /// Unix `\n`
    Lf,
    /// Windows `\r\n`
    CrLf,
}

impl Newline {
    /// The literal line terminator
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Detect the dominant style, breaking ties toward the first break seen
    ///
    /// Files with mixed endings are normalized to whichever style the
    /// majority of their lines use, defaulting to LF when there is none.
    pub fn detect(content: &str) -> Self {
        let bytes = content.as_bytes();
        let mut lf = 0usize;
        let mut crlf = 0usize;
        let mut first = None;
        for (idx, &byte) in bytes.iter().enumerate() {
            if byte != b'\n' {
                continue;
            }
            let style = if idx > 0 && bytes[idx - 1] == b'\r' {
                Self::CrLf
            } else {
                Self::Lf
            };
            match style {
                Self::Lf => lf += 1,
                Self::CrLf => crlf += 1,
            }
            if first.is_none() {
                first = Some(style);
            }
        }
        if crlf > lf {
            Self::CrLf
        } else if lf > crlf {
            Self::Lf
        } else {
            first.unwrap_or(Self::Lf)
        }
    }
}

/// A source file split into physical lines, remembering how to put it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// Physical lines without terminators
    pub lines: Vec<String>,
    /// Line ending style used when rendering
    pub newline: Newline,
    /// Whether the file ended with a line terminator
    pub final_newline: bool,
}

impl SourceText {
    /// Split file contents into lines, capturing the newline style
    pub fn parse(content: &str) -> Self {
        let newline = Newline::detect(content);
        let final_newline = content.ends_with('\n');
        let mut lines: Vec<String> = if content.is_empty() {
            Vec::new()
        } else {
            content
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };
        if final_newline {
            // split leaves one empty element after the last terminator
            lines.pop();
        }
        Self {
            lines,
            newline,
            final_newline,
        }
    }

    /// Reassemble file contents from the lines
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join(self.newline.as_str());
        if self.final_newline {
            out.push_str(self.newline.as_str());
        }
        out
    }

    /// Whether the file has no lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Lexical facts about one physical line, produced by [`scan_lines`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFacts {
    /// Line begins inside an unclosed triple-quoted string
    pub in_string: bool,
    /// Line begins inside unclosed brackets or after a backslash continuation
    pub in_continuation: bool,
    /// Byte offset of a `#` comment on this line, outside any string
    pub comment_start: Option<usize>,
}

const TRIPLE_DQ: &[u8] = b"\"\"\"";
const TRIPLE_SQ: &[u8] = b"'''";

/// Scan all lines once, tracking string, bracket, and continuation state
///
/// The scan is byte-wise and only ever matches ASCII delimiters, so it is
/// safe on arbitrary UTF-8 content. Raw-string escape rules are approximated,
/// which matches what line-based style checkers tolerate.
pub fn scan_lines(lines: &[String]) -> Vec<LineFacts> {
    let mut facts = Vec::with_capacity(lines.len());
    let mut string_delim: Option<&'static [u8]> = None;
    let mut bracket_depth: usize = 0;
    let mut backslash = false;

    for line in lines {
        let in_string = string_delim.is_some();
        let in_continuation = bracket_depth > 0 || backslash;
        backslash = false;
        let mut comment_start = None;

        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(delim) = string_delim {
                if bytes[i] == b'\\' {
                    i += 2;
                } else if bytes[i..].starts_with(delim) {
                    string_delim = None;
                    i += delim.len();
                } else {
                    i += 1;
                }
                continue;
            }
            match bytes[i] {
                b'#' => {
                    comment_start = Some(i);
                    i = bytes.len();
                }
                b'(' | b'[' | b'{' => {
                    bracket_depth += 1;
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    bracket_depth = bracket_depth.saturating_sub(1);
                    i += 1;
                }
                quote @ (b'\'' | b'"') => {
                    let triple: &'static [u8] = if quote == b'"' { TRIPLE_DQ } else { TRIPLE_SQ };
                    if bytes[i..].starts_with(triple) {
                        match find_triple_close(&bytes[i + 3..], triple) {
                            Some(rel) => i += 3 + rel + 3,
                            None => {
                                string_delim = Some(triple);
                                i = bytes.len();
                            }
                        }
                    } else {
                        i += 1;
                        while i < bytes.len() {
                            if bytes[i] == b'\\' {
                                i += 2;
                            } else if bytes[i] == quote {
                                i += 1;
                                break;
                            } else {
                                i += 1;
                            }
                        }
                    }
                }
                b'\\' if i + 1 == bytes.len() => {
                    backslash = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        facts.push(LineFacts {
            in_string,
            in_continuation,
            comment_start,
        });
    }
    facts
}

fn find_triple_close(bytes: &[u8], delim: &[u8]) -> Option<usize> {
    let mut j = 0;
    while j < bytes.len() {
        if bytes[j] == b'\\' {
            j += 2;
        } else if bytes[j..].starts_with(delim) {
            return Some(j);
        } else {
            j += 1;
        }
    }
    None
}

/// Suppression parsed from a trailing `# noqa` comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Noqa {
    /// No suppression on this line
    None,
    /// Bare `# noqa`, suppresses every rule
    All,
    /// `# noqa: CODE[,CODE...]`, suppresses only the listed codes
    Codes(Vec<String>),
}

impl Noqa {
    /// Whether this suppression covers the given rule code
    pub fn suppresses(&self, code: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Codes(codes) => codes.iter().any(|c| c == code),
        }
    }
}

/// Parse any `# noqa` suppression from a line's trailing comment
pub fn parse_noqa(line: &str, facts: &LineFacts) -> Noqa {
    let Some(idx) = facts.comment_start else {
        return Noqa::None;
    };
    let comment = &line[idx..];
    match NOQA_RE.captures(comment) {
        None => Noqa::None,
        Some(caps) => match caps.name("codes") {
            None => Noqa::All,
            Some(m) => Noqa::Codes(
                m.as_str()
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_uppercase())
                    .collect(),
            ),
        },
    }
}

/// Whether a line contains nothing but whitespace
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Leading whitespace width with tabs expanded to the next tab stop
pub fn indent_width(line: &str, tab_width: usize) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += tab_width - (width % tab_width),
            _ => break,
        }
    }
    width
}

/// Display width of a whole line with tabs expanded to the next tab stop
pub fn expanded_width(line: &str, tab_width: usize) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        if ch == '\t' {
            width += tab_width - (width % tab_width);
        } else {
            width += 1;
        }
    }
    width
}

/// Expand leading tabs to spaces, leaving the rest of the line untouched
pub fn expand_leading_tabs(line: &str, tab_width: usize) -> String {
    let mut width = 0usize;
    let mut out = String::with_capacity(line.len());
    let mut cut = line.len();
    for (idx, ch) in line.char_indices() {
        match ch {
            ' ' => {
                width += 1;
                out.push(' ');
            }
            '\t' => {
                let pad = tab_width - (width % tab_width);
                width += pad;
                for _ in 0..pad {
                    out.push(' ');
                }
            }
            _ => {
                cut = idx;
                break;
            }
        }
    }
    out.push_str(&line[cut..]);
    out
}

/// A `def`, `async def`, or `class` header together with its attached
/// decorator and comment run
#[derive(Debug, Clone, Copy)]
pub struct BlockStart {
    /// Line index of the header keyword
    pub def_line: usize,
    /// Topmost attached decorator or comment line, equal to `def_line` when bare
    pub anchor_line: usize,
    /// Header sits at indentation zero
    pub top_level: bool,
    /// The nearest line above opens the enclosing suite
    pub after_block_open: bool,
    /// Blank lines directly above the anchor
    pub blanks_above: usize,
    /// Whether anything precedes the anchor in the file
    pub has_preceding_code: bool,
}

/// Locate every definition header and its blank-line context
///
/// Decorators and comments sitting directly above a header at the same
/// indentation travel with it, so blank lines are counted above the whole run.
pub fn find_block_starts(
    lines: &[String],
    facts: &[LineFacts],
    tab_width: usize,
) -> Vec<BlockStart> {
    let mut starts = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if facts[i].in_string || facts[i].in_continuation {
            continue;
        }
        let stripped = line.trim_start();
        if !is_definition_header(stripped) {
            continue;
        }
        let indent = indent_width(line, tab_width);

        let mut anchor = i;
        while anchor > 0 {
            let j = anchor - 1;
            if facts[j].in_string || facts[j].in_continuation || is_blank(&lines[j]) {
                break;
            }
            let s = lines[j].trim_start();
            if (s.starts_with('@') || s.starts_with('#'))
                && indent_width(&lines[j], tab_width) == indent
            {
                anchor = j;
            } else {
                break;
            }
        }

        let mut blanks = 0;
        let mut k = anchor;
        while k > 0 && !facts[k - 1].in_string && is_blank(&lines[k - 1]) {
            blanks += 1;
            k -= 1;
        }

        let (has_preceding_code, after_block_open) = match k.checked_sub(1) {
            None => (false, false),
            Some(p) => (true, indent_width(&lines[p], tab_width) < indent),
        };

        starts.push(BlockStart {
            def_line: i,
            anchor_line: anchor,
            top_level: indent == 0,
            after_block_open,
            blanks_above: blanks,
            has_preceding_code,
        });
    }
    starts
}

fn is_definition_header(stripped: &str) -> bool {
    stripped.starts_with("def ")
        || stripped.starts_with("async def ")
        || stripped.starts_with("class ")
}

/// Index of the first line after the module prologue (shebang, encoding
/// comment, module docstring)
pub fn prologue_end(lines: &[String], facts: &[LineFacts]) -> usize {
    let mut i = 0;
    if i < lines.len() && lines[i].starts_with("#!") {
        i += 1;
    }
    if i < lines.len() && facts[i].comment_start.is_some() && ENCODING_RE.is_match(&lines[i]) {
        i += 1;
    }

    let mut j = i;
    while j < lines.len() && is_blank(&lines[j]) {
        j += 1;
    }
    if j < lines.len()
        && !facts[j].in_string
        && !facts[j].in_continuation
        && indent_width(&lines[j], 4) == 0
        && STRING_OPEN_RE.is_match(lines[j].trim_start())
    {
        // module docstring: runs until the first line that starts outside it
        let mut k = j + 1;
        while k < lines.len() && facts[k].in_string {
            k += 1;
        }
        return k;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_lines(content: &str) -> Vec<String> {
        SourceText::parse(content).lines
    }

    #[test]
    fn test_newline_detection() {
        assert_eq!(Newline::detect("a\nb\n"), Newline::Lf);
        assert_eq!(Newline::detect("a\r\nb\r\n"), Newline::CrLf);
        assert_eq!(Newline::detect("no breaks"), Newline::Lf);
    }

    #[test]
    fn test_newline_detection_mixed_endings() {
        // majority rules, the first break only settles exact ties
        assert_eq!(Newline::detect("a\r\nb\nc\n"), Newline::Lf);
        assert_eq!(Newline::detect("a\nb\r\nc\r\n"), Newline::CrLf);
        assert_eq!(Newline::detect("a\r\nb\n"), Newline::CrLf);
        assert_eq!(Newline::detect("a\nb\r\n"), Newline::Lf);
    }

    #[test]
    fn test_source_text_round_trip() {
        for content in ["x = 1\ny = 2\n", "x = 1\r\ny = 2\r\n", "x = 1", "", "\n"] {
            let text = SourceText::parse(content);
            assert_eq!(text.render(), content, "round trip failed for {content:?}");
        }
    }

    #[test]
    fn test_source_text_final_newline() {
        let text = SourceText::parse("x = 1");
        assert!(!text.final_newline);
        let text = SourceText::parse("x = 1\n");
        assert!(text.final_newline);
        assert_eq!(text.lines, vec!["x = 1"]);
    }

    #[test]
    fn test_scan_triple_quoted_string() {
        let lines = to_lines("x = \"\"\"start\n# not a comment\nend\"\"\"\ny = 1\n");
        let facts = scan_lines(&lines);
        assert!(!facts[0].in_string);
        assert!(facts[1].in_string);
        assert!(facts[1].comment_start.is_none());
        assert!(facts[2].in_string);
        assert!(!facts[3].in_string);
    }

    #[test]
    fn test_scan_same_line_docstring() {
        let lines = to_lines("\"\"\"one liner\"\"\"\nx = 1\n");
        let facts = scan_lines(&lines);
        assert!(!facts[1].in_string);
    }

    #[test]
    fn test_scan_bracket_continuation() {
        let lines = to_lines("call(\n    arg,\n)\nx = 1\n");
        let facts = scan_lines(&lines);
        assert!(!facts[0].in_continuation);
        assert!(facts[1].in_continuation);
        assert!(facts[2].in_continuation);
        assert!(!facts[3].in_continuation);
    }

    #[test]
    fn test_scan_backslash_continuation() {
        let lines = to_lines("total = 1 + \\\n    2\nx = 1\n");
        let facts = scan_lines(&lines);
        assert!(facts[1].in_continuation);
        assert!(!facts[2].in_continuation);
    }

    #[test]
    fn test_scan_comment_and_hash_in_string() {
        let lines = to_lines("x = '#nope'  # real comment\n");
        let facts = scan_lines(&lines);
        let idx = facts[0].comment_start.expect("comment detected");
        assert_eq!(&lines[0][idx..], "# real comment");
    }

    #[test]
    fn test_noqa_parsing() {
        let lines = to_lines("import os  # noqa\nimport re  # noqa: F401, E501\nimport io\n");
        let facts = scan_lines(&lines);

        assert_eq!(parse_noqa(&lines[0], &facts[0]), Noqa::All);
        let codes = parse_noqa(&lines[1], &facts[1]);
        assert!(codes.suppresses("F401"));
        assert!(codes.suppresses("E501"));
        assert!(!codes.suppresses("W291"));
        assert_eq!(parse_noqa(&lines[2], &facts[2]), Noqa::None);
    }

    #[test]
    fn test_noqa_case_insensitive() {
        let lines = to_lines("import os  # NOQA: f401\n");
        let facts = scan_lines(&lines);
        assert!(parse_noqa(&lines[0], &facts[0]).suppresses("F401"));
    }

    #[test]
    fn test_width_helpers() {
        assert_eq!(indent_width("\tx", 4), 4);
        assert_eq!(indent_width(" \tx", 4), 4);
        assert_eq!(indent_width("    x", 4), 4);
        assert_eq!(expanded_width("\tab", 4), 6);
        assert_eq!(expand_leading_tabs("\tx = 1\t!", 4), "    x = 1\t!");
        assert_eq!(expand_leading_tabs(" \tx", 4), "    x");
    }

    #[test]
    fn test_block_starts_top_level() {
        let lines = to_lines("x = 1\n\n\ndef foo():\n    pass\n");
        let facts = scan_lines(&lines);
        let starts = find_block_starts(&lines, &facts, 4);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].def_line, 3);
        assert_eq!(starts[0].anchor_line, 3);
        assert!(starts[0].top_level);
        assert_eq!(starts[0].blanks_above, 2);
        assert!(starts[0].has_preceding_code);
    }

    #[test]
    fn test_block_starts_decorated() {
        let lines = to_lines("x = 1\n\n@wraps\n# helper\ndef foo():\n    pass\n");
        let facts = scan_lines(&lines);
        let starts = find_block_starts(&lines, &facts, 4);
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].def_line, 4);
        assert_eq!(starts[0].anchor_line, 2);
        assert_eq!(starts[0].blanks_above, 1);
    }

    #[test]
    fn test_block_starts_nested_method() {
        let lines = to_lines("class A:\n    def f(self):\n        pass\n    def g(self):\n        pass\n");
        let facts = scan_lines(&lines);
        let starts = find_block_starts(&lines, &facts, 4);
        assert_eq!(starts.len(), 3);
        // class itself
        assert!(starts[0].top_level);
        // first method directly under the class header
        assert!(starts[1].after_block_open);
        // second method follows the body of the first
        assert!(!starts[2].after_block_open);
        assert_eq!(starts[2].blanks_above, 0);
    }

    #[test]
    fn test_def_inside_string_ignored() {
        let lines = to_lines("doc = \"\"\"\ndef fake():\n\"\"\"\n");
        let facts = scan_lines(&lines);
        assert!(find_block_starts(&lines, &facts, 4).is_empty());
    }

    #[test]
    fn test_prologue_end() {
        let lines = to_lines("#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\"\"\"Docstring.\n\nMore.\n\"\"\"\nimport os\n");
        let facts = scan_lines(&lines);
        assert_eq!(prologue_end(&lines, &facts), 6);
    }

    #[test]
    fn test_prologue_end_no_docstring() {
        let lines = to_lines("import os\n");
        let facts = scan_lines(&lines);
        assert_eq!(prologue_end(&lines, &facts), 0);
    }
}

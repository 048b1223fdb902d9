//! Import block parsing, classification, and normalization
//!
//! The import block is the run of single-line, top-level `import` and
//! `from ... import` statements following the module prologue. Comments
//! sitting directly above a statement travel with it; anything the parser
//! cannot safely reorder (multi-line imports, compound statements, code)
//! ends the block and is left untouched.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use super::{is_blank, prologue_end, scan_lines, LineFacts, SourceText};

lazy_static! {
    static ref PLAIN_RE: Regex =
        Regex::new(r"^import\s+(?P<body>.+)$").expect("plain import regex is valid");
    static ref FROM_RE: Regex =
        Regex::new(r"^from\s+(?P<module>\.+[\w.]*|[A-Za-z_][\w.]*)\s+import\s+(?P<body>.+)$")
            .expect("from import regex is valid");
    static ref MODULE_BINDING_RE: Regex =
        Regex::new(r"^(?P<target>[A-Za-z_][\w.]*)(?:\s+as\s+(?P<alias>[A-Za-z_]\w*))?$")
            .expect("module binding regex is valid");
    static ref NAME_BINDING_RE: Regex =
        Regex::new(r"^(?P<target>[A-Za-z_]\w*)(?:\s+as\s+(?P<alias>[A-Za-z_]\w*))?$")
            .expect("name binding regex is valid");
}

/// Canonical import groups, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// `from __future__ import ...`
    Future,
    /// Python standard library modules
    Stdlib,
    /// Everything not otherwise classified
    ThirdParty,
    /// Modules listed under `imports.first_party` in the configuration
    FirstParty,
    /// Relative imports (`from . import x`)
    Local,
}

/// One imported module or name with its optional alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Module path or name as written
    pub target: String,
    /// Alias introduced with `as`, if any
    pub alias: Option<String>,
}

impl Binding {
    /// The local name this binding introduces
    pub fn bound_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias.as_str(),
            None => self.target.split('.').next().unwrap_or(&self.target),
        }
    }
}

/// Parsed form of a single-line import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import a, b.c as d`
    Plain { modules: Vec<Binding> },
    /// `from pkg import x, y as z`, `from . import x`, or `from m import *`
    From {
        module: String,
        names: Vec<Binding>,
        star: bool,
    },
}

/// Same-line comment together with the spacing that preceded it
///
/// The padding is kept verbatim so that reattaching the comment never
/// changes the width of a line the author already laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingComment {
    /// Whitespace between the statement text and the `#`
    pub padding: String,
    /// Comment text from `#` to end of line
    pub text: String,
}

/// An import statement with the comments that belong to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Physical line the statement was parsed from
    pub line_index: usize,
    /// Comment lines sitting directly above the statement
    pub leading_comments: Vec<String>,
    /// Trailing comment on the statement line, `#` included
    pub trailing_comment: Option<TrailingComment>,
    /// Parsed statement body
    pub kind: ImportKind,
}

impl ImportStatement {
    /// The bindings this statement introduces, empty for star imports
    pub fn bindings(&self) -> &[Binding] {
        match &self.kind {
            ImportKind::Plain { modules } => modules,
            ImportKind::From { names, .. } => names,
        }
    }
}

/// The contiguous region of reorderable imports at the top of a module
#[derive(Debug, Clone)]
pub struct ImportBlock {
    /// First line belonging to the block
    pub start: usize,
    /// One past the last statement line
    pub end: usize,
    /// Statements in source order
    pub statements: Vec<ImportStatement>,
}

impl ImportBlock {
    /// Whether the block contains a `from m import *`
    pub fn has_star_import(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(&s.kind, ImportKind::From { star: true, .. }))
    }
}

/// Parse one line as an import statement, splitting off any trailing comment
///
/// Returns `None` for anything that is not a complete single-line import:
/// compound statements, continuations, and malformed bodies all disqualify.
pub fn parse_statement(
    line: &str,
    facts: &LineFacts,
) -> Option<(ImportKind, Option<TrailingComment>)> {
    let (code, comment) = match facts.comment_start {
        Some(idx) => {
            let code = &line[..idx];
            let padding = &code[code.trim_end().len()..];
            (
                code,
                Some(TrailingComment {
                    padding: padding.to_string(),
                    text: line[idx..].trim_end().to_string(),
                }),
            )
        }
        None => (line, None),
    };
    let code = code.trim();
    if code.contains(';') || code.ends_with('\\') {
        return None;
    }

    if let Some(caps) = PLAIN_RE.captures(code) {
        let modules = parse_bindings(&caps["body"], &MODULE_BINDING_RE)?;
        return Some((ImportKind::Plain { modules }, comment));
    }

    if let Some(caps) = FROM_RE.captures(code) {
        let module = caps["module"].to_string();
        let mut body = caps["body"].trim().to_string();
        if body.starts_with('(') && body.ends_with(')') {
            body = body[1..body.len() - 1]
                .trim()
                .trim_end_matches(',')
                .trim_end()
                .to_string();
        }
        if body == "*" {
            return Some((
                ImportKind::From {
                    module,
                    names: Vec::new(),
                    star: true,
                },
                comment,
            ));
        }
        let names = parse_bindings(&body, &NAME_BINDING_RE)?;
        return Some((
            ImportKind::From {
                module,
                names,
                star: false,
            },
            comment,
        ));
    }

    None
}

fn parse_bindings(body: &str, binding_re: &Regex) -> Option<Vec<Binding>> {
    let mut out = Vec::new();
    for part in body.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        let caps = binding_re.captures(part)?;
        out.push(Binding {
            target: caps["target"].to_string(),
            alias: caps.name("alias").map(|m| m.as_str().to_string()),
        });
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Scan forward from `start_at` and collect the import block, if any
pub fn find_block(
    lines: &[String],
    facts: &[LineFacts],
    start_at: usize,
) -> Option<ImportBlock> {
    let mut pending: Vec<usize> = Vec::new();
    let mut statements: Vec<ImportStatement> = Vec::new();
    let mut block_start: Option<usize> = None;
    let mut last_end = start_at;
    let mut i = start_at;

    while i < lines.len() {
        let line = &lines[i];
        let f = &facts[i];
        if f.in_string || f.in_continuation {
            break;
        }
        if is_blank(line) {
            if !pending.is_empty() {
                if statements.is_empty() {
                    // preamble comments before the first import stay outside
                    pending.clear();
                } else {
                    // a comment not attached to an import ends the block
                    break;
                }
            }
            i += 1;
            continue;
        }
        let stripped = line.trim_start();
        if stripped.starts_with('#') {
            if line.starts_with('#') {
                pending.push(i);
                i += 1;
                continue;
            }
            break;
        }
        if !(line.starts_with("import ") || line.starts_with("from ")) {
            break;
        }
        // statements spanning lines end the reorderable region
        let continues =
            i + 1 < lines.len() && (facts[i + 1].in_string || facts[i + 1].in_continuation);
        if continues {
            break;
        }
        let Some((kind, trailing_comment)) = parse_statement(line, f) else {
            break;
        };
        let leading_comments: Vec<String> =
            pending.drain(..).map(|j| lines[j].clone()).collect();
        if block_start.is_none() {
            block_start = Some(i - leading_comments.len());
        }
        statements.push(ImportStatement {
            line_index: i,
            leading_comments,
            trailing_comment,
            kind,
        });
        last_end = i + 1;
        i += 1;
    }

    let start = block_start?;
    Some(ImportBlock {
        start,
        end: last_end,
        statements,
    })
}

/// Locate the import block of a whole file, skipping the module prologue
pub fn find_file_block(lines: &[String], facts: &[LineFacts]) -> Option<ImportBlock> {
    find_block(lines, facts, prologue_end(lines, facts))
}

/// Classify a statement into its output section
pub fn classify(kind: &ImportKind, first_party: &[String]) -> Section {
    let module = match kind {
        ImportKind::Plain { modules } => modules
            .first()
            .map(|b| b.target.as_str())
            .unwrap_or_default(),
        ImportKind::From { module, .. } => module.as_str(),
    };
    if module.starts_with('.') {
        return Section::Local;
    }
    let root = module.split('.').next().unwrap_or(module);
    if root == "__future__" {
        return Section::Future;
    }
    if first_party.iter().any(|p| p == root) {
        return Section::FirstParty;
    }
    if STDLIB_MODULES.contains(root) {
        return Section::Stdlib;
    }
    Section::ThirdParty
}

/// Render a statement body in canonical form, without comments
pub fn render_kind(kind: &ImportKind) -> String {
    match kind {
        ImportKind::Plain { modules } => format!("import {}", render_bindings(modules)),
        ImportKind::From {
            module,
            names,
            star,
        } => {
            if *star {
                format!("from {module} import *")
            } else {
                format!("from {module} import {}", render_bindings(names))
            }
        }
    }
}

fn render_bindings(bindings: &[Binding]) -> String {
    bindings
        .iter()
        .map(|b| match &b.alias {
            Some(alias) => format!("{} as {}", b.target, alias),
            None => b.target.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a full statement line, reattaching any trailing comment
pub fn render_statement_line(kind: &ImportKind, trailing: Option<&TrailingComment>) -> String {
    match trailing {
        Some(comment) => format!("{}{}{}", render_kind(kind), comment.padding, comment.text),
        None => render_kind(kind),
    }
}

/// Compute the canonical rendering of an import block
///
/// Multi-module `import a, b` statements are split onto their own lines and
/// from-import name lists are sorted and deduplicated. Statements are grouped
/// by section with straight imports ahead of from-imports, sorted
/// case-insensitively, and exact duplicates are folded together with their
/// comments. Statements are never merged or wrapped, so normalization cannot
/// lengthen any line.
pub fn normalized_lines(block: &ImportBlock, first_party: &[String]) -> Vec<String> {
    let mut exploded: Vec<ImportStatement> = Vec::new();
    for stmt in &block.statements {
        match &stmt.kind {
            ImportKind::Plain { modules } if modules.len() > 1 => {
                for (idx, binding) in modules.iter().enumerate() {
                    exploded.push(ImportStatement {
                        line_index: stmt.line_index,
                        leading_comments: if idx == 0 {
                            stmt.leading_comments.clone()
                        } else {
                            Vec::new()
                        },
                        trailing_comment: if idx == 0 {
                            stmt.trailing_comment.clone()
                        } else {
                            None
                        },
                        kind: ImportKind::Plain {
                            modules: vec![binding.clone()],
                        },
                    });
                }
            }
            ImportKind::From {
                module,
                names,
                star: false,
            } => {
                let mut names = names.clone();
                names.sort_by_key(|b| {
                    (b.target.to_lowercase(), b.target.clone(), b.alias.clone())
                });
                names.dedup_by(|a, b| a.target == b.target && a.alias == b.alias);
                exploded.push(ImportStatement {
                    kind: ImportKind::From {
                        module: module.clone(),
                        names,
                        star: false,
                    },
                    ..stmt.clone()
                });
            }
            _ => exploded.push(stmt.clone()),
        }
    }

    let mut buckets: BTreeMap<(Section, bool), Vec<ImportStatement>> = BTreeMap::new();
    for stmt in exploded {
        let section = classify(&stmt.kind, first_party);
        let is_from = matches!(stmt.kind, ImportKind::From { .. });
        buckets.entry((section, is_from)).or_default().push(stmt);
    }

    for list in buckets.values_mut() {
        list.sort_by_key(|stmt| {
            let module = match &stmt.kind {
                ImportKind::Plain { modules } => modules
                    .first()
                    .map(|b| b.target.clone())
                    .unwrap_or_default(),
                ImportKind::From { module, .. } => module.clone(),
            };
            (module.to_lowercase(), module, render_kind(&stmt.kind))
        });

        // fold exact duplicates, keeping every comment
        let mut deduped: Vec<ImportStatement> = Vec::new();
        for stmt in list.drain(..) {
            match deduped.last_mut() {
                Some(prev) if render_kind(&prev.kind) == render_kind(&stmt.kind) => {
                    prev.leading_comments.extend(stmt.leading_comments);
                    match (&prev.trailing_comment, stmt.trailing_comment) {
                        (None, Some(comment)) => prev.trailing_comment = Some(comment),
                        (Some(kept), Some(comment)) if kept.text != comment.text => {
                            prev.leading_comments.push(comment.text);
                        }
                        _ => {}
                    }
                }
                _ => deduped.push(stmt),
            }
        }
        *list = deduped;
    }

    let mut out: Vec<String> = Vec::new();
    let mut last_section: Option<Section> = None;
    for ((section, _), list) in &buckets {
        if let Some(prev) = last_section {
            if prev != *section {
                out.push(String::new());
            }
        }
        last_section = Some(*section);
        for stmt in list {
            out.extend(stmt.leading_comments.iter().cloned());
            out.push(render_statement_line(
                &stmt.kind,
                stmt.trailing_comment.as_ref(),
            ));
        }
    }
    out
}

/// Names bound by the block that never appear in the rest of the file
///
/// The scan is textual: a whole-word occurrence anywhere outside the import
/// statements counts as a use, including inside `__all__` strings and
/// docstrings. That errs on the side of keeping imports. Star imports make
/// usage untrackable, so their presence disables the analysis entirely.
pub fn unused_bindings(lines: &[String], block: &ImportBlock) -> Vec<(usize, Vec<String>)> {
    if block.has_star_import() {
        return Vec::new();
    }
    let statement_lines: HashSet<usize> =
        block.statements.iter().map(|s| s.line_index).collect();
    let usage_text: String = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !statement_lines.contains(i))
        .map(|(_, l)| l.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = Vec::new();
    for stmt in &block.statements {
        if is_future(&stmt.kind) {
            continue;
        }
        let mut unused = Vec::new();
        for binding in stmt.bindings() {
            let name = binding.bound_name();
            let pattern = format!(r"\b{}\b", regex::escape(name));
            let re = Regex::new(&pattern).expect("escaped identifier is a valid regex");
            if !re.is_match(&usage_text) {
                unused.push(name.to_string());
            }
        }
        if !unused.is_empty() {
            out.push((stmt.line_index, unused));
        }
    }
    out
}

fn is_future(kind: &ImportKind) -> bool {
    match kind {
        ImportKind::From { module, .. } => {
            module == "__future__" || module.starts_with("__future__.")
        }
        ImportKind::Plain { modules } => modules.iter().any(|b| b.target == "__future__"),
    }
}

/// Edit produced when unused names are stripped from an import line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    /// Line is untouched
    Keep,
    /// Line is replaced with the given text
    Replace(String),
    /// Line is deleted
    Remove,
}

/// Rewrite one import line with the given bound names removed
pub fn rewrite_without(line: &str, facts: &LineFacts, remove: &[String]) -> LineEdit {
    let Some((kind, trailing)) = parse_statement(line, facts) else {
        return LineEdit::Keep;
    };
    let hit = |b: &Binding| remove.iter().any(|r| r.as_str() == b.bound_name());

    let kept_kind = match kind {
        ImportKind::Plain { modules } => {
            if !modules.iter().any(&hit) {
                return LineEdit::Keep;
            }
            let kept: Vec<Binding> = modules.into_iter().filter(|b| !hit(b)).collect();
            if kept.is_empty() {
                return LineEdit::Remove;
            }
            ImportKind::Plain { modules: kept }
        }
        ImportKind::From {
            module,
            names,
            star,
        } => {
            if star || !names.iter().any(&hit) {
                return LineEdit::Keep;
            }
            let kept: Vec<Binding> = names.into_iter().filter(|b| !hit(b)).collect();
            if kept.is_empty() {
                return LineEdit::Remove;
            }
            ImportKind::From {
                module,
                names: kept,
                star,
            }
        }
    };
    LineEdit::Replace(render_statement_line(&kept_kind, trailing.as_ref()))
}

/// Sort the file's import block in place, returning whether anything moved
pub fn sort_imports(text: &mut SourceText, first_party: &[String]) -> bool {
    let facts = scan_lines(&text.lines);
    let Some(block) = find_file_block(&text.lines, &facts) else {
        return false;
    };
    let normalized = normalized_lines(&block, first_party);
    if text.lines[block.start..block.end] == normalized[..] {
        return false;
    }
    let mut rebuilt = Vec::with_capacity(text.lines.len());
    rebuilt.extend_from_slice(&text.lines[..block.start]);
    rebuilt.extend(normalized);
    rebuilt.extend_from_slice(&text.lines[block.end..]);
    text.lines = rebuilt;
    true
}

lazy_static! {
    /// Top-level standard library module names for CPython 3
    static ref STDLIB_MODULES: HashSet<&'static str> = [
        "abc", "argparse", "array", "ast", "asyncio", "atexit", "base64", "bisect",
        "builtins", "bz2", "calendar", "cmath", "cmd", "codecs", "collections",
        "concurrent", "configparser", "contextlib", "contextvars", "copy", "copyreg",
        "csv", "ctypes", "dataclasses", "datetime", "decimal", "difflib", "dis",
        "doctest", "email", "enum", "errno", "faulthandler", "fcntl", "filecmp",
        "fileinput", "fnmatch", "fractions", "ftplib", "functools", "gc", "getopt",
        "getpass", "gettext", "glob", "graphlib", "gzip", "hashlib", "heapq", "hmac",
        "html", "http", "imaplib", "importlib", "inspect", "io", "ipaddress",
        "itertools", "json", "keyword", "linecache", "locale", "logging", "lzma",
        "mailbox", "marshal", "math", "mimetypes", "mmap", "multiprocessing", "netrc",
        "numbers", "operator", "os", "pathlib", "pickle", "pickletools", "pkgutil",
        "platform", "plistlib", "poplib", "posixpath", "pprint", "profile", "pstats",
        "pty", "pwd", "py_compile", "pydoc", "queue", "quopri", "random", "re",
        "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched", "secrets",
        "select", "selectors", "shelve", "shlex", "shutil", "signal", "site",
        "smtplib", "socket", "socketserver", "sqlite3", "ssl", "stat", "statistics",
        "string", "stringprep", "struct", "subprocess", "symtable", "sys",
        "sysconfig", "syslog", "tarfile", "tempfile", "termios", "textwrap",
        "threading", "time", "timeit", "tkinter", "token", "tokenize", "tomllib",
        "trace", "traceback", "tracemalloc", "tty", "turtle", "types", "typing",
        "unicodedata", "unittest", "urllib", "uuid", "venv", "warnings", "wave",
        "weakref", "webbrowser", "wsgiref", "xml", "xmlrpc", "zipapp", "zipfile",
        "zipimport", "zlib", "zoneinfo",
    ]
    .iter()
    .copied()
    .collect();
}

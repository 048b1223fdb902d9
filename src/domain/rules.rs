//! Static catalog of the style rules the pipeline enforces
//!
//! Rule codes follow the pycodestyle/pyflakes/isort numbering so that
//! `# noqa` comments and editor tooling keep working unchanged.

use super::violations::{FixStage, Severity};

/// Description of one enforced style rule
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    /// Rule code, e.g. `W291` or `F401`
    pub code: &'static str,
    /// Short machine-friendly name
    pub name: &'static str,
    /// Severity assigned to violations of this rule
    pub severity: Severity,
    /// Transform that resolves this rule, `None` for detect-only rules
    pub fixed_by: Option<FixStage>,
    /// One-line human description
    pub summary: &'static str,
}

impl RuleSpec {
    /// Whether the pipeline can rewrite files to resolve this rule
    pub fn is_fixable(&self) -> bool {
        self.fixed_by.is_some()
    }
}

/// All rules known to the pipeline, in catalog order
pub const RULES: &[RuleSpec] = &[
    RuleSpec {
        code: "W191",
        name: "tabs-in-indentation",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Cleanup),
        summary: "indentation contains tabs",
    },
    RuleSpec {
        code: "W291",
        name: "trailing-whitespace",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Cleanup),
        summary: "trailing whitespace",
    },
    RuleSpec {
        code: "W292",
        name: "missing-final-newline",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Layout),
        summary: "no newline at end of file",
    },
    RuleSpec {
        code: "W293",
        name: "whitespace-on-blank-line",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Cleanup),
        summary: "whitespace on blank line",
    },
    RuleSpec {
        code: "W391",
        name: "blank-line-at-eof",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Layout),
        summary: "blank line at end of file",
    },
    RuleSpec {
        code: "E301",
        name: "expected-one-blank-line",
        severity: Severity::Error,
        fixed_by: Some(FixStage::Layout),
        summary: "expected 1 blank line before a nested definition",
    },
    RuleSpec {
        code: "E302",
        name: "expected-two-blank-lines",
        severity: Severity::Error,
        fixed_by: Some(FixStage::Layout),
        summary: "expected 2 blank lines before a top-level definition",
    },
    RuleSpec {
        code: "E303",
        name: "too-many-blank-lines",
        severity: Severity::Error,
        fixed_by: Some(FixStage::Layout),
        summary: "too many consecutive blank lines",
    },
    RuleSpec {
        code: "E401",
        name: "multiple-imports-on-one-line",
        severity: Severity::Error,
        fixed_by: Some(FixStage::Imports),
        summary: "multiple modules imported on one line",
    },
    RuleSpec {
        code: "E501",
        name: "line-too-long",
        severity: Severity::Error,
        fixed_by: None,
        summary: "line exceeds the configured length limit",
    },
    RuleSpec {
        code: "F401",
        name: "unused-import",
        severity: Severity::Error,
        fixed_by: Some(FixStage::Cleanup),
        summary: "imported name is never used",
    },
    RuleSpec {
        code: "I001",
        name: "unsorted-imports",
        severity: Severity::Warning,
        fixed_by: Some(FixStage::Imports),
        summary: "import block is un-sorted or un-formatted",
    },
];

/// Look up a rule by its code
pub fn rule(code: &str) -> Option<&'static RuleSpec> {
    RULES.iter().find(|r| r.code == code)
}

/// Whether a rule code is part of the catalog
pub fn is_known_code(code: &str) -> bool {
    rule(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let spec = rule("F401").expect("F401 is in the catalog");
        assert_eq!(spec.name, "unused-import");
        assert_eq!(spec.severity, Severity::Error);
        assert_eq!(spec.fixed_by, Some(FixStage::Cleanup));
        assert!(spec.is_fixable());
    }

    #[test]
    fn test_detect_only_rule() {
        let spec = rule("E501").expect("E501 is in the catalog");
        assert!(!spec.is_fixable());
    }

    #[test]
    fn test_unknown_code() {
        assert!(!is_known_code("E999"));
        assert!(rule("X123").is_none());
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in RULES.iter().enumerate() {
            for b in &RULES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }
}

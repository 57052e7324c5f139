// Rules module
// This module exports the different categories of analysis rules and the
// finding type they all produce.

use crate::config::AnalysisConfig;
use crate::error::InternalAnalysisError;
use crate::tree::{AnalysisTree, UnitId};
use crate::utils::get_ignored_lines;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Rules for detecting hardcoded secrets and credentials.
pub mod secrets;

/// Rules for detecting dangerous code patterns (security vulnerabilities).
pub mod danger;

/// Rules for detecting inefficient idioms.
pub mod performance;

/// Rules for checking docstring presence and quality.
pub mod documentation;

/// Rules for structural thresholds (parameters, complexity, nesting).
pub mod quality;

/// Runs every security family: secrets first, then dangerous calls.
pub fn detect_security(
    tree: &AnalysisTree,
    source: &str,
    config: &AnalysisConfig,
) -> Result<Vec<Finding>, InternalAnalysisError> {
    let mut findings = secrets::scan_secrets(tree, source, config)?;
    findings.extend(danger::scan_danger(tree, source, config)?);
    Ok(findings)
}

/// The area a finding belongs to.
///
/// Declaration order is the tie-break order used when sorting a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Performance,
    Documentation,
    Structure,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Security => write!(f, "security"),
            Category::Performance => write!(f, "performance"),
            Category::Documentation => write!(f, "documentation"),
            Category::Structure => write!(f, "structure"),
        }
    }
}

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A named, independently toggleable group of rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleFamily {
    HardcodedSecret,
    TokenPattern,
    UnsafeCall,
    Injection,
    LoopConcatenation,
    NestedLoop,
    ListMembership,
    RangeLen,
    GlobalStatement,
    EmptyExcept,
    MissingDoc,
    LowQualityDoc,
    DocSections,
    TooManyParams,
    HighComplexity,
    DeepNesting,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 16] = [
        RuleFamily::HardcodedSecret,
        RuleFamily::TokenPattern,
        RuleFamily::UnsafeCall,
        RuleFamily::Injection,
        RuleFamily::LoopConcatenation,
        RuleFamily::NestedLoop,
        RuleFamily::ListMembership,
        RuleFamily::RangeLen,
        RuleFamily::GlobalStatement,
        RuleFamily::EmptyExcept,
        RuleFamily::MissingDoc,
        RuleFamily::LowQualityDoc,
        RuleFamily::DocSections,
        RuleFamily::TooManyParams,
        RuleFamily::HighComplexity,
        RuleFamily::DeepNesting,
    ];

    pub fn category(self) -> Category {
        match self {
            RuleFamily::HardcodedSecret
            | RuleFamily::TokenPattern
            | RuleFamily::UnsafeCall
            | RuleFamily::Injection => Category::Security,
            RuleFamily::LoopConcatenation
            | RuleFamily::NestedLoop
            | RuleFamily::ListMembership
            | RuleFamily::RangeLen
            | RuleFamily::GlobalStatement
            | RuleFamily::EmptyExcept => Category::Performance,
            RuleFamily::MissingDoc | RuleFamily::LowQualityDoc | RuleFamily::DocSections => {
                Category::Documentation
            }
            RuleFamily::TooManyParams | RuleFamily::HighComplexity | RuleFamily::DeepNesting => {
                Category::Structure
            }
        }
    }
}

/// Every rule a detector can report, identified by a stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rule {
    #[serde(rename = "hardcoded-secret")]
    HardcodedSecret,
    #[serde(rename = "secret-token-pattern")]
    SecretTokenPattern,
    #[serde(rename = "unsafe-call")]
    UnsafeCall,
    #[serde(rename = "injection-string-building")]
    InjectionStringBuilding,
    #[serde(rename = "loop-concatenation")]
    LoopConcatenation,
    #[serde(rename = "nested-loop-same-collection")]
    NestedLoopSameCollection,
    #[serde(rename = "list-membership-in-loop")]
    ListMembershipInLoop,
    #[serde(rename = "range-len-loop")]
    RangeLenLoop,
    #[serde(rename = "global-statement")]
    GlobalStatement,
    #[serde(rename = "empty-except")]
    EmptyExcept,
    #[serde(rename = "missing-doc")]
    MissingDoc,
    #[serde(rename = "low-quality-doc")]
    LowQualityDoc,
    #[serde(rename = "undocumented-params")]
    UndocumentedParams,
    #[serde(rename = "undocumented-returns")]
    UndocumentedReturns,
    #[serde(rename = "syntax-error")]
    SyntaxError,
    #[serde(rename = "too-many-params")]
    TooManyParams,
    #[serde(rename = "high-complexity")]
    HighComplexity,
    #[serde(rename = "deep-nesting")]
    DeepNesting,
}

impl Rule {
    /// The stable identifier reported in findings.
    pub fn id(self) -> &'static str {
        match self {
            Rule::HardcodedSecret => "hardcoded-secret",
            Rule::SecretTokenPattern => "secret-token-pattern",
            Rule::UnsafeCall => "unsafe-call",
            Rule::InjectionStringBuilding => "injection-string-building",
            Rule::LoopConcatenation => "loop-concatenation",
            Rule::NestedLoopSameCollection => "nested-loop-same-collection",
            Rule::ListMembershipInLoop => "list-membership-in-loop",
            Rule::RangeLenLoop => "range-len-loop",
            Rule::GlobalStatement => "global-statement",
            Rule::EmptyExcept => "empty-except",
            Rule::MissingDoc => "missing-doc",
            Rule::LowQualityDoc => "low-quality-doc",
            Rule::UndocumentedParams => "undocumented-params",
            Rule::UndocumentedReturns => "undocumented-returns",
            Rule::SyntaxError => "syntax-error",
            Rule::TooManyParams => "too-many-params",
            Rule::HighComplexity => "high-complexity",
            Rule::DeepNesting => "deep-nesting",
        }
    }

    /// The family that toggles this rule; `None` for rules that cannot be disabled.
    pub fn family(self) -> Option<RuleFamily> {
        match self {
            Rule::HardcodedSecret => Some(RuleFamily::HardcodedSecret),
            Rule::SecretTokenPattern => Some(RuleFamily::TokenPattern),
            Rule::UnsafeCall => Some(RuleFamily::UnsafeCall),
            Rule::InjectionStringBuilding => Some(RuleFamily::Injection),
            Rule::LoopConcatenation => Some(RuleFamily::LoopConcatenation),
            Rule::NestedLoopSameCollection => Some(RuleFamily::NestedLoop),
            Rule::ListMembershipInLoop => Some(RuleFamily::ListMembership),
            Rule::RangeLenLoop => Some(RuleFamily::RangeLen),
            Rule::GlobalStatement => Some(RuleFamily::GlobalStatement),
            Rule::EmptyExcept => Some(RuleFamily::EmptyExcept),
            Rule::MissingDoc => Some(RuleFamily::MissingDoc),
            Rule::LowQualityDoc => Some(RuleFamily::LowQualityDoc),
            Rule::UndocumentedParams | Rule::UndocumentedReturns => Some(RuleFamily::DocSections),
            Rule::SyntaxError => None,
            Rule::TooManyParams => Some(RuleFamily::TooManyParams),
            Rule::HighComplexity => Some(RuleFamily::HighComplexity),
            Rule::DeepNesting => Some(RuleFamily::DeepNesting),
        }
    }

    pub fn category(self) -> Category {
        self.family()
            .map_or(Category::Structure, RuleFamily::category)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One reported issue. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: Rule,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    /// Qualified name of the innermost enclosing unit; `None` for file-level findings.
    pub unit: Option<String>,
    /// 1-based line number.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Finding {
    pub fn new(
        rule: Rule,
        severity: Severity,
        message: impl Into<String>,
        unit: Option<String>,
        line: usize,
    ) -> Self {
        Self {
            rule_id: rule,
            category: rule.category(),
            severity,
            message: message.into(),
            unit,
            line,
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: Option<&str>) -> Self {
        self.snippet = snippet
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        self
    }
}

/// Collects findings for one detector run, attaching unit names and snippets
/// and dropping lines silenced by the suppression pragma.
pub(crate) struct FindingSink<'a> {
    tree: &'a AnalysisTree,
    source: &'a str,
    ignored_lines: HashSet<usize>,
    findings: Vec<Finding>,
}

impl<'a> FindingSink<'a> {
    pub(crate) fn new(tree: &'a AnalysisTree, source: &'a str, honor_pragmas: bool) -> Self {
        let ignored_lines = if honor_pragmas {
            get_ignored_lines(source)
        } else {
            HashSet::new()
        };
        Self {
            tree,
            source,
            ignored_lines,
            findings: Vec::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        rule: Rule,
        severity: Severity,
        message: impl Into<String>,
        unit: Option<UnitId>,
        line: usize,
    ) {
        if self.ignored_lines.contains(&line) {
            return;
        }
        let unit_name = unit
            .and_then(|id| self.tree.get(id))
            .map(|unit| unit.qualified_name.clone());
        let snippet = self.tree.line_index().line_text(self.source, line);
        self.findings
            .push(Finding::new(rule, severity, message, unit_name, line).with_snippet(snippet));
    }

    pub(crate) fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

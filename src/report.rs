//! The report handed back to callers.
//!
//! Aggregation only concatenates and orders: findings are sorted by
//! `(line, category, rule_id)` with a stable sort, so two findings that tie on
//! all three keep the order their detector produced them in. Nothing is
//! filtered, deduplicated or escalated here.

use crate::error::SyntaxFailure;
use crate::metrics::Metrics;
use crate::parser::ANONYMOUS_MODULE;
use crate::rules::{Category, Finding, Rule, Severity};
use crate::tree::{AnalysisTree, SourceUnit, UnitId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Finding counts for a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl Summary {
    fn of(findings: &[Finding]) -> Self {
        let mut summary = Summary {
            total: findings.len(),
            ..Summary::default()
        };
        for finding in findings {
            *summary.by_category.entry(finding.category).or_insert(0) += 1;
            *summary.by_severity.entry(finding.severity).or_insert(0) += 1;
        }
        summary
    }
}

/// The outcome of analyzing one source text. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    file: Option<String>,
    parse_ok: bool,
    units: Vec<SourceUnit>,
    metrics: BTreeMap<String, Metrics>,
    findings: Vec<Finding>,
    /// `None` when the source did not parse.
    coverage: Option<f64>,
    summary: Summary,
}

/// Sorts findings by line, then category, then rule id.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.line
            .cmp(&b.line)
            .then(a.category.cmp(&b.category))
            .then(a.rule_id.id().cmp(b.rule_id.id()))
    });
}

/// Combines detector outputs into a report for a parsed tree.
///
/// `findings` holds one batch per detector; batches are concatenated in the
/// given order before sorting.
pub fn aggregate(
    tree: &AnalysisTree,
    metrics: &BTreeMap<UnitId, Metrics>,
    coverage: f64,
    findings: Vec<Vec<Finding>>,
) -> AnalysisReport {
    let mut findings: Vec<Finding> = findings.into_iter().flatten().collect();
    sort_findings(&mut findings);

    let metrics = tree
        .units()
        .iter()
        .filter_map(|unit| {
            metrics
                .get(&unit.id)
                .map(|m| (unit.qualified_name.clone(), m.clone()))
        })
        .collect();

    AnalysisReport {
        file: tree.path().map(str::to_string),
        parse_ok: true,
        units: tree.units().to_vec(),
        metrics,
        summary: Summary::of(&findings),
        findings,
        coverage: Some(coverage),
    }
}

impl AnalysisReport {
    /// The report for a source that did not parse: one `syntax-error` finding
    /// and nothing else.
    pub fn syntax_failure(path: Option<&str>, failure: &SyntaxFailure) -> Self {
        let finding = Finding::new(
            Rule::SyntaxError,
            Severity::Error,
            format!(
                "{} does not parse: {} (column {})",
                path.unwrap_or(ANONYMOUS_MODULE),
                failure.message,
                failure.column
            ),
            None,
            failure.line,
        );
        let findings = vec![finding];
        AnalysisReport {
            file: path.map(str::to_string),
            parse_ok: false,
            units: Vec::new(),
            metrics: BTreeMap::new(),
            summary: Summary::of(&findings),
            findings,
            coverage: None,
        }
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn parse_ok(&self) -> bool {
        self.parse_ok
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Metrics keyed by qualified unit name.
    pub fn metrics(&self) -> &BTreeMap<String, Metrics> {
        &self.metrics
    }

    pub fn metrics_for(&self, qualified_name: &str) -> Option<&Metrics> {
        self.metrics.get(qualified_name)
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn findings_in(&self, category: Category) -> impl Iterator<Item = &Finding> + '_ {
        self.findings
            .iter()
            .filter(move |finding| finding.category == category)
    }

    pub fn findings_for(&self, rule: Rule) -> impl Iterator<Item = &Finding> + '_ {
        self.findings
            .iter()
            .filter(move |finding| finding.rule_id == rule)
    }

    pub fn coverage(&self) -> Option<f64> {
        self.coverage
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

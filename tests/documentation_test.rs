// Integration tests for documentation rules
// Tests docstring presence, quality, sections and coverage

use indoc::indoc;
use pretty_assertions::assert_eq;
use pyreview_rs::parser::parse;
use pyreview_rs::rules::documentation::{
    detect_documentation, is_quality_docstring, DocumentationOutcome,
};
use pyreview_rs::{AnalysisConfig, Finding, Rule, RuleFamily, Severity};

fn check(source: &str, path: &str) -> DocumentationOutcome {
    check_with(source, path, &AnalysisConfig::default())
}

fn check_with(source: &str, path: &str, config: &AnalysisConfig) -> DocumentationOutcome {
    let tree = parse(source, Some(path)).expect("Failed to parse");
    detect_documentation(&tree, source, config)
}

fn summary(findings: &[Finding]) -> Vec<(Rule, Option<&str>)> {
    findings
        .iter()
        .map(|f| (f.rule_id, f.unit.as_deref()))
        .collect()
}

#[test]
fn test_undocumented_public_function() {
    let source = indoc! {r#"
        def compute(x):
            return x * 2
    "#};
    let outcome = check(source, "calc.py");

    assert_eq!(
        summary(&outcome.findings),
        vec![
            (Rule::MissingDoc, Some("calc")),
            (Rule::MissingDoc, Some("calc.compute")),
        ]
    );
    let function = &outcome.findings[1];
    assert_eq!(function.severity, Severity::Warning);
    assert_eq!(function.line, 1);
    assert_eq!(outcome.coverage, 0.0);
}

#[test]
fn test_private_and_test_units_are_not_eligible() {
    let source = indoc! {r#"
        """Helpers for the service layer."""

        def _helper():
            pass

        def test_helper_behaviour():
            pass

        class TestService:
            def helper(self):
                pass

        @pytest.fixture
        def client():
            pass
    "#};
    let outcome = check(source, "service.py");

    assert_eq!(outcome.findings, vec![]);
    assert_eq!(outcome.coverage, 1.0);
}

#[test]
fn test_units_of_test_files_are_not_eligible() {
    let source = indoc! {r#"
        def make_user():
            return {"name": "ada"}
    "#};
    let outcome = check(source, "tests/factories.py");

    assert_eq!(
        summary(&outcome.findings),
        vec![(Rule::MissingDoc, Some("factories"))]
    );
}

#[test]
fn test_low_quality_docstrings() {
    let source = indoc! {r#"
        """Payment processing entry points."""

        def charge(amount):
            """Charge it"""
            return amount

        def refund():
            """Issue a refund to the customer for the last order"""
    "#};
    let outcome = check(source, "payments.py");

    assert_eq!(
        summary(&outcome.findings),
        vec![
            (Rule::LowQualityDoc, Some("payments.charge")),
            (Rule::LowQualityDoc, Some("payments.refund")),
        ]
    );
    assert!(outcome
        .findings
        .iter()
        .all(|f| f.severity == Severity::Info));
    assert_eq!(outcome.coverage, 1.0);
}

#[test]
fn test_undocumented_sections() {
    let source = indoc! {r#"
        """Arithmetic helpers for the calculator."""

        def add(a, b):
            """Add two numbers together and give back the sum."""
            return a + b
    "#};
    let outcome = check(source, "arith.py");

    assert_eq!(
        summary(&outcome.findings),
        vec![
            (Rule::UndocumentedParams, Some("arith.add")),
            (Rule::UndocumentedReturns, Some("arith.add")),
        ]
    );
    assert!(outcome.findings[0].message.contains("a, b"));
}

#[test]
fn test_documented_sections() {
    let source = indoc! {r#"
        """Arithmetic helpers for the calculator."""

        class Calculator:
            """Keeps a running total."""

            def add(self, value):
                """Add a value to the running total.

                Args:
                    value: The amount to add.

                Returns:
                    The new total.
                """
                return value

            def reset(self):
                """Reset the running total to zero."""
                self.total = 0
    "#};
    let outcome = check(source, "calc.py");
    assert_eq!(outcome.findings, vec![]);
    assert_eq!(outcome.coverage, 1.0);
}

#[test]
fn test_coverage_ratio() {
    let source = indoc! {r#"
        """Reporting utilities for the dashboard."""

        def render():
            """Render the dashboard report to the terminal."""
            print("report")

        def export(report):
            pass
    "#};
    let outcome = check(source, "reporting.py");

    assert_eq!(
        summary(&outcome.findings),
        vec![(Rule::MissingDoc, Some("reporting.export"))]
    );
    assert!((outcome.coverage - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_coverage_ignores_disabled_families() {
    let source = indoc! {r#"
        def export(report):
            pass
    "#};
    let config = AnalysisConfig::only([RuleFamily::HardcodedSecret]);
    let outcome = check_with(source, "reporting.py", &config);

    assert_eq!(outcome.findings, vec![]);
    assert_eq!(outcome.coverage, 0.0);
}

#[test]
fn test_minimum_docstring_length_is_configurable() {
    let source = indoc! {r#"
        """Short module."""
    "#};
    assert_eq!(check(source, "m.py").findings.len(), 1);

    let config = AnalysisConfig {
        min_docstring_length: 10,
        ..AnalysisConfig::default()
    };
    assert_eq!(check_with(source, "m.py", &config).findings, vec![]);
}

#[test]
fn test_quality_predicate() {
    assert!(is_quality_docstring("Return the parsed configuration.", 20));
    assert!(is_quality_docstring("Example: pass a list of names", 20));
    assert!(!is_quality_docstring("Too short.", 20));
    assert!(!is_quality_docstring("No punctuation anywhere in this text", 20));
}

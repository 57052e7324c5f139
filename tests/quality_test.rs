// Unit tests for structure rules
// Tests parameter counts, complexity and nesting depth

use indoc::indoc;
use pretty_assertions::assert_eq;
use pyreview_rs::metrics::compute_metrics;
use pyreview_rs::parser::parse;
use pyreview_rs::rules::quality::detect_structure;
use pyreview_rs::{AnalysisConfig, Finding, Rule, Severity};

fn scan_with(source: &str, config: &AnalysisConfig) -> Vec<Finding> {
    let tree = parse(source, Some("shapes.py")).expect("Failed to parse");
    let metrics = compute_metrics(&tree).expect("metrics failed");
    detect_structure(&tree, source, &metrics, config)
}

fn scan(source: &str) -> Vec<Finding> {
    scan_with(source, &AnalysisConfig::default())
}

#[test]
fn test_deeply_nested_code_detection() {
    let source = indoc! {r#"
        def deeply_nested():
            if True:
                if True:
                    if True:
                        if True:
                            if True:
                                if True:
                                    print("too deep")
    "#};
    let findings = scan(source);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, Rule::DeepNesting);
    assert_eq!(findings[0].severity, Severity::Info);
    assert_eq!(findings[0].line, 1);
    assert!(findings[0].message.contains("depth 6"));
}

#[test]
fn test_acceptable_nesting() {
    let source = indoc! {r#"
        def normal_function():
            if True:
                for item in range(10):
                    print(item)
    "#};
    assert_eq!(scan(source), vec![]);
}

#[test]
fn test_too_many_params() {
    let source = indoc! {r#"
        def configure(host, port, user, password, timeout, retries):
            pass

        class Service:
            def start(self, host, port, user, password, timeout):
                pass
    "#};
    let findings = scan(source);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, Rule::TooManyParams);
    assert_eq!(findings[0].unit.as_deref(), Some("shapes.configure"));
    assert!(findings[0].message.contains("6 parameters"));
}

#[test]
fn test_high_complexity() {
    let source = indoc! {r#"
        def route(request):
            if request.a:
                return 1
            if request.b or request.c:
                return 2
            for item in request.items:
                pass
            return 0
    "#};
    assert_eq!(scan(source), vec![]);

    let config = AnalysisConfig {
        max_complexity: 3,
        ..AnalysisConfig::default()
    };
    let findings = scan_with(source, &config);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, Rule::HighComplexity);
    assert_eq!(findings[0].severity, Severity::Warning);
    assert!(findings[0].message.contains("complexity 5"));
}

#[test]
fn test_thresholds_are_exclusive() {
    let source = indoc! {r#"
        def five(a, b, c, d, e):
            pass
    "#};
    assert_eq!(scan(source), vec![]);
}

use indoc::indoc;
use pretty_assertions::assert_eq;
use pyreview_rs::{analyze, AnalysisConfig, Rule};

#[test]
fn test_analyze_respects_ignore_pragmas() {
    let source = indoc! {r#"
        """Settings for the demo deployment."""

        password = "supersecretvalue123"
        api_token = "anothersecretvalue"  # pragma: no review

        def unchecked(code):  # pragma: no review
            return eval(code)
    "#};
    let report = analyze(source, Some("demo.py"), &AnalysisConfig::default()).unwrap();

    let lines: Vec<(Rule, usize)> = report
        .findings()
        .iter()
        .map(|f| (f.rule_id, f.line))
        .collect();
    // Line 7 is not silenced by the pragma on line 6.
    assert_eq!(
        lines,
        vec![(Rule::HardcodedSecret, 3), (Rule::UnsafeCall, 7)]
    );
}

#[test]
fn test_pragmas_can_be_disabled() {
    let source = "password = \"supersecretvalue123\"  # pragma: no review\n";
    let config = AnalysisConfig {
        honor_pragmas: false,
        ..AnalysisConfig::default()
    };
    let report = analyze(source, Some("demo.py"), &config).unwrap();
    assert_eq!(report.findings_for(Rule::HardcodedSecret).count(), 1);
}

use indoc::indoc;
use pretty_assertions::assert_eq;
use pyreview_rs::{
    analyze, AnalysisConfig, Analyzer, Category, Rule, RuleFamily, Severity, SourceInput,
};

const SERVICE: &str = indoc! {r#"
    """Account service used by the web handlers."""

    import os

    DB_PASSWORD = "p4ssw0rd-prod-2024"

    def find_user(cursor, name):
        """Look up a user by name.

        Args:
            cursor: Database cursor.
            name: User name.

        Returns:
            The matching row.
        """
        cursor.execute(f"SELECT * FROM users WHERE name = '{name}'")
        return cursor.fetchone()

    def export(rows):
        out = ""
        for row in rows:
            out += str(row)
        return out
"#};

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).expect("default config is valid")
}

#[test]
fn test_analyze_basic() {
    let report = analyzer().analyze(SERVICE, Some("service.py")).unwrap();

    assert!(report.parse_ok());
    assert_eq!(report.file(), Some("service.py"));

    let findings: Vec<(usize, Rule)> = report
        .findings()
        .iter()
        .map(|f| (f.line, f.rule_id))
        .collect();
    assert_eq!(
        findings,
        vec![
            (5, Rule::HardcodedSecret),
            (17, Rule::InjectionStringBuilding),
            (20, Rule::MissingDoc),
            (23, Rule::LoopConcatenation),
        ]
    );

    let units: Vec<&str> = report
        .units()
        .iter()
        .map(|u| u.qualified_name.as_str())
        .collect();
    assert_eq!(units, vec!["service", "service.find_user", "service.export"]);
    assert_eq!(report.metrics().len(), 3);
    assert_eq!(report.metrics_for("service").unwrap().import_count, 1);
    assert_eq!(report.metrics_for("service.export").unwrap().cyclomatic_complexity, 2);
    assert!((report.coverage().unwrap() - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_findings_sorted_by_line_then_category() {
    let source = indoc! {r#"
        def f(cursor, a, b, c, d, e, items):
            for x in items:
                for y in items:
                    cursor.execute("SELECT " + x)
    "#};
    let report = analyzer().analyze(source, Some("sorting.py")).unwrap();

    let findings: Vec<(usize, Category, Rule)> = report
        .findings()
        .iter()
        .map(|f| (f.line, f.category, f.rule_id))
        .collect();
    assert_eq!(
        findings,
        vec![
            (1, Category::Documentation, Rule::MissingDoc),
            (1, Category::Documentation, Rule::MissingDoc),
            (1, Category::Structure, Rule::TooManyParams),
            (3, Category::Performance, Rule::NestedLoopSameCollection),
            (4, Category::Security, Rule::InjectionStringBuilding),
        ]
    );
    // Ties keep detector order: the module comes before the function.
    assert_eq!(report.findings()[0].unit.as_deref(), Some("sorting"));
    assert_eq!(report.findings()[1].unit.as_deref(), Some("sorting.f"));
}

#[test]
fn test_invalid_syntax() {
    let source = indoc! {r#"
        password = "supersecretvalue123"

        def broken(:
            pass
    "#};
    let report = analyzer().analyze(source, Some("broken.py")).unwrap();

    assert!(!report.parse_ok());
    assert_eq!(report.findings().len(), 1);
    let finding = &report.findings()[0];
    assert_eq!(finding.rule_id, Rule::SyntaxError);
    assert_eq!(finding.category, Category::Structure);
    assert_eq!(finding.severity, Severity::Error);
    assert_eq!(finding.line, 3);
    assert_eq!(finding.unit, None);
    assert!(report.units().is_empty());
    assert!(report.metrics().is_empty());
    assert_eq!(report.coverage(), None);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["parse_ok"], serde_json::json!(false));
    assert_eq!(json["coverage"], serde_json::Value::Null);
}

#[test]
fn test_idempotence() {
    let first = analyzer().analyze(SERVICE, Some("service.py")).unwrap();
    let second = analyzer().analyze(SERVICE, Some("service.py")).unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_detector_independence() {
    let full = analyzer().analyze(SERVICE, Some("service.py")).unwrap();
    let security_only = analyze(
        SERVICE,
        Some("service.py"),
        &AnalysisConfig::only([
            RuleFamily::HardcodedSecret,
            RuleFamily::TokenPattern,
            RuleFamily::UnsafeCall,
            RuleFamily::Injection,
        ]),
    )
    .unwrap();

    let full_security: Vec<_> = full.findings_in(Category::Security).cloned().collect();
    let only_security: Vec<_> = security_only.findings().to_vec();
    assert_eq!(full_security, only_security);
    // Coverage does not depend on which families run.
    assert_eq!(full.coverage(), security_only.coverage());
}

#[test]
fn test_monotonicity() {
    let narrow = analyze(
        SERVICE,
        Some("service.py"),
        &AnalysisConfig::only([RuleFamily::MissingDoc, RuleFamily::LoopConcatenation]),
    )
    .unwrap();
    let wide = analyzer().analyze(SERVICE, Some("service.py")).unwrap();

    assert!(narrow.findings().len() <= wide.findings().len());
    for finding in narrow.findings() {
        assert!(wide.findings().contains(finding), "missing {:?}", finding);
    }
}

#[test]
fn test_summary_counts() {
    let report = analyzer().analyze(SERVICE, Some("service.py")).unwrap();
    let summary = report.summary();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.by_category.get(&Category::Security), Some(&2));
    assert_eq!(summary.by_category.get(&Category::Performance), Some(&1));
    assert_eq!(summary.by_category.get(&Category::Documentation), Some(&1));
    assert_eq!(summary.by_category.get(&Category::Structure), None);
    assert_eq!(summary.by_severity.get(&Severity::Error), Some(&2));
    assert_eq!(summary.by_severity.get(&Severity::Warning), Some(&2));
}

#[test]
fn test_json_shape() {
    let report = analyzer().analyze(SERVICE, Some("service.py")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["file"], "service.py");
    assert_eq!(json["parse_ok"], true);
    let first = &json["findings"][0];
    assert_eq!(first["rule_id"], "hardcoded-secret");
    assert_eq!(first["category"], "security");
    assert_eq!(first["severity"], "error");
    assert_eq!(first["unit"], "service");
    assert_eq!(first["line"], 5);
    assert_eq!(json["metrics"]["service.export"]["cyclomatic_complexity"], 2);
    assert_eq!(json["units"][1]["kind"], "function");
    assert_eq!(json["summary"]["by_category"]["security"], 2);
}

#[test]
fn test_analyze_batch_keeps_order() {
    let inputs = vec![
        SourceInput::new(SERVICE, Some("service.py")),
        SourceInput::new("def broken(:\n", Some("broken.py")),
        SourceInput::new("\"\"\"Empty module with a docstring.\"\"\"\n", None),
    ];
    let reports = analyzer().analyze_batch(&inputs);

    assert_eq!(reports.len(), 3);
    let reports: Vec<_> = reports.into_iter().map(Result::unwrap).collect();
    assert_eq!(reports[0].file(), Some("service.py"));
    assert!(!reports[1].parse_ok());
    assert_eq!(reports[2].file(), None);
    assert!(reports[2].findings().is_empty());
    assert_eq!(reports[2].coverage(), Some(1.0));
}

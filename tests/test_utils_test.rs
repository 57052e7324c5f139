// Unit tests for test awareness
// Tests detection of test files and test helpers

use indoc::indoc;
use pyreview_rs::parser::parse;
use pyreview_rs::test_utils::{is_test_file, TestAwareness};

#[test]
fn test_pytest_function_detection() {
    let source = indoc! {r#"
        def test_something():
            assert True

        def test_another_thing():
            assert 1 + 1 == 2

        def regular_function():
            return 42
    "#};
    let tree = parse(source, Some("checks.py")).expect("Failed to parse");
    let awareness = TestAwareness::new(&tree);

    assert!(!awareness.is_test_file);
    let helpers: Vec<&str> = tree
        .units()
        .iter()
        .filter(|unit| awareness.is_test_helper(unit.id))
        .map(|unit| unit.name.as_str())
        .collect();
    assert_eq!(helpers, vec!["test_something", "test_another_thing"]);
}

#[test]
fn test_test_classes_mark_their_members() {
    let source = indoc! {r#"
        class TestParser:
            def setup(self):
                pass

        class ParserTest:
            def check(self):
                pass

        @pytest.mark.slow
        def exercise():
            pass

        class Parser:
            def parse(self):
                pass
    "#};
    let tree = parse(source, Some("parser.py")).expect("Failed to parse");
    let awareness = TestAwareness::new(&tree);

    for name in [
        "parser.TestParser",
        "parser.TestParser.setup",
        "parser.ParserTest.check",
        "parser.exercise",
    ] {
        let unit = tree.find_by_qualified_name(name).unwrap();
        assert!(awareness.is_test_helper(unit.id), "{} should be a test helper", name);
    }
    for name in ["parser", "parser.Parser", "parser.Parser.parse"] {
        let unit = tree.find_by_qualified_name(name).unwrap();
        assert!(!awareness.is_test_helper(unit.id), "{} is not a test helper", name);
    }
}

#[test]
fn test_file_name_detection() {
    let test_files = vec![
        "test_module.py",
        "module_test.py",
        "tests/something.py",
        "src/test/helpers.py",
        "pkg\\tests\\conftest.py",
    ];

    for filename in test_files {
        assert!(is_test_file(filename), "Should detect {} as test file", filename);

        let tree = parse("def foo(): pass", Some(filename)).expect("Failed to parse");
        let awareness = TestAwareness::new(&tree);
        assert!(awareness.is_test_file);
        assert!(tree.units()[1..]
            .iter()
            .all(|unit| awareness.is_test_helper(unit.id)));
    }
}

#[test]
fn test_non_test_file_detection() {
    for filename in ["regular_module.py", "contest.py", "latest.py", "attestation/core.py"] {
        assert!(!is_test_file(filename), "Should not detect {} as test file", filename);
    }
}

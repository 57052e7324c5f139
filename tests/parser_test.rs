// Integration tests for the structural parser
// Tests unit inventory, qualified names, docstrings and syntax failures

use indoc::indoc;
use pretty_assertions::assert_eq;
use pyreview_rs::parser::{parse, ANONYMOUS_MODULE};
use pyreview_rs::{UnitId, UnitKind};

#[test]
fn test_unit_inventory_in_pre_order() {
    let source = indoc! {r#"
        """Inventory module."""

        class Store:
            """A store."""

            def add(self, item):
                def check(value):
                    return value is not None
                return check(item)

        def main():
            pass
    "#};
    let tree = parse(source, Some("pkg/inventory.py")).expect("Failed to parse");

    let names: Vec<&str> = tree
        .units()
        .iter()
        .map(|u| u.qualified_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "inventory",
            "inventory.Store",
            "inventory.Store.add",
            "inventory.Store.add.check",
            "inventory.main",
        ]
    );

    let kinds: Vec<UnitKind> = tree.units().iter().map(|u| u.kind).collect();
    assert_eq!(
        kinds,
        vec![
            UnitKind::Module,
            UnitKind::Class,
            UnitKind::Function,
            UnitKind::Function,
            UnitKind::Function,
        ]
    );

    let check = tree
        .find_by_qualified_name("inventory.Store.add.check")
        .expect("nested function");
    assert_eq!(check.start_line, 7);
    assert_eq!(check.end_line, 8);
    assert_eq!(tree.parent(check.id).map(|p| p.name.as_str()), Some("add"));
    assert_eq!(tree.depth(check.id), 3);

    let store = tree.find_by_qualified_name("inventory.Store").expect("class");
    assert_eq!(store.start_line, 3);
    assert_eq!(store.end_line, 9);
    assert_eq!(tree.children(store.id).len(), 1);

    assert_eq!(tree.root().start_line, 1);
    assert_eq!(tree.root().end_line, 12);
    assert_eq!(tree.root().parent, None);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_definitions_inside_control_flow() {
    let source = indoc! {r#"
        import sys

        if sys.version_info >= (3, 8):
            def compat():
                return 1
        else:
            def compat():
                return 2

        try:
            class Loader:
                pass
        except ImportError:
            Loader = None
    "#};
    let tree = parse(source, None).expect("Failed to parse");

    let names: Vec<&str> = tree
        .units()
        .iter()
        .map(|u| u.qualified_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            ANONYMOUS_MODULE,
            "<module>.compat",
            "<module>.compat@7",
            "<module>.Loader",
        ]
    );
    // Both definitions hang off the module, not off the `if`.
    assert!(tree.units()[1..]
        .iter()
        .all(|unit| unit.parent == Some(UnitId::ROOT)));
}

#[test]
fn test_docstrings_are_cleaned() {
    let source = indoc! {r#"
        def documented():
            """
            Summary line.

                Indented detail.
            """

        def undocumented():
            value = "not a docstring"
            return value

        def late():
            pass
            """Too late to be a docstring."""
    "#};
    let tree = parse(source, Some("docs.py")).expect("Failed to parse");

    let documented = tree.find_by_qualified_name("docs.documented").unwrap();
    assert_eq!(
        documented.docstring.as_deref(),
        Some("Summary line.\n\n    Indented detail.")
    );
    assert_eq!(tree.find_by_qualified_name("docs.undocumented").unwrap().docstring, None);
    assert_eq!(tree.find_by_qualified_name("docs.late").unwrap().docstring, None);
    assert_eq!(tree.root().docstring, None);
}

#[test]
fn test_signature_details() {
    let source = indoc! {r#"
        class Api:
            @staticmethod
            def build(a, b=1, *args, key, **options):
                return a

            @pytest.fixture(scope="module")
            async def fetch(self, /, url):
                return None

            def noop(cls):
                def inner():
                    return 42
                return
    "#};
    let tree = parse(source, Some("api.py")).expect("Failed to parse");

    let build = tree.find_by_qualified_name("api.Api.build").unwrap();
    assert_eq!(build.params, vec!["a", "b", "args", "key", "options"]);
    assert_eq!(build.decorators, vec!["staticmethod"]);
    assert!(build.returns_value);
    assert!(!build.is_async);

    let fetch = tree.find_by_qualified_name("api.Api.fetch").unwrap();
    assert_eq!(fetch.params, vec!["self", "url"]);
    assert_eq!(fetch.explicit_params().collect::<Vec<_>>(), vec!["url"]);
    assert_eq!(fetch.decorators, vec!["pytest.fixture"]);
    assert!(!fetch.returns_value);
    assert!(fetch.is_async);

    // `return 42` belongs to `inner`, not to `noop`.
    let noop = tree.find_by_qualified_name("api.Api.noop").unwrap();
    assert!(!noop.returns_value);
    assert!(tree.find_by_qualified_name("api.Api.noop.inner").unwrap().returns_value);
}

#[test]
fn test_spans_nest_within_parents() {
    let source = indoc! {r#"
        class Outer:
            class Inner:
                def method(self):
                    pass

            def sibling(self):
                pass
    "#};
    let tree = parse(source, Some("spans.py")).expect("Failed to parse");

    for unit in &tree.units()[1..] {
        let parent = tree.parent(unit.id).expect("non-root unit has a parent");
        assert!(parent.span.contains(&unit.span), "{} escapes its parent", unit.qualified_name);
        assert!(parent.id < unit.id);
    }
    let outer = tree.find_by_qualified_name("spans.Outer").unwrap();
    let children: Vec<&str> = tree
        .children(outer.id)
        .iter()
        .map(|id| tree.get(*id).unwrap().name.as_str())
        .collect();
    assert_eq!(children, vec!["Inner", "sibling"]);
    assert_eq!(tree.descendants(outer.id).count(), 3);
    assert_eq!(tree.innermost_at_line(4).qualified_name, "spans.Outer.Inner.method");
    assert_eq!(tree.innermost_at_line(6).qualified_name, "spans.Outer.sibling");
}

#[test]
fn test_empty_source() {
    let tree = parse("", Some("empty.py")).expect("Failed to parse");
    assert_eq!(tree.units().len(), 1);
    assert_eq!(tree.root().name, "empty");
    assert_eq!(tree.root().end_line, 1);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_syntax_failure() {
    let source = "def broken(:\n    pass\n";
    let failure = parse(source, Some("broken.py")).unwrap_err();
    assert_eq!(failure.line, 1);
    assert!(failure.column >= 1);
    assert!(!failure.message.is_empty());
}

#[test]
fn test_syntax_failure_on_later_line() {
    let source = indoc! {r#"
        def fine():
            return 1

        x = = 2
    "#};
    let failure = parse(source, None).unwrap_err();
    assert_eq!(failure.line, 4);
}

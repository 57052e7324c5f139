use crate::tree::{AnalysisTree, SourceUnit, UnitId, UnitKind};
use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    // Files in test/tests directories, `test_*.py` files and `*_test.py` files.
    static ref TEST_FILE_RE: Regex =
        Regex::new(r"(?:^|[/\\])tests?[/\\]|(?:^|[/\\])test_[^/\\]*\.py$|_test\.py$").unwrap();
}

/// Whether a file path looks like a test module.
pub fn is_test_file(path: &str) -> bool {
    TEST_FILE_RE.is_match(path)
}

/// Whether a single unit is test code on its own merits.
///
/// Functions named `test_*` / `*_test`, classes named `Test*` / `*Test`, and
/// anything decorated with a pytest fixture or marker.
pub fn is_test_unit(unit: &SourceUnit) -> bool {
    let by_name = match unit.kind {
        UnitKind::Function => unit.name.starts_with("test_") || unit.name.ends_with("_test"),
        UnitKind::Class => unit.name.starts_with("Test") || unit.name.ends_with("Test"),
        UnitKind::Module => false,
    };
    by_name
        || unit
            .decorators
            .iter()
            .any(|decorator| decorator.contains("pytest") || decorator.contains("fixture"))
}

/// Test-related knowledge about one tree.
///
/// Documentation rules skip test helpers: a unit that is test code itself, a
/// unit nested inside test code, or any unit of a test file.
pub struct TestAwareness {
    /// Indicates if the analyzed file is considered a test file based on its path.
    pub is_test_file: bool,
    /// Units treated as test helpers.
    pub test_units: HashSet<UnitId>,
}

impl TestAwareness {
    pub fn new(tree: &AnalysisTree) -> Self {
        let is_test_file = tree.path().is_some_and(is_test_file);
        let mut test_units = HashSet::new();

        // Units are in pre-order, so parents are classified before children.
        for unit in tree.units() {
            if unit.kind == UnitKind::Module {
                continue;
            }
            let inherited = unit
                .parent
                .is_some_and(|parent| test_units.contains(&parent));
            if is_test_file || inherited || is_test_unit(unit) {
                test_units.insert(unit.id);
            }
        }

        Self {
            is_test_file,
            test_units,
        }
    }

    pub fn is_test_helper(&self, id: UnitId) -> bool {
        self.test_units.contains(&id)
    }
}

use crate::config::AnalysisConfig;
use crate::rules::{Finding, FindingSink, Rule, RuleFamily, Severity};
use crate::test_utils::TestAwareness;
use crate::tree::{AnalysisTree, SourceUnit, UnitKind};

/// Characters that end a sentence in a docstring.
const SENTENCE_PUNCTUATION: &[char] = &['.', '!', '?', ':'];

/// Section markers that document parameters (Google, NumPy and reST styles).
const PARAM_SECTIONS: &[&str] = &["Args:", "Arguments:", "Parameters", "Params:", ":param"];

/// Section markers that document a return value.
const RETURN_SECTIONS: &[&str] = &["Returns", "Return:", "Yields", ":return", ":rtype"];

/// Documentation findings plus the coverage ratio over eligible units.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentationOutcome {
    pub findings: Vec<Finding>,
    /// Documented eligible units divided by eligible units, in `[0, 1]`.
    pub coverage: f64,
}

/// Whether a docstring is long enough and reads like a sentence.
pub fn is_quality_docstring(docstring: &str, min_length: usize) -> bool {
    docstring.chars().count() >= min_length && docstring.contains(SENTENCE_PUNCTUATION)
}

fn mentions_any(docstring: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| docstring.contains(marker))
}

fn describe(unit: &SourceUnit) -> &'static str {
    match unit.kind {
        UnitKind::Module => "Module",
        UnitKind::Class => "Class",
        UnitKind::Function => "Function",
    }
}

/// Checks docstring presence and quality for every eligible unit.
///
/// The module is always eligible. Classes and functions are eligible unless
/// their name starts with `_` or they are test helpers. Coverage is computed
/// over the same set whatever families are enabled.
pub fn detect_documentation(tree: &AnalysisTree, source: &str, config: &AnalysisConfig) -> DocumentationOutcome {
    let awareness = TestAwareness::new(tree);
    let mut sink = FindingSink::new(tree, source, config.honor_pragmas);
    let mut eligible = 0usize;
    let mut documented = 0usize;

    for unit in tree.units() {
        let is_eligible = unit.kind == UnitKind::Module
            || (!unit.is_private() && !awareness.is_test_helper(unit.id));
        if !is_eligible {
            continue;
        }
        eligible += 1;

        let Some(docstring) = unit.docstring.as_deref() else {
            if config.is_enabled(RuleFamily::MissingDoc) {
                sink.push(
                    Rule::MissingDoc,
                    Severity::Warning,
                    format!("{} `{}` has no docstring", describe(unit), unit.name),
                    Some(unit.id),
                    unit.start_line,
                );
            }
            continue;
        };
        documented += 1;

        if !is_quality_docstring(docstring, config.min_docstring_length) {
            if config.is_enabled(RuleFamily::LowQualityDoc) {
                sink.push(
                    Rule::LowQualityDoc,
                    Severity::Info,
                    format!(
                        "{} `{}` has a docstring that is too brief or not a sentence (minimum {} characters)",
                        describe(unit),
                        unit.name,
                        config.min_docstring_length
                    ),
                    Some(unit.id),
                    unit.start_line,
                );
            }
            continue;
        }

        if unit.kind != UnitKind::Function || !config.is_enabled(RuleFamily::DocSections) {
            continue;
        }
        let params: Vec<&str> = unit.explicit_params().collect();
        if !params.is_empty() && !mentions_any(docstring, PARAM_SECTIONS) {
            sink.push(
                Rule::UndocumentedParams,
                Severity::Info,
                format!(
                    "Docstring of `{}` does not document its parameters ({})",
                    unit.name,
                    params.join(", ")
                ),
                Some(unit.id),
                unit.start_line,
            );
        }
        if unit.returns_value && !mentions_any(docstring, RETURN_SECTIONS) {
            sink.push(
                Rule::UndocumentedReturns,
                Severity::Info,
                format!("Docstring of `{}` does not document its return value", unit.name),
                Some(unit.id),
                unit.start_line,
            );
        }
    }

    // The module is always eligible, so `eligible` is at least 1.
    let coverage = documented as f64 / eligible.max(1) as f64;
    DocumentationOutcome {
        findings: sink.into_findings(),
        coverage,
    }
}

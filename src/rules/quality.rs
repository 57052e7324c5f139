use crate::config::AnalysisConfig;
use crate::metrics::Metrics;
use crate::rules::{Finding, FindingSink, Rule, RuleFamily, Severity};
use crate::tree::{AnalysisTree, UnitId, UnitKind};
use std::collections::BTreeMap;

/// Checks structural thresholds against precomputed metrics.
///
/// - `too-many-params`: a function declares more than `max_params`
///   parameters, not counting `self` / `cls`.
/// - `high-complexity`: a function's cyclomatic complexity exceeds
///   `max_complexity`.
/// - `deep-nesting`: control blocks in a unit's own body nest deeper than
///   `max_nesting_depth`.
pub fn detect_structure(
    tree: &AnalysisTree,
    source: &str,
    metrics: &BTreeMap<UnitId, Metrics>,
    config: &AnalysisConfig,
) -> Vec<Finding> {
    let mut sink = FindingSink::new(tree, source, config.honor_pragmas);

    for unit in tree.units() {
        let Some(unit_metrics) = metrics.get(&unit.id) else {
            continue;
        };

        if unit.kind == UnitKind::Function {
            let params = unit.explicit_params().count();
            if config.is_enabled(RuleFamily::TooManyParams) && params > config.max_params {
                sink.push(
                    Rule::TooManyParams,
                    Severity::Info,
                    format!(
                        "Function `{}` has {} parameters (more than {}); consider grouping them",
                        unit.name, params, config.max_params
                    ),
                    Some(unit.id),
                    unit.start_line,
                );
            }

            let complexity = unit_metrics.cyclomatic_complexity;
            if config.is_enabled(RuleFamily::HighComplexity) && complexity > config.max_complexity {
                sink.push(
                    Rule::HighComplexity,
                    Severity::Warning,
                    format!(
                        "Function `{}` has cyclomatic complexity {} (limit {})",
                        unit.name, complexity, config.max_complexity
                    ),
                    Some(unit.id),
                    unit.start_line,
                );
            }
        }

        let nesting = unit_metrics.max_nesting;
        if config.is_enabled(RuleFamily::DeepNesting) && nesting > config.max_nesting_depth {
            sink.push(
                Rule::DeepNesting,
                Severity::Info,
                format!("Deeply nested code (depth {}) in `{}`", nesting, unit.name),
                Some(unit.id),
                unit.start_line,
            );
        }
    }

    sink.into_findings()
}

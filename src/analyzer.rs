use crate::config::AnalysisConfig;
use crate::error::{ConfigurationError, Result};
use crate::metrics::compute_metrics;
use crate::parser::parse;
use crate::report::{aggregate, AnalysisReport};
use crate::rules::documentation::detect_documentation;
use crate::rules::performance::detect_performance;
use crate::rules::quality::detect_structure;
use crate::rules::{detect_security, Category};
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};

/// One source text to analyze, with the path it was read from if any.
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub source: &'a str,
    pub path: Option<&'a str>,
}

impl<'a> SourceInput<'a> {
    pub fn new(source: &'a str, path: Option<&'a str>) -> Self {
        Self { source, path }
    }
}

/// The main analyzer.
/// Holds a validated configuration; every analysis is independent of the others.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Creates an analyzer, rejecting invalid configurations up front.
    pub fn new(config: AnalysisConfig) -> std::result::Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes one source text.
    ///
    /// This method:
    /// 1. Parses the source into an `AnalysisTree`.
    ///    Unparsable input yields a report with one `syntax-error` finding.
    /// 2. Checks the tree invariants.
    /// 3. Computes metrics and runs the security, performance and documentation
    ///    detectors in parallel over the shared tree.
    /// 4. Runs the structure rules over the metrics.
    /// 5. Aggregates everything into an `AnalysisReport`.
    pub fn analyze(&self, source: &str, path: Option<&str>) -> Result<AnalysisReport> {
        let span = debug_span!("analyze", path = path.unwrap_or("<module>"));
        let _guard = span.enter();

        let tree = match parse(source, path) {
            Ok(tree) => tree,
            Err(failure) => {
                debug!(line = failure.line, column = failure.column, "source does not parse");
                return Ok(AnalysisReport::syntax_failure(path, &failure));
            }
        };
        debug!(units = tree.units().len(), "parsed source");

        if let Err(err) = tree.validate() {
            warn!(error = %err, "analysis aborted");
            return Err(err.into());
        }

        let config = &self.config;
        let (metrics, (security, (performance, documentation))) = rayon::join(
            || compute_metrics(&tree),
            || {
                rayon::join(
                    || {
                        if config.category_enabled(Category::Security) {
                            detect_security(&tree, source, config)
                        } else {
                            Ok(Vec::new())
                        }
                    },
                    || {
                        rayon::join(
                            || {
                                if config.category_enabled(Category::Performance) {
                                    detect_performance(&tree, source, config)
                                } else {
                                    Ok(Vec::new())
                                }
                            },
                            || detect_documentation(&tree, source, config),
                        )
                    },
                )
            },
        );

        let (metrics, security, performance) = match (metrics, security, performance) {
            (Ok(metrics), Ok(security), Ok(performance)) => (metrics, security, performance),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                warn!(error = %err, "analysis aborted");
                return Err(err.into());
            }
        };

        let structure = detect_structure(&tree, source, &metrics, config);
        debug!(
            security = security.len(),
            performance = performance.len(),
            documentation = documentation.findings.len(),
            structure = structure.len(),
            coverage = documentation.coverage,
            "detectors finished"
        );

        Ok(aggregate(
            &tree,
            &metrics,
            documentation.coverage,
            vec![security, performance, documentation.findings, structure],
        ))
    }

    /// Analyzes independent inputs in parallel. Results keep the input order.
    pub fn analyze_batch(&self, inputs: &[SourceInput<'_>]) -> Vec<Result<AnalysisReport>> {
        inputs
            .par_iter()
            .map(|input| self.analyze(input.source, input.path))
            .collect()
    }
}

/// Validates `config` and analyzes one source text.
pub fn analyze(source: &str, path: Option<&str>, config: &AnalysisConfig) -> Result<AnalysisReport> {
    Analyzer::new(config.clone())?.analyze(source, path)
}

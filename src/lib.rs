// Lib file to expose modules for testing and external usage.
// This file serves as the root for the library crate.

/// Module containing the analysis entry points.
/// This includes the `Analyzer` struct and the free `analyze` function.
pub mod analyzer;

/// Module containing the analysis configuration (rule families and thresholds).
pub mod config;

/// Module defining the error types propagated by an analysis.
pub mod error;

/// Module computing per-unit metrics (size, nesting, complexity, imports).
pub mod metrics;

/// Module containing the structural parser.
/// This turns source text into an `AnalysisTree`.
pub mod parser;

/// Module defining the report returned to callers.
pub mod report;

/// Module containing the implementation of the analysis rules.
/// This includes rules for security, performance, documentation and structure.
pub mod rules;

/// Module containing test-awareness helpers.
/// This recognizes test files and test helpers, which documentation rules skip.
pub mod test_utils;

/// Module defining the unit inventory (`AnalysisTree`, `SourceUnit`).
pub mod tree;

/// Module containing utility functions.
/// This includes line mapping, pragma detection and docstring cleanup.
pub mod utils;

/// Module containing the AST traversal used by the parser and the detectors.
pub mod visitor;

pub use analyzer::{analyze, Analyzer, SourceInput};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ConfigurationError, InternalAnalysisError, SyntaxFailure};
pub use metrics::Metrics;
pub use report::AnalysisReport;
pub use rules::{Category, Finding, Rule, RuleFamily, Severity};
pub use tree::{AnalysisTree, SourceUnit, Span, UnitId, UnitKind};

//! Error types for the analysis core.
//!
//! Unparsable input is not an error here: it becomes a [`SyntaxFailure`] that the
//! report turns into a single structure finding. Only caller misuse
//! ([`ConfigurationError`]) and programming defects ([`InternalAnalysisError`])
//! are propagated.

use serde::Serialize;
use thiserror::Error;

/// Result type for a whole analysis invocation.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that abort an analysis invocation.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The configuration was rejected before parsing began.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A detector or the parser hit a state that should be impossible.
    #[error(transparent)]
    Internal(#[from] InternalAnalysisError),
}

/// Invalid rule or threshold configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A numeric threshold is outside its accepted range.
    #[error("invalid threshold `{name}` = {value}: {reason}")]
    InvalidThreshold {
        /// Name of the configuration key.
        name: &'static str,
        /// The rejected value.
        value: usize,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// Every rule family was disabled, so the analysis could not report anything.
    #[error("no rule families are enabled")]
    NoRulesEnabled,

    /// The TOML configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// An unexpected tree shape or broken invariant.
///
/// These indicate a bug in the analyzer, never a problem with the analyzed code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal analysis error in {component}: {message}")]
pub struct InternalAnalysisError {
    /// The component that detected the problem (e.g. "parser", "security").
    pub component: &'static str,
    /// Description of the problem.
    pub message: String,
}

impl InternalAnalysisError {
    pub fn new(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            component,
            message: message.into(),
        }
    }
}

/// The source text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxFailure {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column (in characters) of the offending token.
    pub column: usize,
    /// Parser message.
    pub message: String,
}

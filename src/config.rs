//! Analysis configuration: enabled rule families and thresholds.
//!
//! Configuration is an immutable value handed to every detector call. It can be
//! built in code or read from TOML text supplied by the caller:
//!
//! ```toml
//! enabled = ["hardcoded-secret", "unsafe-call", "missing-doc"]
//! min_secret_length = 12
//! min_docstring_length = 15
//! ```

use crate::error::ConfigurationError;
use crate::rules::{Category, RuleFamily};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Which rule families run and with which thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Enabled rule families. Every family is enabled by default.
    pub enabled: BTreeSet<RuleFamily>,
    /// Minimum length of a literal before it can be reported as a hardcoded secret.
    pub min_secret_length: usize,
    /// Docstrings shorter than this are reported as low quality.
    pub min_docstring_length: usize,
    /// Explicit parameters allowed before `too-many-params` fires.
    pub max_params: usize,
    /// Cyclomatic complexity allowed before `high-complexity` fires.
    pub max_complexity: usize,
    /// Block nesting allowed before `deep-nesting` fires.
    pub max_nesting_depth: usize,
    /// Whether `# pragma: no review` silences findings on its line.
    pub honor_pragmas: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: RuleFamily::ALL.into_iter().collect(),
            min_secret_length: 8,
            min_docstring_length: 20,
            max_params: 5,
            max_complexity: 10,
            max_nesting_depth: 5,
            honor_pragmas: true,
        }
    }
}

impl AnalysisConfig {
    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let config: AnalysisConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// A configuration with only the given families enabled.
    pub fn only(families: impl IntoIterator<Item = RuleFamily>) -> Self {
        Self {
            enabled: families.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Returns a copy with `family` switched on or off.
    pub fn with_family(mut self, family: RuleFamily, enabled: bool) -> Self {
        if enabled {
            self.enabled.insert(family);
        } else {
            self.enabled.remove(&family);
        }
        self
    }

    pub fn is_enabled(&self, family: RuleFamily) -> bool {
        self.enabled.contains(&family)
    }

    /// Whether any family of `category` is enabled.
    pub fn category_enabled(&self, category: Category) -> bool {
        self.enabled
            .iter()
            .any(|family| family.category() == category)
    }

    /// Rejects configurations that indicate caller misuse.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.enabled.is_empty() {
            return Err(ConfigurationError::NoRulesEnabled);
        }
        let positive = [
            ("min_secret_length", self.min_secret_length),
            ("min_docstring_length", self.min_docstring_length),
            ("max_params", self.max_params),
            ("max_complexity", self.max_complexity),
            ("max_nesting_depth", self.max_nesting_depth),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigurationError::InvalidThreshold {
                    name,
                    value,
                    reason: "must be at least 1",
                });
            }
        }
        if self.min_secret_length > 4096 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "min_secret_length",
                value: self.min_secret_length,
                reason: "must not exceed 4096",
            });
        }
        Ok(())
    }
}

use crate::config::AnalysisConfig;
use crate::error::InternalAnalysisError;
use crate::rules::{Finding, FindingSink, Rule, RuleFamily, Severity};
use crate::tree::{AnalysisTree, UnitId};
use crate::visitor::{string_literal, walk_expr, walk_stmt, Visitor};
use regex::Regex;
use rustpython_ast::{Constant, Expr, Stmt};

lazy_static::lazy_static! {
    /// Identifier vocabulary that marks a value as a credential.
    static ref SECRET_NAME_RE: Regex = Regex::new(
        r"(?i)(passw(or)?d|passphrase|secret|token|credential|(api|private|access|signing|encryption|master|client|license|session|hmac|jwt)_?key|^key$|(^|_)(pwd|auth|pass)(_|$))"
    ).unwrap();

    /// Suffixes naming something about a secret rather than the secret itself.
    static ref NON_SECRET_SUFFIX_RE: Regex = Regex::new(
        r"(?i)_(url|uri|endpoint|path|file|filename|dir|name|env|var|field|header|type|len|length|prefix|pattern|regex)$"
    ).unwrap();

    /// Well-known credential formats, matched against any string literal.
    /// Each entry is a tuple of (Description, Regex).
    static ref TOKEN_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("AWS Access Key", Regex::new(r"^(AKIA|ASIA)[A-Z0-9]{16}$").unwrap()),
        ("GitHub token", Regex::new(r"^gh[pousr]_[A-Za-z0-9]{36,}$").unwrap()),
        ("GitLab personal access token", Regex::new(r"^glpat-[A-Za-z0-9_\-]{20,}$").unwrap()),
        ("Slack token", Regex::new(r"^xox[abposr]-[A-Za-z0-9\-]{10,}$").unwrap()),
        ("Stripe live key", Regex::new(r"^(sk|rk)_live_[A-Za-z0-9]{16,}$").unwrap()),
        ("Private key", Regex::new(r"-----BEGIN ([A-Z]+ )?PRIVATE KEY-----").unwrap()),
    ];
}

/// Literal values that are obviously not real credentials.
const PLACEHOLDERS: &[&str] = &[
    "",
    "changeme",
    "change_me",
    "xxx",
    "placeholder",
    "dummy",
    "example",
    "none",
    "null",
    "todo",
    "password",
    "secret",
    "your_api_key",
    "your_token_here",
];

/// Whether an identifier names a credential.
pub fn is_secret_name(name: &str) -> bool {
    SECRET_NAME_RE.is_match(name) && !NON_SECRET_SUFFIX_RE.is_match(name)
}

/// Whether a literal is a placeholder and not worth reporting.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    let lowered = trimmed.to_lowercase();
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return true;
    }
    // Templates such as `<your-token>` or `${TOKEN}`.
    if (trimmed.starts_with('<') && trimmed.ends_with('>'))
        || (trimmed.starts_with("${") && trimmed.ends_with('}'))
    {
        return true;
    }
    // A single repeated character (`********`, `xxxxxxxx`).
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

/// Returns the name of the known credential format `value` matches.
pub fn match_token_pattern(value: &str) -> Option<&'static str> {
    TOKEN_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(value.trim()))
        .map(|(name, _)| *name)
}

/// Runs the hardcoded-secret and token-pattern families over the tree.
pub fn scan_secrets(
    tree: &AnalysisTree,
    source: &str,
    config: &AnalysisConfig,
) -> Result<Vec<Finding>, InternalAnalysisError> {
    let mut visitor = SecretVisitor {
        tree,
        config,
        sink: FindingSink::new(tree, source, config.honor_pragmas),
        stack: vec![UnitId::ROOT],
        error: None,
    };
    visitor.visit_body(tree.statements());
    match visitor.error {
        Some(err) => Err(err),
        None => Ok(visitor.sink.into_findings()),
    }
}

/// Visitor that checks literal assignments and literals for credentials.
struct SecretVisitor<'a> {
    tree: &'a AnalysisTree,
    config: &'a AnalysisConfig,
    sink: FindingSink<'a>,
    /// Enclosing units, innermost last.
    stack: Vec<UnitId>,
    error: Option<InternalAnalysisError>,
}

impl SecretVisitor<'_> {
    fn unit(&self) -> UnitId {
        self.stack.last().copied().unwrap_or(UnitId::ROOT)
    }

    fn line(&self, offset: usize) -> usize {
        self.tree.line_index().line_of(offset)
    }

    fn check_binding(&mut self, name: &str, value: &Expr, offset: usize) {
        if !self.config.is_enabled(RuleFamily::HardcodedSecret) || !is_secret_name(name) {
            return;
        }
        let Some(literal) = string_literal(value) else {
            return;
        };
        if literal.chars().count() < self.config.min_secret_length || is_placeholder(literal) {
            return;
        }
        let line = self.line(offset);
        self.sink.push(
            Rule::HardcodedSecret,
            Severity::Error,
            format!("Hardcoded secret assigned to `{}`; load it from the environment or a secret store", name),
            Some(self.unit()),
            line,
        );
    }

    fn check_target(&mut self, target: &Expr, value: &Expr, offset: usize) {
        match target {
            Expr::Name(node) => self.check_binding(node.id.as_str(), value, offset),
            Expr::Attribute(node) => self.check_binding(node.attr.as_str(), value, offset),
            Expr::Tuple(targets) => {
                // `user, password = "admin", "hunter2hunter2"`
                if let Expr::Tuple(values) = value {
                    for (target, value) in targets.elts.iter().zip(&values.elts) {
                        self.check_target(target, value, offset);
                    }
                }
            }
            _ => {}
        }
    }
}

impl<'ast> Visitor<'ast> for SecretVisitor<'_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => {
                return self.enter_unit(stmt, node.range.start().to_usize());
            }
            Stmt::AsyncFunctionDef(node) => {
                return self.enter_unit(stmt, node.range.start().to_usize());
            }
            Stmt::ClassDef(node) => {
                return self.enter_unit(stmt, node.range.start().to_usize());
            }
            Stmt::Assign(node) => {
                let offset = node.range.start().to_usize();
                for target in &node.targets {
                    self.check_target(target, &node.value, offset);
                }
            }
            Stmt::AnnAssign(node) => {
                if let Some(value) = &node.value {
                    self.check_target(&node.target, value, node.range.start().to_usize());
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Call(node) => {
                let offset = node.range.start().to_usize();
                for keyword in &node.keywords {
                    if let Some(arg) = &keyword.arg {
                        self.check_binding(arg.as_str(), &keyword.value, offset);
                    }
                }
            }
            Expr::Constant(node) if self.config.is_enabled(RuleFamily::TokenPattern) => {
                if let Constant::Str(value) = &node.value {
                    if let Some(kind) = match_token_pattern(value) {
                        let line = self.line(node.range.start().to_usize());
                        self.sink.push(
                            Rule::SecretTokenPattern,
                            Severity::Error,
                            format!("Found potential {} in a string literal", kind),
                            Some(self.unit()),
                            line,
                        );
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

impl SecretVisitor<'_> {
    fn enter_unit(&mut self, stmt: &Stmt, start: usize) {
        match self.tree.require_unit_at("security", start) {
            Ok(id) => {
                self.stack.push(id);
                walk_stmt(self, stmt);
                self.stack.pop();
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }
}

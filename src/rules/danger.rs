use crate::config::AnalysisConfig;
use crate::error::InternalAnalysisError;
use crate::rules::{Finding, FindingSink, Rule, RuleFamily, Severity};
use crate::tree::{AnalysisTree, UnitId};
use crate::visitor::{
    call_attr_name, dotted_name, is_built_string, is_literal, string_literal, walk_expr,
    walk_stmt, Visitor,
};
use rustpython_ast::{self as ast, Constant, Expr, Operator, Stmt};
use std::collections::{HashMap, HashSet};

/// Why a denylisted primitive is dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hazard {
    CodeExecution,
    ShellCommand,
    ProcessExecution,
    Deserialization,
}

impl Hazard {
    fn describe(self) -> &'static str {
        match self {
            Hazard::CodeExecution => "executes arbitrary code",
            Hazard::ShellCommand => "runs a shell command",
            Hazard::ProcessExecution => "replaces or spawns a process",
            Hazard::Deserialization => "deserializes untrusted data, which can execute code",
        }
    }
}

lazy_static::lazy_static! {
    /// Primitives that are flagged regardless of their arguments.
    static ref DENYLIST: HashMap<&'static str, Hazard> = {
        let mut m = HashMap::new();
        for name in ["eval", "exec", "compile", "__import__", "builtins.eval", "builtins.exec"] {
            m.insert(name, Hazard::CodeExecution);
        }
        for name in [
            "os.system",
            "os.popen",
            "subprocess.getoutput",
            "subprocess.getstatusoutput",
            "commands.getoutput",
            "commands.getstatusoutput",
        ] {
            m.insert(name, Hazard::ShellCommand);
        }
        for name in [
            "os.execl", "os.execle", "os.execlp", "os.execlpe", "os.execv", "os.execve",
            "os.execvp", "os.execvpe", "os.spawnl", "os.spawnle", "os.spawnlp", "os.spawnlpe",
            "os.spawnv", "os.spawnve", "os.spawnvp", "os.spawnvpe",
        ] {
            m.insert(name, Hazard::ProcessExecution);
        }
        for name in [
            "pickle.load", "pickle.loads", "cPickle.load", "cPickle.loads", "_pickle.load",
            "_pickle.loads", "dill.load", "dill.loads", "marshal.load", "marshal.loads",
            "shelve.open", "jsonpickle.decode", "yaml.unsafe_load",
        ] {
            m.insert(name, Hazard::Deserialization);
        }
        m
    };

    /// Process APIs that are only dangerous with `shell=True`.
    static ref SHELL_CAPABLE: HashSet<&'static str> = [
        "subprocess.run",
        "subprocess.call",
        "subprocess.Popen",
        "subprocess.check_call",
        "subprocess.check_output",
    ]
    .into_iter()
    .collect();

    /// Methods that run SQL handed to them as a string.
    static ref QUERY_METHODS: HashSet<&'static str> = [
        "execute",
        "executemany",
        "executescript",
        "mogrify",
        "raw",
        "read_sql",
        "read_sql_query",
    ]
    .into_iter()
    .collect();

    /// Functions that turn a string into an executable SQL clause.
    static ref QUERY_FUNCTIONS: HashSet<&'static str> =
        ["sqlalchemy.text", "sqlalchemy.sql.text"].into_iter().collect();

    /// Functions that run a command string.
    static ref COMMAND_FUNCTIONS: HashSet<&'static str> = [
        "os.system",
        "os.popen",
        "subprocess.run",
        "subprocess.call",
        "subprocess.Popen",
        "subprocess.check_call",
        "subprocess.check_output",
        "subprocess.getoutput",
        "subprocess.getstatusoutput",
        "commands.getoutput",
    ]
    .into_iter()
    .collect();
}

/// Keyword names that carry the dangerous argument when it is not positional.
const PAYLOAD_KEYWORDS: &[&str] = &["source", "args", "cmd", "command", "data", "sql", "query", "stream"];

const SAFE_YAML_LOADERS: &[&str] = &["SafeLoader", "CSafeLoader", "BaseLoader"];

/// Runs the unsafe-call and injection families over the tree.
pub fn scan_danger(
    tree: &AnalysisTree,
    source: &str,
    config: &AnalysisConfig,
) -> Result<Vec<Finding>, InternalAnalysisError> {
    let mut aliases = AliasCollector::default();
    aliases.visit_body(tree.statements());

    let mut visitor = DangerVisitor {
        tree,
        config,
        aliases: aliases.aliases,
        sink: FindingSink::new(tree, source, config.honor_pragmas),
        scopes: vec![Scope::new(UnitId::ROOT)],
        error: None,
    };
    visitor.visit_body(tree.statements());
    match visitor.error {
        Some(err) => Err(err),
        None => Ok(visitor.sink.into_findings()),
    }
}

/// Maps local names to the dotted names they were imported as.
#[derive(Default)]
struct AliasCollector {
    aliases: HashMap<String, String>,
}

impl<'ast> Visitor<'ast> for AliasCollector {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Import(node) => {
                for alias in &node.names {
                    if let Some(asname) = &alias.asname {
                        self.aliases
                            .insert(asname.to_string(), alias.name.to_string());
                    }
                }
            }
            Stmt::ImportFrom(node) => {
                if let Some(module) = &node.module {
                    for alias in &node.names {
                        let local = alias.asname.as_ref().unwrap_or(&alias.name);
                        self.aliases
                            .insert(local.to_string(), format!("{}.{}", module, alias.name));
                    }
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, _expr: &'ast Expr) {}
}

/// Names bound to strings inside one unit, tracked in source order.
struct Scope {
    unit: UnitId,
    /// Names holding a string assembled at run time, with the line of assembly.
    built: HashMap<String, usize>,
    /// Names holding a plain string literal.
    literals: HashSet<String>,
}

impl Scope {
    fn new(unit: UnitId) -> Self {
        Self {
            unit,
            built: HashMap::new(),
            literals: HashSet::new(),
        }
    }
}

/// Visitor that checks for dangerous calls and injection-prone string building.
struct DangerVisitor<'a> {
    tree: &'a AnalysisTree,
    config: &'a AnalysisConfig,
    aliases: HashMap<String, String>,
    sink: FindingSink<'a>,
    scopes: Vec<Scope>,
    error: Option<InternalAnalysisError>,
}

impl DangerVisitor<'_> {
    fn scope(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    fn unit(&self) -> UnitId {
        self.scopes.last().map_or(UnitId::ROOT, |scope| scope.unit)
    }

    fn line(&self, offset: usize) -> usize {
        self.tree.line_index().line_of(offset)
    }

    /// The callee's dotted name with import aliases expanded.
    fn resolve(&self, func: &Expr) -> Option<String> {
        let name = dotted_name(func)?;
        let resolved = match name.split_once('.') {
            Some((head, rest)) => self
                .aliases
                .get(head)
                .map(|target| format!("{}.{}", target, rest)),
            None => self.aliases.get(name.as_str()).cloned(),
        };
        Some(resolved.unwrap_or(name))
    }

    fn enter_unit(&mut self, stmt: &Stmt, start: usize) {
        match self.tree.require_unit_at("security", start) {
            Ok(id) => {
                self.scopes.push(Scope::new(id));
                walk_stmt(self, stmt);
                self.scopes.pop();
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }

    fn track_assignment(&mut self, target: &Expr, value: &Expr, line: usize) {
        let Expr::Name(name) = target else {
            return;
        };
        let name = name.id.to_string();
        let built = is_built_string(value) || self.is_built_name(value).is_some();
        let literal = string_literal(value).is_some();
        if let Some(scope) = self.scope() {
            scope.built.remove(&name);
            scope.literals.remove(&name);
            if built {
                scope.built.insert(name, line);
            } else if literal {
                scope.literals.insert(name);
            }
        }
    }

    fn track_aug_assignment(&mut self, node: &ast::StmtAugAssign, line: usize) {
        let Expr::Name(name) = &*node.target else {
            return;
        };
        if !matches!(node.op, Operator::Add) {
            return;
        }
        let name = name.id.to_string();
        let value_is_dynamic = !is_literal(&node.value);
        if let Some(scope) = self.scope() {
            let is_string = scope.literals.contains(&name) || scope.built.contains_key(&name);
            if is_string && value_is_dynamic {
                scope.literals.remove(&name);
                scope.built.entry(name).or_insert(line);
            }
        }
    }

    fn is_built_name(&self, expr: &Expr) -> Option<usize> {
        let Expr::Name(name) = expr else {
            return None;
        };
        self.scopes
            .last()
            .and_then(|scope| scope.built.get(name.id.as_str()).copied())
    }

    /// The argument that carries code, a command or data into the call.
    fn payload<'e>(call: &'e ast::ExprCall) -> Option<&'e Expr> {
        call.args.first().or_else(|| {
            call.keywords
                .iter()
                .find(|keyword| {
                    keyword
                        .arg
                        .as_ref()
                        .is_some_and(|arg| PAYLOAD_KEYWORDS.contains(&arg.as_str()))
                })
                .map(|keyword| &keyword.value)
        })
    }

    fn keyword<'e>(call: &'e ast::ExprCall, name: &str) -> Option<&'e Expr> {
        call.keywords
            .iter()
            .find(|keyword| keyword.arg.as_ref().is_some_and(|arg| arg.as_str() == name))
            .map(|keyword| &keyword.value)
    }

    fn check_unsafe_call(&mut self, call: &ast::ExprCall, name: &str, line: usize) {
        let hazard = if let Some(hazard) = DENYLIST.get(name) {
            *hazard
        } else if name == "yaml.load" {
            let safe = Self::keyword(call, "Loader")
                .and_then(dotted_name)
                .is_some_and(|loader| {
                    SAFE_YAML_LOADERS
                        .iter()
                        .any(|safe| loader == *safe || loader.ends_with(&format!(".{}", safe)))
                });
            if safe {
                return;
            }
            Hazard::Deserialization
        } else if SHELL_CAPABLE.contains(name) {
            let shell = Self::keyword(call, "shell").is_some_and(|value| {
                matches!(value, Expr::Constant(c) if matches!(c.value, Constant::Bool(true)))
            });
            if !shell {
                return;
            }
            Hazard::ShellCommand
        } else {
            return;
        };

        let (severity, origin) = match Self::payload(call) {
            Some(arg) if !is_literal(arg) => (Severity::Error, "with a non-literal argument"),
            _ => (Severity::Warning, "with a literal argument"),
        };
        self.sink.push(
            Rule::UnsafeCall,
            severity,
            format!("Call to `{}` {} {}", name, origin, hazard.describe()),
            Some(self.unit()),
            line,
        );
    }

    fn check_injection(&mut self, call: &ast::ExprCall, name: Option<&str>, line: usize) {
        let method = call_attr_name(call);
        let is_query = method.is_some_and(|m| QUERY_METHODS.contains(m))
            || name.is_some_and(|n| QUERY_FUNCTIONS.contains(n));
        let is_command = name.is_some_and(|n| COMMAND_FUNCTIONS.contains(n));
        if !is_query && !is_command {
            return;
        }
        let Some(arg) = Self::payload(call) else {
            return;
        };

        let built_at = if is_built_string(arg) {
            Some(line)
        } else {
            self.is_built_name(arg)
        };
        let Some(built_at) = built_at else {
            return;
        };

        let sink_name = name.or(method).unwrap_or("call");
        let message = if is_query {
            format!(
                "Query string built dynamically (line {}) is passed to `{}`; use parameterized queries",
                built_at, sink_name
            )
        } else {
            format!(
                "Command string built dynamically (line {}) is passed to `{}`; pass an argument list without a shell",
                built_at, sink_name
            )
        };
        self.sink.push(
            Rule::InjectionStringBuilding,
            Severity::Error,
            message,
            Some(self.unit()),
            line,
        );
    }
}

impl<'ast> Visitor<'ast> for DangerVisitor<'_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::AsyncFunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::ClassDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::Assign(node) => {
                // Calls on the right-hand side see the bindings from before this statement.
                walk_stmt(self, stmt);
                let line = self.line(node.range.start().to_usize());
                for target in &node.targets {
                    self.track_assignment(target, &node.value, line);
                }
            }
            Stmt::AnnAssign(node) => {
                walk_stmt(self, stmt);
                if let Some(value) = &node.value {
                    let line = self.line(node.range.start().to_usize());
                    self.track_assignment(&node.target, value, line);
                }
            }
            Stmt::AugAssign(node) => {
                walk_stmt(self, stmt);
                let line = self.line(node.range.start().to_usize());
                self.track_aug_assignment(node, line);
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Call(call) = expr {
            let line = self.line(call.range.start().to_usize());
            let name = self.resolve(&call.func);
            if self.config.is_enabled(RuleFamily::UnsafeCall) {
                if let Some(name) = name.as_deref() {
                    self.check_unsafe_call(call, name, line);
                }
            }
            if self.config.is_enabled(RuleFamily::Injection) {
                self.check_injection(call, name.as_deref(), line);
            }
        }
        walk_expr(self, expr);
    }
}

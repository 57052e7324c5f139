//! Structural parser: source text to [`AnalysisTree`].

use crate::error::SyntaxFailure;
use crate::tree::{AnalysisTree, SourceUnit, Span, UnitId, UnitKind};
use crate::utils::{clean_docstring, LineIndex};
use crate::visitor::{docstring_of, dotted_name, walk_stmt, Visitor};
use rustpython_ast::{self as ast, Expr, Ranged, Stmt};
use rustpython_parser::Parse;
use std::collections::HashSet;
use std::path::Path;

/// Name given to the module unit when the caller supplies no path.
pub const ANONYMOUS_MODULE: &str = "<module>";

/// Parses `source` and derives the unit inventory.
///
/// `path` is only used to name the module unit and to label parser messages.
/// Grammar and lexical errors come back as a [`SyntaxFailure`]; nothing is
/// recovered from a file that does not parse.
pub fn parse(source: &str, path: Option<&str>) -> Result<AnalysisTree, SyntaxFailure> {
    let line_index = LineIndex::new(source);
    let statements = ast::Suite::parse(source, path.unwrap_or(ANONYMOUS_MODULE)).map_err(|err| {
        let (line, column) = line_index.line_col(source, err.offset.to_usize());
        SyntaxFailure {
            line,
            column,
            message: err.error.to_string(),
        }
    })?;

    let module_name = module_name(path);
    let mut builder = TreeBuilder::new(&line_index, module_name, source, &statements);
    builder.visit_body(&statements);
    let units = builder.units;

    Ok(AnalysisTree::new(
        units,
        statements,
        line_index,
        path.map(str::to_string),
    ))
}

fn module_name(path: Option<&str>) -> String {
    path.and_then(|p| Path::new(p).file_stem())
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| ANONYMOUS_MODULE.to_string())
}

/// Collects one [`SourceUnit`] per definition in a single pre-order pass.
struct TreeBuilder<'a> {
    units: Vec<SourceUnit>,
    /// Enclosing units, innermost last.
    stack: Vec<UnitId>,
    qualified_names: HashSet<String>,
    line_index: &'a LineIndex,
}

impl<'a> TreeBuilder<'a> {
    fn new(line_index: &'a LineIndex, module_name: String, source: &str, body: &[Stmt]) -> Self {
        let line_count = line_index.line_count(source);
        let module = SourceUnit {
            id: UnitId::ROOT,
            kind: UnitKind::Module,
            name: module_name.clone(),
            qualified_name: module_name.clone(),
            start_line: 1,
            end_line: line_count,
            parent: None,
            docstring: docstring_of(body).map(clean_docstring),
            span: Span::new(0, source.len()),
            body_span: body_span(body).unwrap_or(Span::new(0, 0)),
            params: Vec::new(),
            decorators: Vec::new(),
            returns_value: false,
            is_async: false,
        };

        let mut qualified_names = HashSet::new();
        qualified_names.insert(module_name);
        Self {
            units: vec![module],
            stack: vec![UnitId::ROOT],
            qualified_names,
            line_index,
        }
    }

    fn current(&self) -> UnitId {
        self.stack.last().copied().unwrap_or(UnitId::ROOT)
    }

    fn enter(&mut self, def: Definition<'_>) {
        let parent = self.current();
        let (start, end) = (def.start, def.end);
        let start_line = self.line_index.line_of(start);
        let end_line = if end > start {
            self.line_index.line_of(end - 1)
        } else {
            start_line
        };

        let parent_name = &self.units[parent.0].qualified_name;
        let mut qualified_name = format!("{}.{}", parent_name, def.name);
        if !self.qualified_names.insert(qualified_name.clone()) {
            qualified_name = format!("{}@{}", qualified_name, start_line);
            self.qualified_names.insert(qualified_name.clone());
        }

        let id = UnitId(self.units.len());
        self.units.push(SourceUnit {
            id,
            kind: def.kind,
            name: def.name.to_string(),
            qualified_name,
            start_line,
            end_line,
            parent: Some(parent),
            docstring: docstring_of(def.body).map(clean_docstring),
            span: Span::new(start, end),
            body_span: body_span(def.body).unwrap_or(Span::new(end, end)),
            params: def.args.map(param_names).unwrap_or_default(),
            decorators: def.decorators.iter().filter_map(decorator_name).collect(),
            returns_value: returns_value(def.body),
            is_async: def.is_async,
        });

        self.stack.push(id);
        self.visit_body(def.body);
        self.stack.pop();
    }
}

/// The parts of a function or class definition the builder needs.
struct Definition<'ast> {
    kind: UnitKind,
    name: &'ast str,
    start: usize,
    end: usize,
    body: &'ast [Stmt],
    decorators: &'ast [Expr],
    args: Option<&'ast ast::Arguments>,
    is_async: bool,
}

impl<'ast> Visitor<'ast> for TreeBuilder<'_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.enter(Definition {
                kind: UnitKind::Function,
                name: node.name.as_str(),
                start: node.range.start().to_usize(),
                end: node.range.end().to_usize(),
                body: &node.body,
                decorators: &node.decorator_list,
                args: Some(node.args.as_ref()),
                is_async: false,
            }),
            Stmt::AsyncFunctionDef(node) => self.enter(Definition {
                kind: UnitKind::Function,
                name: node.name.as_str(),
                start: node.range.start().to_usize(),
                end: node.range.end().to_usize(),
                body: &node.body,
                decorators: &node.decorator_list,
                args: Some(node.args.as_ref()),
                is_async: true,
            }),
            Stmt::ClassDef(node) => self.enter(Definition {
                kind: UnitKind::Class,
                name: node.name.as_str(),
                start: node.range.start().to_usize(),
                end: node.range.end().to_usize(),
                body: &node.body,
                decorators: &node.decorator_list,
                args: None,
                is_async: false,
            }),
            _ => walk_stmt(self, stmt),
        }
    }

    // Definitions never appear inside expressions.
    fn visit_expr(&mut self, _expr: &'ast Expr) {}
}

fn body_span(body: &[Stmt]) -> Option<Span> {
    let first = body.first()?;
    let last = body.last()?;
    Some(Span::new(
        first.range().start().to_usize(),
        last.range().end().to_usize(),
    ))
}

fn param_names(args: &ast::Arguments) -> Vec<String> {
    let mut names: Vec<String> = args
        .posonlyargs
        .iter()
        .chain(&args.args)
        .map(|arg| arg.def.arg.to_string())
        .collect();
    if let Some(vararg) = &args.vararg {
        names.push(vararg.arg.to_string());
    }
    names.extend(args.kwonlyargs.iter().map(|arg| arg.def.arg.to_string()));
    if let Some(kwarg) = &args.kwarg {
        names.push(kwarg.arg.to_string());
    }
    names
}

fn decorator_name(decorator: &Expr) -> Option<String> {
    match decorator {
        Expr::Call(call) => dotted_name(&call.func),
        other => dotted_name(other),
    }
}

/// Whether the body (nested definitions excluded) returns something other than `None`.
fn returns_value(body: &[Stmt]) -> bool {
    let mut finder = ReturnFinder { found: false };
    finder.visit_body(body);
    finder.found
}

struct ReturnFinder {
    found: bool,
}

impl<'ast> Visitor<'ast> for ReturnFinder {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(_) | Stmt::AsyncFunctionDef(_) | Stmt::ClassDef(_) => {}
            Stmt::Return(node) => {
                let is_none = |value: &Expr| {
                    matches!(value, Expr::Constant(c) if matches!(c.value, ast::Constant::None))
                };
                if node.value.as_deref().is_some_and(|value| !is_none(value)) {
                    self.found = true;
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, _expr: &'ast Expr) {}
}

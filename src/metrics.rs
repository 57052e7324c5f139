//! Per-unit structure metrics.
//!
//! Cyclomatic complexity is approximated as:
//! - Start at 1
//! - Add 1 for each: if/elif, for, while, except handler, match case,
//!   conditional expression, comprehension `for` and `if` clause
//! - Add 1 for each extra operand of `and` / `or`
//!
//! Each branching construct counts toward its innermost enclosing unit only.

use crate::error::InternalAnalysisError;
use crate::tree::{AnalysisTree, UnitId, UnitKind};
use crate::visitor::{walk_expr, walk_stmt, Visitor};
use rustpython_ast::{self as ast, Expr, Stmt};
use serde::Serialize;
use std::collections::BTreeMap;

/// Derived counts for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// `end_line - start_line + 1`.
    pub lines_of_code: usize,
    /// Functions defined anywhere below the unit.
    pub function_count: usize,
    /// Classes defined anywhere below the unit.
    pub class_count: usize,
    /// Distance from the module along parent links.
    pub depth: usize,
    /// Deepest nesting of control blocks in the unit's own body.
    pub max_nesting: usize,
    pub cyclomatic_complexity: usize,
    /// Names bound by import statements in the unit's own body.
    pub import_count: usize,
}

/// Computes one [`Metrics`] record per unit of the tree.
pub fn compute_metrics(tree: &AnalysisTree) -> Result<BTreeMap<UnitId, Metrics>, InternalAnalysisError> {
    let mut counter = BranchCounter::new(tree);
    counter.visit_body(tree.statements());
    if let Some(err) = counter.error {
        return Err(err);
    }

    let metrics = tree
        .units()
        .iter()
        .map(|unit| {
            let counts = &counter.counts[unit.id.index()];
            let (function_count, class_count) =
                tree.descendants(unit.id)
                    .fold((0, 0), |(functions, classes), child| match child.kind {
                        UnitKind::Function => (functions + 1, classes),
                        UnitKind::Class => (functions, classes + 1),
                        UnitKind::Module => (functions, classes),
                    });
            let metrics = Metrics {
                lines_of_code: unit.end_line.saturating_sub(unit.start_line) + 1,
                function_count,
                class_count,
                depth: tree.depth(unit.id),
                max_nesting: counts.max_nesting,
                cyclomatic_complexity: 1 + counts.branches,
                import_count: counts.imports,
            };
            (unit.id, metrics)
        })
        .collect();

    Ok(metrics)
}

#[derive(Debug, Default, Clone)]
struct UnitCounts {
    branches: usize,
    imports: usize,
    nesting: usize,
    max_nesting: usize,
}

/// Attributes branches, imports and block nesting to the innermost unit.
struct BranchCounter<'t> {
    tree: &'t AnalysisTree,
    counts: Vec<UnitCounts>,
    stack: Vec<UnitId>,
    error: Option<InternalAnalysisError>,
}

impl<'t> BranchCounter<'t> {
    fn new(tree: &'t AnalysisTree) -> Self {
        Self {
            tree,
            counts: vec![UnitCounts::default(); tree.units().len()],
            stack: vec![UnitId::ROOT],
            error: None,
        }
    }

    fn current(&mut self) -> &mut UnitCounts {
        let id = self.stack.last().copied().unwrap_or(UnitId::ROOT);
        &mut self.counts[id.index()]
    }

    fn branch(&mut self, amount: usize) {
        self.current().branches += amount;
    }

    fn enter_block(&mut self) {
        let counts = self.current();
        counts.nesting += 1;
        counts.max_nesting = counts.max_nesting.max(counts.nesting);
    }

    fn exit_block(&mut self) {
        let counts = self.current();
        counts.nesting = counts.nesting.saturating_sub(1);
    }

    fn enter_unit<'ast>(&mut self, stmt: &'ast Stmt, start: usize) {
        match self.tree.require_unit_at("metrics", start) {
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

    fn block<'ast>(&mut self, stmt: &'ast Stmt) {
        self.enter_block();
        walk_stmt(self, stmt);
        self.exit_block();
    }
}

impl<'ast> Visitor<'ast> for BranchCounter<'_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::AsyncFunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::ClassDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::If(node) => {
                self.branch(1);
                self.enter_block();
                self.visit_expr(&node.test);
                self.visit_body(&node.body);
                match node.orelse.as_slice() {
                    // `elif` chains stay at the nesting level of the first `if`.
                    [elif @ Stmt::If(_)] => {
                        self.exit_block();
                        self.visit_stmt(elif);
                    }
                    orelse => {
                        self.visit_body(orelse);
                        self.exit_block();
                    }
                }
            }
            Stmt::For(_) | Stmt::AsyncFor(_) | Stmt::While(_) => {
                self.branch(1);
                self.block(stmt);
            }
            Stmt::Try(node) => {
                self.branch(node.handlers.len());
                self.block(stmt);
            }
            Stmt::TryStar(node) => {
                self.branch(node.handlers.len());
                self.block(stmt);
            }
            Stmt::Match(node) => {
                self.branch(node.cases.len());
                self.block(stmt);
            }
            Stmt::With(_) | Stmt::AsyncWith(_) => self.block(stmt),
            Stmt::Import(node) => self.current().imports += node.names.len(),
            Stmt::ImportFrom(node) => self.current().imports += node.names.len(),
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::BoolOp(node) => self.branch(node.values.len().saturating_sub(1)),
            Expr::IfExp(_) => self.branch(1),
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_comprehension(&mut self, generators: &'ast [ast::Comprehension]) {
        for generator in generators {
            self.branch(1 + generator.ifs.len());
        }
        crate::visitor::walk_comprehension(self, generators);
    }
}

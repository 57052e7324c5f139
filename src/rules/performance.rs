use crate::config::AnalysisConfig;
use crate::error::InternalAnalysisError;
use crate::rules::{Finding, FindingSink, Rule, RuleFamily, Severity};
use crate::tree::{AnalysisTree, UnitId};
use crate::visitor::{
    is_string_like, walk_comprehension, walk_except_handler, walk_expr, walk_stmt, Visitor,
};
use rustpython_ast::{self as ast, CmpOp, Constant, ExceptHandler, Expr, Operator, Ranged, Stmt};
use std::collections::HashSet;

/// Wrappers that iterate their first argument.
const ITERATING_WRAPPERS: &[&str] = &["enumerate", "sorted", "reversed", "list", "tuple", "set", "iter"];

/// Dict views that iterate their receiver.
const VIEW_METHODS: &[&str] = &["items", "keys", "values"];

/// Reduces a loop iterable to the collection it walks, if it names one.
///
/// `range(len(x))`, `enumerate(x)`, `sorted(x)`, `x.items()` and `x[1:]` all
/// reduce to `x`.
pub fn collection_key(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(node) => Some(node.id.to_string()),
        Expr::Attribute(_) => crate::visitor::dotted_name(expr),
        Expr::Subscript(node) => collection_key(&node.value),
        Expr::Call(node) => match &*node.func {
            Expr::Name(func) if func.id.as_str() == "range" => match node.args.as_slice() {
                [arg] => len_argument(arg).and_then(collection_key),
                _ => None,
            },
            Expr::Name(func) if ITERATING_WRAPPERS.contains(&func.id.as_str()) => {
                node.args.first().and_then(collection_key)
            }
            Expr::Attribute(attr)
                if VIEW_METHODS.contains(&attr.attr.as_str()) && node.args.is_empty() =>
            {
                collection_key(&attr.value)
            }
            _ => None,
        },
        _ => None,
    }
}

/// `x` for `len(x)`.
fn len_argument(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Call(node) => match (&*node.func, node.args.as_slice()) {
            (Expr::Name(func), [arg]) if func.id.as_str() == "len" => Some(arg),
            _ => None,
        },
        _ => None,
    }
}

/// `x` for `range(len(x))`.
fn range_len_target(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Call(node) => match (&*node.func, node.args.as_slice()) {
            (Expr::Name(func), [arg]) if func.id.as_str() == "range" => len_argument(arg),
            _ => None,
        },
        _ => None,
    }
}

/// Values that `+=` cannot extend in place.
fn is_immutable_sequence(expr: &Expr) -> bool {
    is_string_like(expr) || matches!(expr, Expr::Tuple(_))
}

/// Flattens a chain of `+` into its operands, left to right.
fn add_operands<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::BinOp(node) if matches!(node.op, Operator::Add) => {
            add_operands(&node.left, out);
            add_operands(&node.right, out);
        }
        _ => out.push(expr),
    }
}

/// A handler body that does nothing: only `pass` or `...`.
fn is_empty_handler(body: &[Stmt]) -> bool {
    body.iter().all(|stmt| match stmt {
        Stmt::Pass(_) => true,
        Stmt::Expr(node) => matches!(
            &*node.value,
            Expr::Constant(constant) if matches!(constant.value, Constant::Ellipsis)
        ),
        _ => false,
    })
}

fn is_list_value(expr: &Expr) -> bool {
    match expr {
        Expr::List(_) | Expr::ListComp(_) => true,
        Expr::Call(node) => matches!(&*node.func, Expr::Name(func) if func.id.as_str() == "list"),
        _ => false,
    }
}

/// Runs the performance families over the tree.
pub fn detect_performance(
    tree: &AnalysisTree,
    source: &str,
    config: &AnalysisConfig,
) -> Result<Vec<Finding>, InternalAnalysisError> {
    let mut visitor = PerformanceVisitor {
        tree,
        config,
        sink: FindingSink::new(tree, source, config.honor_pragmas),
        frames: vec![Frame::new(UnitId::ROOT)],
        error: None,
    };
    visitor.visit_body(tree.statements());
    match visitor.error {
        Some(err) => Err(err),
        None => Ok(visitor.sink.into_findings()),
    }
}

/// Loop state and local bindings of one unit. A nested unit starts a fresh frame.
struct Frame {
    unit: UnitId,
    /// Collection keys of the enclosing `for` loops, outermost first.
    loop_keys: Vec<Option<String>>,
    /// Loops of any kind (including comprehensions) currently open.
    loop_depth: usize,
    /// Names bound to a string or tuple.
    immutables: HashSet<String>,
    /// Names bound to a list.
    lists: HashSet<String>,
}

impl Frame {
    fn new(unit: UnitId) -> Self {
        Self {
            unit,
            loop_keys: Vec::new(),
            loop_depth: 0,
            immutables: HashSet::new(),
            lists: HashSet::new(),
        }
    }
}

struct PerformanceVisitor<'a> {
    tree: &'a AnalysisTree,
    config: &'a AnalysisConfig,
    sink: FindingSink<'a>,
    frames: Vec<Frame>,
    error: Option<InternalAnalysisError>,
}

impl PerformanceVisitor<'_> {
    fn frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn line(&self, offset: usize) -> usize {
        self.tree.line_index().line_of(offset)
    }

    fn in_loop(&self) -> bool {
        self.frame().loop_depth > 0
    }

    fn report(&mut self, rule: Rule, severity: Severity, message: String, offset: usize) {
        let line = self.line(offset);
        let unit = self.frame().unit;
        self.sink.push(rule, severity, message, Some(unit), line);
    }

    fn enter_unit(&mut self, stmt: &Stmt, start: usize) {
        match self.tree.require_unit_at("performance", start) {
            Ok(id) => {
                self.frames.push(Frame::new(id));
                walk_stmt(self, stmt);
                self.frames.pop();
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }

    /// Whether `name` is bound to a list here or at module level.
    fn is_list_name(&self, name: &str) -> bool {
        self.frame().lists.contains(name) || self.frames[0].lists.contains(name)
    }

    fn track_binding(&mut self, target: &Expr, value: &Expr) {
        let Expr::Name(name) = target else {
            return;
        };
        let name = name.id.to_string();
        let immutable = is_immutable_sequence(value);
        let list = is_list_value(value);
        let frame = self.frame_mut();
        frame.immutables.remove(&name);
        frame.lists.remove(&name);
        if immutable {
            frame.immutables.insert(name.clone());
        }
        if list {
            frame.lists.insert(name);
        }
    }

    /// `in_place` is the `acc += value` form, which extends lists without copying;
    /// `acc = acc + value` rebuilds lists too.
    fn check_concatenation(&mut self, name: &str, operands: &[&Expr], in_place: bool, offset: usize) {
        if !self.config.is_enabled(RuleFamily::LoopConcatenation) || !self.in_loop() {
            return;
        }
        let frame = self.frame();
        let accumulates = operands
            .iter()
            .any(|value| is_immutable_sequence(value) || (!in_place && matches!(value, Expr::List(_))))
            || frame.immutables.contains(name)
            || (!in_place && frame.lists.contains(name));
        if accumulates {
            self.report(
                Rule::LoopConcatenation,
                Severity::Warning,
                format!(
                    "`{}` is grown by concatenation inside a loop; collect parts and join them once",
                    name
                ),
                offset,
            );
        }
    }

    fn visit_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        offset: usize,
    ) {
        let key = collection_key(iter);

        if self.config.is_enabled(RuleFamily::NestedLoop) {
            if let Some(key) = &key {
                let nested = self
                    .frame()
                    .loop_keys
                    .iter()
                    .any(|outer| outer.as_ref() == Some(key));
                if nested {
                    self.report(
                        Rule::NestedLoopSameCollection,
                        Severity::Warning,
                        format!(
                            "Nested loop iterates `{}` again inside a loop over it; consider a lookup table",
                            key
                        ),
                        offset,
                    );
                }
            }
        }

        if self.config.is_enabled(RuleFamily::RangeLen) {
            if let Some(collection) = range_len_target(iter).and_then(collection_key) {
                self.report(
                    Rule::RangeLenLoop,
                    Severity::Info,
                    format!(
                        "Loop over `range(len({}))`; use `enumerate({})` instead",
                        collection, collection
                    ),
                    offset,
                );
            }
        }

        self.visit_expr(iter);
        self.visit_expr(target);

        let frame = self.frame_mut();
        frame.loop_keys.push(key);
        frame.loop_depth += 1;
        self.visit_body(body);
        let frame = self.frame_mut();
        frame.loop_keys.pop();
        frame.loop_depth -= 1;

        self.visit_body(orelse);
    }
}

impl<'ast> Visitor<'ast> for PerformanceVisitor<'_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::AsyncFunctionDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::ClassDef(node) => self.enter_unit(stmt, node.range.start().to_usize()),
            Stmt::For(node) => self.visit_for(
                &node.target,
                &node.iter,
                &node.body,
                &node.orelse,
                node.range.start().to_usize(),
            ),
            Stmt::AsyncFor(node) => self.visit_for(
                &node.target,
                &node.iter,
                &node.body,
                &node.orelse,
                node.range.start().to_usize(),
            ),
            Stmt::While(node) => {
                self.visit_expr(&node.test);
                self.frame_mut().loop_depth += 1;
                self.visit_body(&node.body);
                self.frame_mut().loop_depth -= 1;
                self.visit_body(&node.orelse);
            }
            Stmt::AugAssign(node) => {
                walk_stmt(self, stmt);
                if matches!(node.op, Operator::Add) {
                    if let Expr::Name(name) = &*node.target {
                        self.check_concatenation(
                            name.id.as_str(),
                            &[&*node.value],
                            true,
                            node.range.start().to_usize(),
                        );
                    }
                }
            }
            Stmt::Assign(node) => {
                walk_stmt(self, stmt);
                // `acc = acc + a + b`, `acc = a + acc`
                if let [Expr::Name(target)] = node.targets.as_slice() {
                    let mut operands = Vec::new();
                    add_operands(&node.value, &mut operands);
                    let position = operands
                        .iter()
                        .position(|operand| matches!(operand, Expr::Name(name) if name.id == target.id));
                    if let Some(position) = position.filter(|_| operands.len() > 1) {
                        operands.remove(position);
                        self.check_concatenation(
                            target.id.as_str(),
                            &operands,
                            false,
                            node.range.start().to_usize(),
                        );
                        return;
                    }
                }
                for target in &node.targets {
                    self.track_binding(target, &node.value);
                }
            }
            Stmt::AnnAssign(node) => {
                walk_stmt(self, stmt);
                if let Some(value) = &node.value {
                    self.track_binding(&node.target, value);
                }
            }
            Stmt::Global(node) => {
                if self.config.is_enabled(RuleFamily::GlobalStatement) {
                    let names: Vec<&str> = node.names.iter().map(|name| name.as_str()).collect();
                    self.report(
                        Rule::GlobalStatement,
                        Severity::Info,
                        format!(
                            "`global {}` shares mutable module state; pass values explicitly",
                            names.join(", ")
                        ),
                        node.range.start().to_usize(),
                    );
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_except_handler(&mut self, handler: &'ast ExceptHandler) {
        let ExceptHandler::ExceptHandler(node) = handler;
        if self.config.is_enabled(RuleFamily::EmptyExcept) && is_empty_handler(&node.body) {
            self.report(
                Rule::EmptyExcept,
                Severity::Warning,
                "`except` block does nothing; errors are silently swallowed".to_string(),
                node.range.start().to_usize(),
            );
        }
        walk_except_handler(self, handler);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Compare(node) = expr {
            if self.config.is_enabled(RuleFamily::ListMembership) && self.in_loop() {
                for (op, comparator) in node.ops.iter().zip(&node.comparators) {
                    if !matches!(op, CmpOp::In | CmpOp::NotIn) {
                        continue;
                    }
                    let is_list = match comparator {
                        Expr::List(_) => true,
                        Expr::Name(name) => self.is_list_name(name.id.as_str()),
                        _ => false,
                    };
                    if is_list {
                        self.report(
                            Rule::ListMembershipInLoop,
                            Severity::Warning,
                            "Membership test against a list inside a loop is linear; use a set"
                                .to_string(),
                            node.range.start().to_usize(),
                        );
                    }
                }
            }
        }
        // The element of a comprehension runs once per iteration.
        if matches!(
            expr,
            Expr::ListComp(_) | Expr::SetComp(_) | Expr::DictComp(_) | Expr::GeneratorExp(_)
        ) {
            self.frame_mut().loop_depth += 1;
            walk_expr(self, expr);
            self.frame_mut().loop_depth -= 1;
            return;
        }
        walk_expr(self, expr);
    }

    fn visit_comprehension(&mut self, generators: &'ast [ast::Comprehension]) {
        if self.config.is_enabled(RuleFamily::NestedLoop) {
            let mut seen: Vec<String> = Vec::new();
            for generator in generators {
                let Some(key) = collection_key(&generator.iter) else {
                    continue;
                };
                if seen.contains(&key) {
                    self.report(
                        Rule::NestedLoopSameCollection,
                        Severity::Warning,
                        format!("Comprehension iterates `{}` twice; consider a lookup table", key),
                        generator.iter.range().start().to_usize(),
                    );
                } else {
                    seen.push(key);
                }
            }
        }

        walk_comprehension(self, generators);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_ast::Suite;
    use rustpython_parser::Parse;

    fn key_of(source: &str) -> Option<String> {
        let suite = Suite::parse(source, "<test>").unwrap();
        match &suite[0] {
            Stmt::Expr(node) => collection_key(&node.value),
            _ => panic!("expected an expression statement"),
        }
    }

    #[test]
    fn test_collection_keys() {
        assert_eq!(key_of("items").as_deref(), Some("items"));
        assert_eq!(key_of("range(len(items))").as_deref(), Some("items"));
        assert_eq!(key_of("enumerate(items)").as_deref(), Some("items"));
        assert_eq!(key_of("sorted(self.rows)").as_deref(), Some("self.rows"));
        assert_eq!(key_of("data.items()").as_deref(), Some("data"));
        assert_eq!(key_of("items[1:]").as_deref(), Some("items"));
        assert_eq!(key_of("range(10)"), None);
        assert_eq!(key_of("load()"), None);
    }
}

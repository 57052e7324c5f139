//! Borrowing AST traversal shared by the parser and the detectors.
//!
//! A visitor overrides the hooks it cares about and calls [`walk_stmt`] /
//! [`walk_expr`] to continue into children, so scope handling (entering a
//! function, a loop body) stays in one place per visitor.

use rustpython_ast::{self as ast, Constant, ExceptHandler, Expr, Stmt};

/// Hooks invoked while walking a module body.
pub trait Visitor<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_body(&mut self, body: &'ast [Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_comprehension(&mut self, generators: &'ast [ast::Comprehension]) {
        walk_comprehension(self, generators);
    }

    fn visit_except_handler(&mut self, handler: &'ast ExceptHandler) {
        walk_except_handler(self, handler);
    }

    fn visit_match_case(&mut self, case: &'ast ast::MatchCase) {
        if let Some(guard) = &case.guard {
            self.visit_expr(guard);
        }
        self.visit_body(&case.body);
    }
}

/// Visits every child statement and expression of `stmt`.
pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::FunctionDef(node) => {
            for decorator in &node.decorator_list {
                visitor.visit_expr(decorator);
            }
            walk_arguments(visitor, &node.args);
            if let Some(returns) = &node.returns {
                visitor.visit_expr(returns);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::AsyncFunctionDef(node) => {
            for decorator in &node.decorator_list {
                visitor.visit_expr(decorator);
            }
            walk_arguments(visitor, &node.args);
            if let Some(returns) = &node.returns {
                visitor.visit_expr(returns);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::ClassDef(node) => {
            for decorator in &node.decorator_list {
                visitor.visit_expr(decorator);
            }
            for base in &node.bases {
                visitor.visit_expr(base);
            }
            for keyword in &node.keywords {
                visitor.visit_expr(&keyword.value);
            }
            visitor.visit_body(&node.body);
        }
        Stmt::Return(node) => {
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Delete(node) => {
            for target in &node.targets {
                visitor.visit_expr(target);
            }
        }
        Stmt::Assign(node) => {
            for target in &node.targets {
                visitor.visit_expr(target);
            }
            visitor.visit_expr(&node.value);
        }
        Stmt::AugAssign(node) => {
            visitor.visit_expr(&node.target);
            visitor.visit_expr(&node.value);
        }
        Stmt::AnnAssign(node) => {
            visitor.visit_expr(&node.target);
            visitor.visit_expr(&node.annotation);
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
        }
        Stmt::For(node) => {
            visitor.visit_expr(&node.target);
            visitor.visit_expr(&node.iter);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::AsyncFor(node) => {
            visitor.visit_expr(&node.target);
            visitor.visit_expr(&node.iter);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::While(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::If(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_body(&node.body);
            visitor.visit_body(&node.orelse);
        }
        Stmt::With(node) => {
            for item in &node.items {
                visitor.visit_expr(&item.context_expr);
                if let Some(vars) = &item.optional_vars {
                    visitor.visit_expr(vars);
                }
            }
            visitor.visit_body(&node.body);
        }
        Stmt::AsyncWith(node) => {
            for item in &node.items {
                visitor.visit_expr(&item.context_expr);
                if let Some(vars) = &item.optional_vars {
                    visitor.visit_expr(vars);
                }
            }
            visitor.visit_body(&node.body);
        }
        Stmt::Match(node) => {
            visitor.visit_expr(&node.subject);
            for case in &node.cases {
                visitor.visit_match_case(case);
            }
        }
        Stmt::Raise(node) => {
            if let Some(exc) = &node.exc {
                visitor.visit_expr(exc);
            }
            if let Some(cause) = &node.cause {
                visitor.visit_expr(cause);
            }
        }
        Stmt::Try(node) => {
            visitor.visit_body(&node.body);
            for handler in &node.handlers {
                visitor.visit_except_handler(handler);
            }
            visitor.visit_body(&node.orelse);
            visitor.visit_body(&node.finalbody);
        }
        Stmt::TryStar(node) => {
            visitor.visit_body(&node.body);
            for handler in &node.handlers {
                visitor.visit_except_handler(handler);
            }
            visitor.visit_body(&node.orelse);
            visitor.visit_body(&node.finalbody);
        }
        Stmt::Assert(node) => {
            visitor.visit_expr(&node.test);
            if let Some(msg) = &node.msg {
                visitor.visit_expr(msg);
            }
        }
        Stmt::Expr(node) => visitor.visit_expr(&node.value),
        _ => {}
    }
}

fn walk_arguments<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, args: &'ast ast::Arguments) {
    for arg in args
        .posonlyargs
        .iter()
        .chain(&args.args)
        .chain(&args.kwonlyargs)
    {
        if let Some(default) = &arg.default {
            visitor.visit_expr(default);
        }
    }
}

/// Visits the iterables and conditions of comprehension generators.
pub fn walk_comprehension<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    generators: &'ast [ast::Comprehension],
) {
    for generator in generators {
        visitor.visit_expr(&generator.target);
        visitor.visit_expr(&generator.iter);
        for condition in &generator.ifs {
            visitor.visit_expr(condition);
        }
    }
}

pub fn walk_except_handler<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    handler: &'ast ExceptHandler,
) {
    let ExceptHandler::ExceptHandler(node) = handler;
    if let Some(exc) = &node.type_ {
        visitor.visit_expr(exc);
    }
    visitor.visit_body(&node.body);
}

/// Visits every child expression of `expr`.
pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::BoolOp(node) => {
            for value in &node.values {
                visitor.visit_expr(value);
            }
        }
        Expr::NamedExpr(node) => {
            visitor.visit_expr(&node.target);
            visitor.visit_expr(&node.value);
        }
        Expr::BinOp(node) => {
            visitor.visit_expr(&node.left);
            visitor.visit_expr(&node.right);
        }
        Expr::UnaryOp(node) => visitor.visit_expr(&node.operand),
        Expr::Lambda(node) => {
            walk_arguments(visitor, &node.args);
            visitor.visit_expr(&node.body);
        }
        Expr::IfExp(node) => {
            visitor.visit_expr(&node.test);
            visitor.visit_expr(&node.body);
            visitor.visit_expr(&node.orelse);
        }
        Expr::Dict(node) => {
            for (key, value) in node.keys.iter().zip(&node.values) {
                if let Some(key) = key {
                    visitor.visit_expr(key);
                }
                visitor.visit_expr(value);
            }
        }
        Expr::Set(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::ListComp(node) => {
            visitor.visit_comprehension(&node.generators);
            visitor.visit_expr(&node.elt);
        }
        Expr::SetComp(node) => {
            visitor.visit_comprehension(&node.generators);
            visitor.visit_expr(&node.elt);
        }
        Expr::DictComp(node) => {
            visitor.visit_comprehension(&node.generators);
            visitor.visit_expr(&node.key);
            visitor.visit_expr(&node.value);
        }
        Expr::GeneratorExp(node) => {
            visitor.visit_comprehension(&node.generators);
            visitor.visit_expr(&node.elt);
        }
        Expr::Await(node) => visitor.visit_expr(&node.value),
        Expr::Yield(node) => {
            if let Some(value) = &node.value {
                visitor.visit_expr(value);
            }
        }
        Expr::YieldFrom(node) => visitor.visit_expr(&node.value),
        Expr::Compare(node) => {
            visitor.visit_expr(&node.left);
            for comparator in &node.comparators {
                visitor.visit_expr(comparator);
            }
        }
        Expr::Call(node) => {
            visitor.visit_expr(&node.func);
            for arg in &node.args {
                visitor.visit_expr(arg);
            }
            for keyword in &node.keywords {
                visitor.visit_expr(&keyword.value);
            }
        }
        Expr::FormattedValue(node) => {
            visitor.visit_expr(&node.value);
            if let Some(spec) = &node.format_spec {
                visitor.visit_expr(spec);
            }
        }
        Expr::JoinedStr(node) => {
            for value in &node.values {
                visitor.visit_expr(value);
            }
        }
        Expr::Attribute(node) => visitor.visit_expr(&node.value),
        Expr::Subscript(node) => {
            visitor.visit_expr(&node.value);
            visitor.visit_expr(&node.slice);
        }
        Expr::Starred(node) => visitor.visit_expr(&node.value),
        Expr::List(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::Tuple(node) => {
            for elt in &node.elts {
                visitor.visit_expr(elt);
            }
        }
        Expr::Slice(node) => {
            if let Some(lower) = &node.lower {
                visitor.visit_expr(lower);
            }
            if let Some(upper) = &node.upper {
                visitor.visit_expr(upper);
            }
            if let Some(step) = &node.step {
                visitor.visit_expr(step);
            }
        }
        _ => {}
    }
}

/// Extracts a dotted name (`os.path.join`) from a name or attribute chain.
pub fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(node) => Some(node.id.to_string()),
        Expr::Attribute(node) => {
            let base = dotted_name(&node.value)?;
            Some(format!("{}.{}", base, node.attr))
        }
        _ => None,
    }
}

/// The last segment of the callee (`execute` for `cursor.execute(...)`).
pub fn call_attr_name(call: &ast::ExprCall) -> Option<&str> {
    match &*call.func {
        Expr::Name(node) => Some(node.id.as_str()),
        Expr::Attribute(node) => Some(node.attr.as_str()),
        _ => None,
    }
}

/// The value of a plain string literal.
pub fn string_literal(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Constant(node) => match &node.value {
            Constant::Str(value) => Some(value.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Whether the expression is a constant (string, bytes, number, ...).
pub fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(_) => true,
        Expr::JoinedStr(node) => node
            .values
            .iter()
            .all(|value| matches!(value, Expr::Constant(_))),
        _ => false,
    }
}

/// Whether the expression evaluates to a string assembled at run time:
/// an interpolating f-string, `%` formatting, `.format(...)` or `+`
/// concatenation with a string operand.
pub fn is_built_string(expr: &Expr) -> bool {
    match expr {
        Expr::JoinedStr(node) => node
            .values
            .iter()
            .any(|value| matches!(value, Expr::FormattedValue(_))),
        Expr::BinOp(node) => match node.op {
            ast::Operator::Mod => string_literal(&node.left).is_some() || is_built_string(&node.left),
            ast::Operator::Add => {
                let stringy = |side: &Expr| {
                    string_literal(side).is_some()
                        || matches!(side, Expr::JoinedStr(_))
                        || is_built_string(side)
                };
                (stringy(&node.left) || stringy(&node.right))
                    && !(is_literal(&node.left) && is_literal(&node.right))
            }
            _ => false,
        },
        Expr::Call(node) => match &*node.func {
            Expr::Attribute(attr) if attr.attr.as_str() == "format" => {
                string_literal(&attr.value).is_some() && !(node.args.is_empty() && node.keywords.is_empty())
            }
            _ => false,
        },
        _ => false,
    }
}

/// Whether the expression is known to produce a string.
pub fn is_string_like(expr: &Expr) -> bool {
    match expr {
        Expr::JoinedStr(_) => true,
        Expr::Call(node) => {
            matches!(&*node.func, Expr::Name(name) if name.id.as_str() == "str")
                || is_built_string(expr)
        }
        _ => string_literal(expr).is_some() || is_built_string(expr),
    }
}

/// The first statement of a body, if it is a string literal.
pub fn docstring_of(body: &[Stmt]) -> Option<&str> {
    match body.first()? {
        Stmt::Expr(node) => string_literal(&node.value),
        _ => None,
    }
}

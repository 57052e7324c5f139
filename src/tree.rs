//! The structural inventory of one analyzed source: modules, classes and
//! functions with their spans and lexical parents.

use crate::error::InternalAnalysisError;
use crate::utils::LineIndex;
use rustpython_ast::Stmt;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Index of a unit inside its [`AnalysisTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitId(pub(crate) usize);

impl UnitId {
    /// The module unit is always the first unit of a tree.
    pub const ROOT: UnitId = UnitId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// The kind of lexical scope a unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Class,
    Function,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Module => write!(f, "module"),
            UnitKind::Class => write!(f, "class"),
            UnitKind::Function => write!(f, "function"),
        }
    }
}

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// One analyzable scope: the module, a class or a function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUnit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub name: String,
    /// Dotted path from the module, unique within the tree.
    pub qualified_name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Lexical parent; `None` only for the module.
    pub parent: Option<UnitId>,
    pub docstring: Option<String>,
    /// The whole definition, decorators included when the parser reports them.
    pub span: Span,
    /// The statements of the body.
    pub body_span: Span,
    /// Declared parameter names in order, `*args`/`**kwargs` included.
    pub params: Vec<String>,
    /// Dotted decorator names (`pytest.fixture`, `staticmethod`).
    pub decorators: Vec<String>,
    /// Whether the unit's own body returns a value other than `None`.
    pub returns_value: bool,
    pub is_async: bool,
}

impl SourceUnit {
    /// Private by the leading-underscore convention.
    pub fn is_private(&self) -> bool {
        self.kind != UnitKind::Module && self.name.starts_with('_')
    }

    /// Parameters excluding the implicit receiver of methods.
    pub fn explicit_params(&self) -> impl Iterator<Item = &str> + '_ {
        self.params
            .iter()
            .map(String::as_str)
            .filter(|name| *name != "self" && *name != "cls")
    }
}

/// Ordered collection of units forming a rooted hierarchy, together with the
/// parsed statements they were derived from.
///
/// Units are stored in pre-order, so a parent always precedes its children.
#[derive(Debug, Clone)]
pub struct AnalysisTree {
    units: Vec<SourceUnit>,
    children: Vec<Vec<UnitId>>,
    by_offset: HashMap<usize, UnitId>,
    statements: Vec<Stmt>,
    line_index: LineIndex,
    path: Option<String>,
}

impl AnalysisTree {
    pub(crate) fn new(
        units: Vec<SourceUnit>,
        statements: Vec<Stmt>,
        line_index: LineIndex,
        path: Option<String>,
    ) -> Self {
        let mut children = vec![Vec::new(); units.len()];
        let mut by_offset = HashMap::with_capacity(units.len());
        for unit in &units {
            if let Some(parent) = unit.parent {
                if let Some(siblings) = children.get_mut(parent.0) {
                    siblings.push(unit.id);
                }
                by_offset.insert(unit.span.start, unit.id);
            }
        }
        Self {
            units,
            children,
            by_offset,
            statements,
            line_index,
            path,
        }
    }

    /// The module unit.
    pub fn root(&self) -> &SourceUnit {
        &self.units[0]
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn get(&self, id: UnitId) -> Option<&SourceUnit> {
        self.units.get(id.0)
    }

    pub fn children(&self, id: UnitId) -> &[UnitId] {
        self.children.get(id.0).map_or(&[], Vec::as_slice)
    }

    pub fn parent(&self, id: UnitId) -> Option<&SourceUnit> {
        self.get(id)?.parent.and_then(|parent| self.get(parent))
    }

    /// Distance from the root along parent links.
    pub fn depth(&self, id: UnitId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|unit| unit.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|unit| unit.parent);
        }
        depth
    }

    /// All units strictly below `id`.
    pub fn descendants(&self, id: UnitId) -> impl Iterator<Item = &SourceUnit> + '_ {
        let mut stack: Vec<UnitId> = self.children(id).iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.children(next).iter().rev().copied());
            self.get(next)
        })
    }

    /// The unit whose definition statement starts at `offset`.
    pub fn unit_defined_at(&self, offset: usize) -> Option<UnitId> {
        self.by_offset.get(&offset).copied()
    }

    /// Like [`unit_defined_at`](Self::unit_defined_at), for detectors that
    /// treat a missing unit as a defect.
    pub(crate) fn require_unit_at(
        &self,
        component: &'static str,
        offset: usize,
    ) -> Result<UnitId, InternalAnalysisError> {
        self.unit_defined_at(offset).ok_or_else(|| {
            InternalAnalysisError::new(
                component,
                format!("definition at byte offset {offset} is missing from the tree"),
            )
        })
    }

    /// The innermost unit whose line range covers `line`.
    pub fn innermost_at_line(&self, line: usize) -> &SourceUnit {
        let mut current = self.root();
        loop {
            let next = self
                .children(current.id)
                .iter()
                .filter_map(|id| self.get(*id))
                .find(|child| child.start_line <= line && line <= child.end_line);
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    pub fn find_by_qualified_name(&self, qualified_name: &str) -> Option<&SourceUnit> {
        self.units
            .iter()
            .find(|unit| unit.qualified_name == qualified_name)
    }

    /// The parsed module body.
    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// The file name supplied by the caller, used only for reporting.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Checks the hierarchy invariants: the module is the only root, every
    /// other unit has a parent that precedes it, child spans sit inside the
    /// parent span and sibling spans do not overlap.
    pub fn validate(&self) -> Result<(), InternalAnalysisError> {
        let fail = |message: String| Err(InternalAnalysisError::new("parser", message));

        match self.units.first() {
            Some(root) if root.kind == UnitKind::Module && root.parent.is_none() => {}
            _ => return fail("tree has no module root".to_string()),
        }

        for (index, unit) in self.units.iter().enumerate() {
            if unit.id.0 != index {
                return fail(format!("unit `{}` has a stale id", unit.qualified_name));
            }
            if index == 0 {
                continue;
            }
            let Some(parent_id) = unit.parent else {
                return fail(format!("unit `{}` has no parent", unit.qualified_name));
            };
            if parent_id.0 >= index {
                return fail(format!(
                    "unit `{}` precedes its parent",
                    unit.qualified_name
                ));
            }
            let parent = &self.units[parent_id.0];
            if !parent.span.contains(&unit.span) {
                return fail(format!(
                    "unit `{}` escapes the span of `{}`",
                    unit.qualified_name, parent.qualified_name
                ));
            }
        }

        for siblings in &self.children {
            for pair in siblings.windows(2) {
                let (left, right) = (&self.units[pair[0].0], &self.units[pair[1].0]);
                if left.span.overlaps(&right.span) {
                    return fail(format!(
                        "sibling units `{}` and `{}` overlap",
                        left.qualified_name, right.qualified_name
                    ));
                }
            }
        }

        Ok(())
    }
}

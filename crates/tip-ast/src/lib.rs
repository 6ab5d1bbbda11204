pub mod ids;

use smol_str::SmolStr;
use std::fmt;

pub use ids::{assign_ids, node_index, AssignError, NodeId, NodeInfo, NodeKind, NodeTable};

// ── Source positions ──────────────────────────────────────────────

/// Source span as byte offsets, plus the 1-based line it starts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32) -> Self {
        Self { start, end, line }
    }

    /// A zero-width span on `line`, for trees built without source text.
    pub fn at_line(line: u32) -> Self {
        Self {
            start: 0,
            end: 0,
            line,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}

// ── Program ───────────────────────────────────────────────────────

/// A whole program: a list of functions sharing one name space.
#[derive(Debug, Clone)]
pub struct Program {
    pub id: Option<NodeId>,
    pub functions: Vec<Function>,
    pub span: Span,
}

impl Program {
    pub fn new(functions: Vec<Function>) -> Self {
        let span = functions
            .iter()
            .map(|f| f.span)
            .reduce(Span::merge)
            .unwrap_or_default();
        Self {
            id: None,
            functions,
            span,
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Function definition: `name(formals) { decls stmts return }`
#[derive(Debug, Clone)]
pub struct Function {
    pub id: Option<NodeId>,
    pub name: SmolStr,
    pub formals: Vec<Binding>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Function {
    pub fn new(
        name: impl Into<SmolStr>,
        formals: Vec<Binding>,
        body: Vec<Stmt>,
        span: Span,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            formals,
            body,
            span,
        }
    }
}

/// A name introduced by a formal parameter or a `var` declaration.
/// Its handle is the type variable every reference to the name shares.
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: Option<NodeId>,
    pub name: SmolStr,
    pub span: Span,
}

impl Binding {
    pub fn new(name: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            id: None,
            name: name.into(),
            span,
        }
    }
}

// ── Statements ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: Option<NodeId>,
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            id: None,
            kind,
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Local declaration: `var x, y;`
    Declare(Vec<Binding>),
    /// Block: `{ stmts }`
    Block(Vec<Stmt>),
    /// Assignment: `lhs = rhs;` where lhs is a variable, `*e` or `x.f`
    Assign { lhs: Expr, rhs: Expr },
    /// Loop: `while (cond) body`
    While { cond: Expr, body: Box<Stmt> },
    /// Conditional: `if (cond) then else?`
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `output e;`
    Output(Expr),
    /// `error e;`
    Error(Expr),
    /// `return e;`
    Return(Expr),
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: Option<NodeId>,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            id: None,
            kind,
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal.
    Num(i64),
    /// Variable reference (a local, a formal or a function name).
    Var(SmolStr),
    /// Binary operation: `lhs op rhs`
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Function application: `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `input`
    Input,
    /// Heap allocation: `alloc e`
    Alloc(Box<Expr>),
    /// Address of a variable: `&x`
    AddrOf(SmolStr),
    /// Dereference: `*e`
    Deref(Box<Expr>),
    /// `null`
    Null,
    /// Record construction: `{f: e, ...}`
    Record(Vec<FieldInit>),
    /// Field access: `e.f`
    Access { record: Box<Expr>, field: SmolStr },
}

/// One `name: init` entry of a record constructor.
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub id: Option<NodeId>,
    pub name: SmolStr,
    pub init: Expr,
    pub span: Span,
}

impl FieldInit {
    pub fn new(name: impl Into<SmolStr>, init: Expr, span: Span) -> Self {
        Self {
            id: None,
            name: name.into(),
            init,
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Eq,
}

impl BinOp {
    /// `==` compares any two values of the same type; everything else is
    /// integer-only.
    pub fn is_polymorphic(self) -> bool {
        matches!(self, BinOp::Eq)
    }
}

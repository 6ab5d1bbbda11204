//! Node identity assignment.
//!
//! Every tree node and every declared name gets a handle from one arena, in
//! a fixed pre-order walk: program, then each function (function node,
//! formals, body), statements before their declared names and children,
//! expressions before their operands (left to right). Running the pass on
//! the same tree shape always yields the same numbering, so "node #k" in a
//! diagnostic is reproducible.

use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::fmt;
use std::ops::Index;

use crate::{Binding, Expr, ExprKind, FieldInit, Function, Program, Span, Stmt, StmtKind};

pub type NodeId = Idx<NodeInfo>;

/// The number shown for a handle in diagnostics (`node #k`).
pub fn node_index(id: NodeId) -> u32 {
    u32::from(id.into_raw())
}

// ── Node table ────────────────────────────────────────────────────

/// What the table knows about a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub span: Span,
    /// Declared name for functions, formals and locals; the referenced
    /// name for variable and address-of nodes.
    pub name: Option<SmolStr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Function,
    Formal,
    Local,
    // statements
    Declare,
    Block,
    Assign,
    While,
    If,
    Output,
    Error,
    Return,
    // expressions
    Num,
    Var,
    Binary,
    Call,
    Input,
    Alloc,
    AddrOf,
    Deref,
    Null,
    Record,
    Field,
    Access,
    /// Synthetic handle minted during inference (null pointee, return slot).
    Fresh,
}

impl NodeKind {
    /// Whether nodes of this kind denote a value and so must end up with a type.
    pub fn is_typed(self) -> bool {
        !matches!(
            self,
            NodeKind::Program
                | NodeKind::Declare
                | NodeKind::Block
                | NodeKind::Assign
                | NodeKind::While
                | NodeKind::If
                | NodeKind::Output
                | NodeKind::Error
                | NodeKind::Return
                | NodeKind::Fresh
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Program => "program",
            NodeKind::Function => "function",
            NodeKind::Formal => "formal",
            NodeKind::Local => "local",
            NodeKind::Declare => "declaration",
            NodeKind::Block => "block",
            NodeKind::Assign => "assignment",
            NodeKind::While => "while",
            NodeKind::If => "if",
            NodeKind::Output => "output",
            NodeKind::Error => "error",
            NodeKind::Return => "return",
            NodeKind::Num => "number",
            NodeKind::Var => "variable",
            NodeKind::Binary => "binary operation",
            NodeKind::Call => "call",
            NodeKind::Input => "input",
            NodeKind::Alloc => "alloc",
            NodeKind::AddrOf => "address-of",
            NodeKind::Deref => "dereference",
            NodeKind::Null => "null",
            NodeKind::Record => "record",
            NodeKind::Field => "record field",
            NodeKind::Access => "field access",
            NodeKind::Fresh => "type variable",
        };
        f.write_str(s)
    }
}

/// Handle → node info mapping returned by [`assign_ids`].
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Arena<NodeInfo>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a handle that belongs to no tree node.
    pub fn fresh(&mut self, span: Span) -> NodeId {
        self.nodes.alloc(NodeInfo {
            kind: NodeKind::Fresh,
            span,
            name: None,
        })
    }

    pub fn get(&self, id: NodeId) -> &NodeInfo {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeInfo)> + '_ {
        self.nodes.iter()
    }

    fn alloc(&mut self, kind: NodeKind, span: Span, name: Option<SmolStr>) -> NodeId {
        self.nodes.alloc(NodeInfo { kind, span, name })
    }
}

impl Index<NodeId> for NodeTable {
    type Output = NodeInfo;

    fn index(&self, id: NodeId) -> &NodeInfo {
        &self.nodes[id]
    }
}

// ── Errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("{kind} at {span} already has node #{}", raw(.id))]
    AlreadyAssigned {
        kind: NodeKind,
        id: NodeId,
        span: Span,
    },
}

fn raw(id: &NodeId) -> u32 {
    node_index(*id)
}

// ── Assignment pass ───────────────────────────────────────────────

/// Give every node of `program` a handle. Fails if any node already has one,
/// in which case the tree is left untouched.
pub fn assign_ids(program: &mut Program) -> Result<NodeTable, AssignError> {
    // The first walk only looks for existing handles, so a failure never
    // leaves the tree half numbered.
    let mut scan = Assigner::scan();
    scan.program(program)?;

    let mut pass = Assigner::write();
    pass.program(program)?;
    Ok(pass.table)
}

struct Assigner {
    table: NodeTable,
    write: bool,
}

impl Assigner {
    fn scan() -> Self {
        Self {
            table: NodeTable::new(),
            write: false,
        }
    }

    fn write() -> Self {
        Self {
            table: NodeTable::new(),
            write: true,
        }
    }

    fn claim(
        &mut self,
        slot: &mut Option<NodeId>,
        kind: NodeKind,
        span: Span,
        name: Option<&SmolStr>,
    ) -> Result<(), AssignError> {
        if let Some(id) = *slot {
            return Err(AssignError::AlreadyAssigned { kind, id, span });
        }
        if self.write {
            *slot = Some(self.table.alloc(kind, span, name.cloned()));
        }
        Ok(())
    }

    fn program(&mut self, program: &mut Program) -> Result<(), AssignError> {
        self.claim(&mut program.id, NodeKind::Program, program.span, None)?;
        for function in &mut program.functions {
            self.function(function)?;
        }
        Ok(())
    }

    fn binding(&mut self, binding: &mut Binding, kind: NodeKind) -> Result<(), AssignError> {
        self.claim(&mut binding.id, kind, binding.span, Some(&binding.name))
    }

    fn function(&mut self, function: &mut Function) -> Result<(), AssignError> {
        self.claim(
            &mut function.id,
            NodeKind::Function,
            function.span,
            Some(&function.name),
        )?;
        for formal in &mut function.formals {
            self.binding(formal, NodeKind::Formal)?;
        }
        for stmt in &mut function.body {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt) -> Result<(), AssignError> {
        let kind = match &stmt.kind {
            StmtKind::Declare(_) => NodeKind::Declare,
            StmtKind::Block(_) => NodeKind::Block,
            StmtKind::Assign { .. } => NodeKind::Assign,
            StmtKind::While { .. } => NodeKind::While,
            StmtKind::If { .. } => NodeKind::If,
            StmtKind::Output(_) => NodeKind::Output,
            StmtKind::Error(_) => NodeKind::Error,
            StmtKind::Return(_) => NodeKind::Return,
        };
        self.claim(&mut stmt.id, kind, stmt.span, None)?;

        match &mut stmt.kind {
            StmtKind::Declare(names) => {
                for name in names {
                    self.binding(name, NodeKind::Local)?;
                }
            }
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.stmt(s)?;
                }
            }
            StmtKind::Assign { lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
            }
            StmtKind::While { cond, body } => {
                self.expr(cond)?;
                self.stmt(body)?;
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond)?;
                self.stmt(then_branch)?;
                if let Some(e) = else_branch {
                    self.stmt(e)?;
                }
            }
            StmtKind::Output(e) | StmtKind::Error(e) | StmtKind::Return(e) => {
                self.expr(e)?;
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr) -> Result<(), AssignError> {
        let (kind, name) = match &expr.kind {
            ExprKind::Num(_) => (NodeKind::Num, None),
            ExprKind::Var(name) => (NodeKind::Var, Some(name.clone())),
            ExprKind::Binary { .. } => (NodeKind::Binary, None),
            ExprKind::Call { .. } => (NodeKind::Call, None),
            ExprKind::Input => (NodeKind::Input, None),
            ExprKind::Alloc(_) => (NodeKind::Alloc, None),
            ExprKind::AddrOf(name) => (NodeKind::AddrOf, Some(name.clone())),
            ExprKind::Deref(_) => (NodeKind::Deref, None),
            ExprKind::Null => (NodeKind::Null, None),
            ExprKind::Record(_) => (NodeKind::Record, None),
            ExprKind::Access { .. } => (NodeKind::Access, None),
        };
        self.claim(&mut expr.id, kind, expr.span, name.as_ref())?;

        match &mut expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
            }
            ExprKind::Call { callee, args } => {
                self.expr(callee)?;
                for arg in args {
                    self.expr(arg)?;
                }
            }
            ExprKind::Alloc(inner) | ExprKind::Deref(inner) => self.expr(inner)?,
            ExprKind::Record(fields) => {
                for field in fields {
                    self.field(field)?;
                }
            }
            ExprKind::Access { record, .. } => self.expr(record)?,
            ExprKind::Num(_)
            | ExprKind::Var(_)
            | ExprKind::Input
            | ExprKind::AddrOf(_)
            | ExprKind::Null => {}
        }
        Ok(())
    }

    fn field(&mut self, field: &mut FieldInit) -> Result<(), AssignError> {
        self.claim(
            &mut field.id,
            NodeKind::Field,
            field.span,
            Some(&field.name),
        )?;
        self.expr(&mut field.init)
    }
}

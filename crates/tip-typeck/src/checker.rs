use log::debug;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use tip_ast::*;

use crate::error::{MismatchReason, TypeError};
use crate::result::TypeCheckResult;
use crate::store::UnionFind;
use crate::types::Term;
use crate::{CheckOptions, UnresolvedPolicy};

/// A field access whose record type was still unknown when it was visited.
struct DeferredAccess {
    node: NodeId,
    record: NodeId,
    field: SmolStr,
    span: Span,
}

// ── Type checker ─────────────────────────────────────────────────

/// Walks a numbered tree and feeds one constraint per node into a
/// [`UnionFind`]. One checker (and so one store) per program.
pub struct TypeChecker {
    nodes: NodeTable,
    store: UnionFind,

    /// Function name → function handle, for calls across functions.
    functions: HashMap<SmolStr, NodeId>,
    /// Function handle → its return slot.
    returns: HashMap<NodeId, NodeId>,
    /// Formals and locals of the function being checked.
    scope: HashMap<SmolStr, NodeId>,

    deferred: Vec<DeferredAccess>,
}

type Result<T> = std::result::Result<T, TypeError>;

impl TypeChecker {
    pub fn new(nodes: NodeTable) -> Self {
        Self {
            nodes,
            store: UnionFind::new(),
            functions: HashMap::new(),
            returns: HashMap::new(),
            scope: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    pub fn store(&self) -> &UnionFind {
        &self.store
    }

    // ── Program level ───────────────────────────────────────────

    /// Declare every function, then check each body in order.
    pub fn check_program(&mut self, program: &Program) -> Result<()> {
        id_of(program.id, NodeKind::Program, program.span)?;
        self.declare_functions(program)?;
        for function in &program.functions {
            self.check_function(function)?;
        }
        Ok(())
    }

    /// Bind each function's handle to `(formals) -> ret` with a fresh return
    /// slot, so calls may appear before the callee's definition.
    pub fn declare_functions(&mut self, program: &Program) -> Result<()> {
        for function in &program.functions {
            let id = id_of(function.id, NodeKind::Function, function.span)?;
            if self.functions.contains_key(&function.name) {
                return Err(TypeError::DuplicateName {
                    name: function.name.clone(),
                    node: id,
                    span: function.span,
                });
            }
            self.functions.insert(function.name.clone(), id);
            self.signature(function)?;
        }
        Ok(())
    }

    fn signature(&mut self, function: &Function) -> Result<NodeId> {
        let id = id_of(function.id, NodeKind::Function, function.span)?;
        if let Some(&ret) = self.returns.get(&id) {
            return Ok(ret);
        }
        let formals = function
            .formals
            .iter()
            .map(|f| id_of(f.id, NodeKind::Formal, f.span))
            .collect::<Result<Vec<_>>>()?;
        let ret = self.nodes.fresh(function.span);
        self.returns.insert(id, ret);
        self.bind(id, Term::Function(formals, ret), function.span)?;
        Ok(ret)
    }

    /// Check one function body against the shared store.
    pub fn check_function(&mut self, function: &Function) -> Result<()> {
        let ret = self.enter_function(function)?;
        for stmt in &function.body {
            self.check_stmt(stmt, ret)?;
        }
        Ok(())
    }

    /// Make `function`'s formals and locals the names in scope and return
    /// its return slot, the handle every `return` in the body unifies with.
    /// Drivers that check statements one by one call this first.
    pub fn enter_function(&mut self, function: &Function) -> Result<NodeId> {
        debug!("checking function {}", function.name);
        let ret = self.signature(function)?;

        self.scope.clear();
        for formal in &function.formals {
            self.declare(formal, NodeKind::Formal)?;
        }
        let mut locals = Vec::new();
        collect_locals(&function.body, &mut locals);
        for local in locals {
            self.declare(local, NodeKind::Local)?;
        }
        Ok(ret)
    }

    fn declare(&mut self, binding: &Binding, kind: NodeKind) -> Result<()> {
        let id = id_of(binding.id, kind, binding.span)?;
        if self.scope.insert(binding.name.clone(), id).is_some() {
            return Err(TypeError::DuplicateName {
                name: binding.name.clone(),
                node: id,
                span: binding.span,
            });
        }
        Ok(())
    }

    fn lookup(&self, name: &SmolStr, node: NodeId, span: Span) -> Result<NodeId> {
        self.scope
            .get(name)
            .or_else(|| self.functions.get(name))
            .copied()
            .ok_or_else(|| TypeError::UnboundName {
                name: name.clone(),
                node,
                span,
            })
    }

    // ── Statements ──────────────────────────────────────────────

    /// Constrain one statement of the function last entered. `ret` is the
    /// slot from [`enter_function`](Self::enter_function).
    pub fn check_stmt(&mut self, stmt: &Stmt, ret: NodeId) -> Result<()> {
        let span = stmt.span;
        match &stmt.kind {
            // Names were put in scope when the function was entered.
            StmtKind::Declare(_) => {}
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.check_stmt(s, ret)?;
                }
            }
            StmtKind::Assign { lhs, rhs } => {
                let l = self.check_expr(lhs)?;
                let r = self.check_expr(rhs)?;
                self.unify(l, r, span)?;
            }
            StmtKind::While { cond, body } => {
                let c = self.check_expr(cond)?;
                self.bind(c, Term::Int, cond.span)?;
                self.check_stmt(body, ret)?;
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.check_expr(cond)?;
                self.bind(c, Term::Int, cond.span)?;
                self.check_stmt(then_branch, ret)?;
                if let Some(e) = else_branch {
                    self.check_stmt(e, ret)?;
                }
            }
            StmtKind::Output(arg) | StmtKind::Error(arg) => {
                let a = self.check_expr(arg)?;
                self.bind(a, Term::Int, span)?;
            }
            StmtKind::Return(arg) => {
                let a = self.check_expr(arg)?;
                self.unify(a, ret, span)?;
            }
        }
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────────

    /// Constrain `expr` and its operands; returns the node's handle.
    pub fn check_expr(&mut self, expr: &Expr) -> Result<NodeId> {
        let span = expr.span;
        let id = id_of(expr.id, expr_kind(&expr.kind), span)?;

        match &expr.kind {
            ExprKind::Num(_) | ExprKind::Input => self.bind(id, Term::Int, span)?,

            ExprKind::Var(name) => {
                let decl = self.lookup(name, id, span)?;
                self.unify(id, decl, span)?;
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.check_expr(lhs)?;
                let r = self.check_expr(rhs)?;
                if op.is_polymorphic() {
                    self.unify(l, r, span)?;
                } else {
                    self.bind(l, Term::Int, lhs.span)?;
                    self.bind(r, Term::Int, rhs.span)?;
                }
                self.bind(id, Term::Int, span)?;
            }

            ExprKind::Call { callee, args } => {
                let f = self.check_expr(callee)?;
                let actuals = args
                    .iter()
                    .map(|a| self.check_expr(a))
                    .collect::<Result<Vec<_>>>()?;
                match self.store.resolved_type(f) {
                    Some(Term::Function(params, _)) if params.len() != actuals.len() => {
                        let reason = MismatchReason::Arity {
                            expected: params.len(),
                            found: actuals.len(),
                        };
                        let args: Vec<String> =
                            actuals.iter().map(|a| self.store.render(*a)).collect();
                        let call = format!("({}) -> {}", args.join(","), self.store.render(id));
                        let expected = self.store.render(f);
                        return Err(self.expectation(reason, f, id, expected, call, span));
                    }
                    Some(Term::Function(..)) | None => {}
                    Some(_) => {
                        let found = self.store.render(f);
                        let reason = MismatchReason::NotFunction;
                        return Err(self.expectation(reason, f, id, "function".into(), found, span));
                    }
                }
                self.bind(f, Term::Function(actuals, id), span)?;
            }

            ExprKind::Alloc(inner) => {
                let v = self.check_expr(inner)?;
                self.bind(id, Term::Pointer(v), span)?;
            }

            ExprKind::AddrOf(name) => {
                let decl = self.lookup(name, id, span)?;
                self.bind(id, Term::Pointer(decl), span)?;
            }

            ExprKind::Deref(inner) => {
                let p = self.check_expr(inner)?;
                if let Some(term) = self.store.resolved_type(p) {
                    if !matches!(term, Term::Pointer(_)) {
                        let found = self.store.render(p);
                        let reason = MismatchReason::NotPointer;
                        return Err(self.expectation(reason, p, id, "pointer".into(), found, span));
                    }
                }
                self.bind(p, Term::Pointer(id), span)?;
            }

            ExprKind::Null => {
                let pointee = self.nodes.fresh(span);
                self.bind(id, Term::Pointer(pointee), span)?;
            }

            ExprKind::Record(fields) => {
                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(fields.len());
                for field in fields {
                    let fid = id_of(field.id, NodeKind::Field, field.span)?;
                    if !seen.insert(field.name.clone()) {
                        let reason = MismatchReason::DuplicateField(field.name.clone());
                        let expected = "record with unique field names".to_string();
                        let found = format!("field `{}` given twice", field.name);
                        return Err(self.expectation(reason, id, fid, expected, found, field.span));
                    }
                    let init = self.check_expr(&field.init)?;
                    self.unify(fid, init, field.span)?;
                    entries.push((field.name.clone(), fid));
                }
                self.bind(id, Term::Record(entries), span)?;
            }

            ExprKind::Access { record, field } => {
                let r = self.check_expr(record)?;
                if self.store.resolved_type(r).is_some() {
                    self.access(id, r, field, span)?;
                } else {
                    self.deferred.push(DeferredAccess {
                        node: id,
                        record: r,
                        field: field.clone(),
                        span,
                    });
                }
            }
        }
        Ok(id)
    }

    /// `node` is the type of field `field` of `record`, whose class is bound.
    fn access(&mut self, node: NodeId, record: NodeId, field: &SmolStr, span: Span) -> Result<()> {
        let found = match self.store.resolved_type(record) {
            Some(term @ Term::Record(_)) => term.field(field),
            _ => {
                let found = self.store.render(record);
                let reason = MismatchReason::NotRecord;
                return Err(self.expectation(reason, record, node, "record".into(), found, span));
            }
        };
        match found {
            Some(fid) => self.unify(node, fid, span),
            None => {
                let reason = MismatchReason::MissingField(field.clone());
                let expected = format!("record with field `{}`", field);
                let found = self.store.render(record);
                Err(self.expectation(reason, record, node, expected, found, span))
            }
        }
    }

    /// Retry deferred field accesses until no more records become known.
    fn drain_deferred(&mut self) -> Result<()> {
        loop {
            let pending = std::mem::take(&mut self.deferred);
            let before = pending.len();
            for access in pending {
                if self.store.resolved_type(access.record).is_some() {
                    self.access(access.node, access.record, &access.field, access.span)?;
                } else {
                    self.deferred.push(access);
                }
            }
            if self.deferred.is_empty() || self.deferred.len() == before {
                break;
            }
        }
        match self.deferred.first() {
            Some(access) => Err(self.unresolved(access.record)),
            None => Ok(()),
        }
    }

    // ── Finishing ───────────────────────────────────────────────

    /// Settle deferred constraints, apply the unresolved-type policy and
    /// collect the final type of every typed node.
    pub fn finish(mut self, options: &CheckOptions) -> Result<TypeCheckResult> {
        self.drain_deferred()?;

        let typed: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, info)| info.kind.is_typed())
            .map(|(id, _)| id)
            .collect();

        match options.unresolved {
            UnresolvedPolicy::Reject => {
                let unresolved = typed
                    .iter()
                    .find(|id| !self.store.unresolved_roots(**id).is_empty());
                if let Some(&id) = unresolved {
                    return Err(self.unresolved(id));
                }
            }
            UnresolvedPolicy::DefaultToInt => {
                for &id in &typed {
                    for root in self.store.unresolved_roots(id) {
                        debug!("defaulting #{} to int", node_index(root));
                        let span = self.nodes[id].span;
                        self.bind(root, Term::Int, span)?;
                    }
                }
            }
        }

        debug!("type checking finished: {} typed nodes", typed.len());
        Ok(TypeCheckResult {
            nodes: self.nodes,
            store: self.store,
            functions: self.functions,
        })
    }

    // ── Store access ────────────────────────────────────────────

    fn unify(&mut self, a: NodeId, b: NodeId, span: Span) -> Result<()> {
        self.store.unify(a, b).map_err(|e| e.at(span))
    }

    fn bind(&mut self, id: NodeId, term: Term, span: Span) -> Result<()> {
        self.store.bind_type(id, term).map_err(|e| e.at(span))
    }

    fn expectation(
        &self,
        reason: MismatchReason,
        left: NodeId,
        right: NodeId,
        expected: String,
        found: String,
        span: Span,
    ) -> TypeError {
        let err = TypeError::Mismatch {
            reason,
            left,
            right,
            expected,
            found,
            span,
        };
        debug!("{}", err);
        err
    }

    fn unresolved(&self, id: NodeId) -> TypeError {
        let info = &self.nodes[id];
        TypeError::Unresolved {
            node: id,
            kind: info.kind,
            ty: self.store.render(id),
            span: info.span,
        }
    }
}

fn id_of(id: Option<NodeId>, kind: NodeKind, span: Span) -> Result<NodeId> {
    id.ok_or(TypeError::Unassigned { kind, span })
}

fn expr_kind(kind: &ExprKind) -> NodeKind {
    match kind {
        ExprKind::Num(_) => NodeKind::Num,
        ExprKind::Var(_) => NodeKind::Var,
        ExprKind::Binary { .. } => NodeKind::Binary,
        ExprKind::Call { .. } => NodeKind::Call,
        ExprKind::Input => NodeKind::Input,
        ExprKind::Alloc(_) => NodeKind::Alloc,
        ExprKind::AddrOf(_) => NodeKind::AddrOf,
        ExprKind::Deref(_) => NodeKind::Deref,
        ExprKind::Null => NodeKind::Null,
        ExprKind::Record(_) => NodeKind::Record,
        ExprKind::Access { .. } => NodeKind::Access,
    }
}

/// Every name declared anywhere in `stmts`; locals are visible throughout
/// their function.
fn collect_locals<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a Binding>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Declare(names) => out.extend(names),
            StmtKind::Block(inner) => collect_locals(inner, out),
            StmtKind::While { body, .. } => collect_locals(std::slice::from_ref(&**body), out),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_locals(std::slice::from_ref(&**then_branch), out);
                if let Some(e) = else_branch {
                    collect_locals(std::slice::from_ref(&**e), out);
                }
            }
            _ => {}
        }
    }
}

//! Union-find over type-variable handles.
//!
//! Each handle points at a parent; a handle with no parent entry is the root
//! of its class. A root may carry one bound [`Term`]. Handles are added
//! lazily: the first time a handle is seen it is its own singleton class.
//!
//! Root choice is deterministic so that `unify(x, y)` and `unify(y, x)`
//! leave the store in the same state: a bound root beats an unbound one,
//! otherwise the lower handle wins.

use la_arena::ArenaMap;
use log::{debug, trace};
use std::collections::HashSet;
use std::fmt::Write;
use tip_ast::{node_index, NodeId, Span};

use crate::error::{MismatchReason, TypeError};
use crate::types::{Term, Ty};

/// Printed width after which [`UnionFind::render`] elides the rest.
const RENDER_LIMIT: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: ArenaMap<NodeId, NodeId>,
    terms: ArenaMap<NodeId, Term>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of `x`'s class. No path compression, so lookups never mutate.
    pub fn find(&self, mut x: NodeId) -> NodeId {
        while let Some(&p) = self.parent.get(x) {
            x = p;
        }
        x
    }

    pub fn same_class(&self, x: NodeId, y: NodeId) -> bool {
        self.find(x) == self.find(y)
    }

    /// The term bound to `x`'s class, or `None` while it is unresolved.
    pub fn resolved_type(&self, x: NodeId) -> Option<&Term> {
        self.terms.get(self.find(x))
    }

    /// Expand `x`'s class into a full type, naming unbound classes by root.
    /// Shared sub-terms are copied, so the result can be far larger than the
    /// store; use [`render`](Self::render) for diagnostics.
    pub fn resolve(&self, x: NodeId) -> Ty {
        let root = self.find(x);
        match self.terms.get(root) {
            Some(term) => self.expand(term),
            None => Ty::Var(node_index(root)),
        }
    }

    pub fn expand(&self, term: &Term) -> Ty {
        match term {
            Term::Int => Ty::Int,
            Term::Pointer(p) => Ty::pointer(self.resolve(*p)),
            Term::Function(params, ret) => Ty::function(
                params.iter().map(|p| self.resolve(*p)).collect(),
                self.resolve(*ret),
            ),
            Term::Record(fields) => Ty::Record(
                fields
                    .iter()
                    .map(|(name, id)| (name.clone(), self.resolve(*id)))
                    .collect(),
            ),
        }
    }

    /// Printable form of `x`'s type, cut off with `..` once it gets long.
    pub fn render(&self, x: NodeId) -> String {
        let mut out = String::new();
        self.write_class(x, &mut out);
        out
    }

    pub fn render_term(&self, term: &Term) -> String {
        let mut out = String::new();
        self.write_term(term, &mut out);
        out
    }

    fn write_class(&self, x: NodeId, out: &mut String) {
        if out.len() >= RENDER_LIMIT {
            out.push_str("..");
            return;
        }
        let root = self.find(x);
        match self.terms.get(root) {
            Some(term) => self.write_term(term, out),
            None => {
                let _ = write!(out, "?{}", node_index(root));
            }
        }
    }

    fn write_term(&self, term: &Term, out: &mut String) {
        match term {
            Term::Int => out.push_str("int"),
            Term::Pointer(p) => {
                out.push('&');
                self.write_class(*p, out);
            }
            Term::Function(params, ret) => {
                out.push('(');
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_class(*p, out);
                    if out.len() >= RENDER_LIMIT && i + 1 < params.len() {
                        out.push_str(",..");
                        break;
                    }
                }
                out.push_str(") -> ");
                self.write_class(*ret, out);
            }
            Term::Record(fields) => {
                out.push('{');
                for (i, (name, id)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(name);
                    out.push(':');
                    self.write_class(*id, out);
                    if out.len() >= RENDER_LIMIT && i + 1 < fields.len() {
                        out.push_str(",..");
                        break;
                    }
                }
                out.push('}');
            }
        }
    }

    /// Roots of every unbound class reachable from `x`, including `x`'s own.
    pub fn unresolved_roots(&self, x: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![x];
        while let Some(h) = stack.pop() {
            let root = self.find(h);
            if !seen.insert(root) {
                continue;
            }
            match self.terms.get(root) {
                Some(term) => stack.extend(term.children().into_iter().rev()),
                None => out.push(root),
            }
        }
        out
    }

    // ── Unification ──────────────────────────────────────────────

    /// Make `x` and `y` denote the same type.
    pub fn unify(&mut self, x: NodeId, y: NodeId) -> Result<(), TypeError> {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return Ok(());
        }

        match (self.terms.get(rx).cloned(), self.terms.get(ry).cloned()) {
            (None, None) => {
                let (root, child) = lower_first(rx, ry);
                self.link(child, root);
                Ok(())
            }
            (Some(tx), None) => {
                self.check_occurs(ry, &tx, y)?;
                self.link(ry, rx);
                Ok(())
            }
            (None, Some(ty)) => {
                self.check_occurs(rx, &ty, x)?;
                self.link(rx, ry);
                Ok(())
            }
            (Some(tx), Some(ty)) => {
                let pairs = self
                    .pair_up(&tx, &ty)
                    .map_err(|reason| self.mismatch(reason, x, y, &tx, &ty))?;
                self.check_occurs(ry, &tx, y)?;
                self.check_occurs(rx, &ty, x)?;

                let (root, child) = lower_first(rx, ry);
                // The child's stale term is never read again once it has a parent.
                self.link(child, root);

                for (a, b) in pairs {
                    self.unify(a, b)?;
                }
                Ok(())
            }
        }
    }

    /// Force `x`'s class to carry `term`, merging with any term already bound.
    pub fn bind_type(&mut self, x: NodeId, term: Term) -> Result<(), TypeError> {
        let root = self.find(x);
        self.check_occurs(root, &term, x)?;

        let Some(existing) = self.terms.get(root).cloned() else {
            trace!("bind #{} := {}", node_index(root), term.shape());
            self.terms.insert(root, term);
            return Ok(());
        };

        let pairs = self
            .pair_up(&existing, &term)
            .map_err(|reason| self.mismatch(reason, x, x, &existing, &term))?;
        for (a, b) in pairs {
            self.unify(a, b)?;
        }
        Ok(())
    }

    fn link(&mut self, child: NodeId, root: NodeId) {
        trace!("link #{} -> #{}", node_index(child), node_index(root));
        self.parent.insert(child, root);
    }

    /// Corresponding sub-handles of two bound terms, or why they can't match.
    /// Record fields are paired in name order so the result does not depend
    /// on which side is `a`.
    fn pair_up(&self, a: &Term, b: &Term) -> Result<Vec<(NodeId, NodeId)>, MismatchReason> {
        match (a, b) {
            (Term::Int, Term::Int) => Ok(Vec::new()),
            (Term::Pointer(p), Term::Pointer(q)) => Ok(vec![(*p, *q)]),
            (Term::Function(p1, r1), Term::Function(p2, r2)) => {
                if p1.len() != p2.len() {
                    return Err(MismatchReason::Arity {
                        expected: p1.len(),
                        found: p2.len(),
                    });
                }
                let mut pairs: Vec<_> = p1.iter().copied().zip(p2.iter().copied()).collect();
                pairs.push((*r1, *r2));
                Ok(pairs)
            }
            (Term::Record(f1), Term::Record(f2)) => {
                if f1.len() != f2.len() {
                    return Err(MismatchReason::Fields);
                }
                let mut pairs = Vec::with_capacity(f1.len());
                for (name, id) in f1 {
                    let other = b.field(name).ok_or(MismatchReason::Fields)?;
                    pairs.push((name, *id, other));
                }
                pairs.sort_by(|x, y| x.0.cmp(y.0));
                Ok(pairs.into_iter().map(|(_, p, q)| (p, q)).collect())
            }
            _ => Err(MismatchReason::Shape),
        }
    }

    /// Fail if `root` is reachable from `term`'s sub-handles, i.e. binding
    /// `term` to `root`'s class would make a type contain itself.
    fn check_occurs(&self, root: NodeId, term: &Term, at: NodeId) -> Result<(), TypeError> {
        let mut seen = HashSet::new();
        let mut stack = term.children();
        while let Some(h) = stack.pop() {
            let r = self.find(h);
            if r == root {
                let err = TypeError::Infinite {
                    node: at,
                    node_ty: self.render(root),
                    ty: self.render_term(term),
                    span: Span::default(),
                };
                debug!("{}", err);
                return Err(err);
            }
            if seen.insert(r) {
                if let Some(t) = self.terms.get(r) {
                    stack.extend(t.children());
                }
            }
        }
        Ok(())
    }

    fn mismatch(
        &self,
        reason: MismatchReason,
        left: NodeId,
        right: NodeId,
        expected: &Term,
        found: &Term,
    ) -> TypeError {
        let err = TypeError::Mismatch {
            reason,
            left,
            right,
            expected: self.render_term(expected),
            found: self.render_term(found),
            span: Span::default(),
        };
        debug!("{}", err);
        err
    }
}

fn lower_first(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if node_index(a) < node_index(b) {
        (a, b)
    } else {
        (b, a)
    }
}

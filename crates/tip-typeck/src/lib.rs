//! Type inference for TIP programs.
//!
//! Every node of a numbered tree (see [`tip_ast::assign_ids`]) is a type
//! variable. The checker walks the tree once, turning each node into
//! equality constraints over a single union-find store; a program is
//! well-typed when every constraint holds and every value-bearing node
//! ends up with a fully resolved type. Typing is monomorphic: one type per
//! declaration, shared by every use.

mod checker;
mod error;
mod result;
mod store;
mod types;

pub use checker::TypeChecker;
pub use error::{MismatchReason, TypeError};
pub use result::TypeCheckResult;
pub use store::UnionFind;
pub use types::{Term, Ty};

use tip_ast::{NodeTable, Program};

// ── Options ──────────────────────────────────────────────────────

/// What to do with a node whose type is still unknown after the whole
/// program has been checked (e.g. a parameter that is never used).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Report `TypeError::Unresolved` for the first such node.
    #[default]
    Reject,
    /// Bind every remaining unknown to `int`.
    DefaultToInt,
}

#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    pub unresolved: UnresolvedPolicy,
}

// ── Public API ───────────────────────────────────────────────────

pub fn check(program: &Program, nodes: NodeTable) -> Result<TypeCheckResult, TypeError> {
    check_with_options(program, nodes, &CheckOptions::default())
}

/// Type-check a numbered program. `nodes` is the table returned by
/// [`tip_ast::assign_ids`] for this same tree.
pub fn check_with_options(
    program: &Program,
    nodes: NodeTable,
    options: &CheckOptions,
) -> Result<TypeCheckResult, TypeError> {
    let mut checker = TypeChecker::new(nodes);
    checker.check_program(program)?;
    checker.finish(options)
}

#[cfg(test)]
mod tests;

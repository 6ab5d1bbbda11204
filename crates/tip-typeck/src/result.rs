use smol_str::SmolStr;
use std::collections::HashMap;
use tip_ast::{NodeId, NodeTable};

use crate::store::UnionFind;
use crate::types::{Term, Ty};

/// Everything a printer or code generator needs after a successful run.
///
/// Types are read out of the final store on demand. Classes may share
/// sub-terms, so expanding every node up front could cost far more than the
/// check itself.
#[derive(Debug)]
pub struct TypeCheckResult {
    /// Handle table, including the synthetic handles minted during inference.
    pub nodes: NodeTable,
    /// The final store; still answers `resolved_type` for any handle.
    pub store: UnionFind,
    /// Function name → function handle.
    pub functions: HashMap<SmolStr, NodeId>,
}

impl TypeCheckResult {
    /// Full type of a typed node (expression, record field, formal, local or
    /// function); `None` for statements, the program and synthetic handles.
    /// `id` must come from this result's table.
    pub fn type_of(&self, id: NodeId) -> Option<Ty> {
        self.nodes[id]
            .kind
            .is_typed()
            .then(|| self.store.resolve(id))
    }

    /// Handles of every node that has a type, in numbering order.
    pub fn typed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, info)| info.kind.is_typed())
            .map(|(id, _)| id)
    }

    pub fn resolved_type(&self, id: NodeId) -> Option<&Term> {
        self.store.resolved_type(id)
    }

    /// Diagnostic form of `id`'s type, elided when long.
    pub fn render(&self, id: NodeId) -> String {
        self.store.render(id)
    }

    pub fn function_type(&self, name: &str) -> Option<Ty> {
        self.functions.get(name).map(|id| self.store.resolve(*id))
    }
}

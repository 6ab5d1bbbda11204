use smol_str::SmolStr;
use std::fmt;
use tip_ast::{node_index, NodeId, NodeKind, Span};

/// Why two types could not be made equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    /// Different type constructors (e.g. int vs pointer).
    Shape,
    /// Functions with different parameter counts.
    Arity { expected: usize, found: usize },
    /// Records with different field-name sets.
    Fields,
    MissingField(SmolStr),
    DuplicateField(SmolStr),
    NotPointer,
    NotRecord,
    NotFunction,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::Shape => write!(f, "type mismatch"),
            MismatchReason::Arity { expected, found } => {
                write!(f, "arity mismatch: expected {} arguments, found {}", expected, found)
            }
            MismatchReason::Fields => write!(f, "record fields differ"),
            MismatchReason::MissingField(name) => write!(f, "no field `{}`", name),
            MismatchReason::DuplicateField(name) => write!(f, "field `{}` given twice", name),
            MismatchReason::NotPointer => write!(f, "dereference of a non-pointer"),
            MismatchReason::NotRecord => write!(f, "field access on a non-record"),
            MismatchReason::NotFunction => write!(f, "call of a non-function"),
        }
    }
}

/// A failed type-checking run. The first error aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("[{span}] {reason} at node #{}: {expected} does not match {found}", raw(.left))]
    Mismatch {
        reason: MismatchReason,
        /// Handle whose class holds `expected`.
        left: NodeId,
        /// Handle whose class holds `found`.
        right: NodeId,
        expected: String,
        found: String,
        span: Span,
    },

    #[error("[{span}] infinite type at node #{}: {node_ty} would contain itself in {ty}", raw(.node))]
    Infinite {
        node: NodeId,
        node_ty: String,
        ty: String,
        span: Span,
    },

    #[error("[{span}] cannot infer a type for {kind} node #{}: {ty}", raw(.node))]
    Unresolved {
        node: NodeId,
        kind: NodeKind,
        ty: String,
        span: Span,
    },

    #[error("[{span}] unknown identifier `{name}`")]
    UnboundName {
        name: SmolStr,
        node: NodeId,
        span: Span,
    },

    #[error("[{span}] `{name}` is declared more than once")]
    DuplicateName {
        name: SmolStr,
        node: NodeId,
        span: Span,
    },

    #[error("[{span}] {kind} has no node id; run identity assignment first")]
    Unassigned { kind: NodeKind, span: Span },
}

fn raw(id: &NodeId) -> u32 {
    node_index(*id)
}

impl TypeError {
    /// Whether this is a contradiction between two types, as opposed to a
    /// program that is merely underconstrained or malformed.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, TypeError::Mismatch { .. } | TypeError::Infinite { .. })
    }

    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::Infinite { span, .. }
            | TypeError::Unresolved { span, .. }
            | TypeError::UnboundName { span, .. }
            | TypeError::DuplicateName { span, .. }
            | TypeError::Unassigned { span, .. } => *span,
        }
    }

    /// Attach the source position of the node whose constraint failed.
    pub(crate) fn at(mut self, at: Span) -> Self {
        match &mut self {
            TypeError::Mismatch { span, .. }
            | TypeError::Infinite { span, .. }
            | TypeError::Unresolved { span, .. }
            | TypeError::UnboundName { span, .. }
            | TypeError::DuplicateName { span, .. }
            | TypeError::Unassigned { span, .. } => *span = at,
        }
        self
    }

    pub fn reason(&self) -> Option<&MismatchReason> {
        match self {
            TypeError::Mismatch { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

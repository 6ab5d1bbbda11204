use smol_str::SmolStr;
use std::fmt;
use tip_ast::NodeId;

// ── Terms ────────────────────────────────────────────────────────

/// The shape bound to an equivalence class. Sub-terms are handles, so a
/// term can be partially resolved while its components are still unknown.
/// "Unresolved" is the absence of a bound term, not a variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Int,
    /// Pointer to the pointee's class
    Pointer(NodeId),
    /// Function type: (params...) -> return
    Function(Vec<NodeId>, NodeId),
    /// Record type: field name -> field class, names unique
    Record(Vec<(SmolStr, NodeId)>),
}

impl Term {
    /// Every handle this term refers to, in a fixed order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Term::Int => Vec::new(),
            Term::Pointer(p) => vec![*p],
            Term::Function(params, ret) => {
                let mut out = params.clone();
                out.push(*ret);
                out
            }
            Term::Record(fields) => fields.iter().map(|(_, id)| *id).collect(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Term::Int => "int",
            Term::Pointer(_) => "pointer",
            Term::Function(..) => "function",
            Term::Record(_) => "record",
        }
    }

    pub fn field(&self, name: &str) -> Option<NodeId> {
        match self {
            Term::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, id)| *id),
            _ => None,
        }
    }
}

// ── Resolved types ───────────────────────────────────────────────

/// A type with every bound class expanded. `Var` marks a class that has no
/// term yet and is named by its root handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Int,
    Pointer(Box<Ty>),
    Function(Vec<Ty>, Box<Ty>),
    Record(Vec<(SmolStr, Ty)>),
    Var(u32),
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Pointer(inner) => write!(f, "&{}", inner),
            Ty::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Ty::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", name, ty)?;
                }
                write!(f, "}}")
            }
            Ty::Var(id) => write!(f, "?{}", id),
        }
    }
}

impl Ty {
    pub fn pointer(inner: Ty) -> Ty {
        Ty::Pointer(Box::new(inner))
    }

    pub fn function(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Function(params, Box::new(ret))
    }

    pub fn record<I, S>(fields: I) -> Ty
    where
        I: IntoIterator<Item = (S, Ty)>,
        S: Into<SmolStr>,
    {
        Ty::Record(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    /// True when no unresolved class remains anywhere inside.
    pub fn is_resolved(&self) -> bool {
        match self {
            Ty::Int => true,
            Ty::Var(_) => false,
            Ty::Pointer(inner) => inner.is_resolved(),
            Ty::Function(params, ret) => params.iter().all(Ty::is_resolved) && ret.is_resolved(),
            Ty::Record(fields) => fields.iter().all(|(_, t)| t.is_resolved()),
        }
    }

    /// Structural compatibility. Records match when they have the same field
    /// names (in any order) with compatible field types; there is no
    /// subtyping. An unresolved class is only compatible with itself.
    pub fn compatible(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Int, Ty::Int) => true,
            (Ty::Var(a), Ty::Var(b)) => a == b,
            (Ty::Pointer(a), Ty::Pointer(b)) => a.compatible(b),
            (Ty::Function(p1, r1), Ty::Function(p2, r2)) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(a, b)| a.compatible(b))
                    && r1.compatible(r2)
            }
            (Ty::Record(f1), Ty::Record(f2)) => {
                f1.len() == f2.len()
                    && f1.iter().all(|(name, a)| {
                        f2.iter()
                            .find(|(n, _)| n == name)
                            .is_some_and(|(_, b)| a.compatible(b))
                    })
            }
            _ => false,
        }
    }
}

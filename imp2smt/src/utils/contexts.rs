use std::collections::{HashMap, HashSet, VecDeque};

use strum::Display;

/// Where an expression occurs. Placement of division, calls, quantifiers and
/// the result-pseudo-variable is a pure function of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprContext {
    /// Ordinary statement expressions.
    Code,
    /// Preconditions, invariants and variants.
    Metacondition,
    /// Postconditions: a metacondition that may also name `result`.
    Postcondition,
    /// The right-hand side of an assignment.
    AssignmentRhs,
}

impl ExprContext {
    pub fn is_spec(&self) -> bool {
        matches!(self, Self::Metacondition | Self::Postcondition)
    }

    /// Context for subexpressions of a compound expression. The assignment
    /// RHS privileges (top-level call or division) do not extend to operands.
    pub fn child(&self) -> Self {
        match self {
            Self::AssignmentRhs => Self::Code,
            other => *other,
        }
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "bool")]
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correctness {
    #[default]
    Partial,
    Total,
}

/// Per-declaration variable environment: parameters and assigned locals with
/// their program-wide-stable types.
#[derive(Debug, Clone, Default)]
pub struct TypeContext {
    vars: HashMap<String, ValueType>,
    params: HashSet<String>,
}

impl TypeContext {
    pub fn get(&self, name: &str) -> Option<ValueType> {
        self.vars.get(name).copied()
    }

    pub fn declare(&mut self, name: &str, typ: ValueType) {
        self.vars.insert(name.to_owned(), typ);
    }

    pub fn declare_param(&mut self, name: &str) {
        self.params.insert(name.to_owned());
        self.declare(name, ValueType::Int);
    }

    pub fn is_param(&self, name: &str) -> bool {
        self.params.contains(name)
    }

    /// Variables in a deterministic order, for counterexample reporting.
    pub fn sorted_vars(&self) -> Vec<(&str, ValueType)> {
        let mut vars: Vec<_> = self.vars.iter().map(|(n, t)| (n.as_str(), *t)).collect();
        vars.sort_by_key(|(n, _)| *n);
        vars
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Proc,
    SpecFn,
}

/// Name, arity and result type of a declaration, registered before bodies
/// are checked so forward references resolve.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub kind: DeclKind,
    pub arity: usize,
    pub returns: ValueType,
}

/// Direct call graph: procedure name to the set of procedures it invokes.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    edges: HashMap<String, HashSet<String>>,
}

impl CallGraph {
    pub fn add_edge(&mut self, caller: &str, callee: &str) {
        self.edges
            .entry(caller.to_owned())
            .or_default()
            .insert(callee.to_owned());
    }

    pub fn callees(&self, caller: &str) -> impl Iterator<Item = &str> {
        self.edges.get(caller).into_iter().flatten().map(String::as_str)
    }

    /// Whether `to` is reachable from `from`, including the zero-step case
    /// `from == to`.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for callee in self.callees(node) {
                if callee == to {
                    return true;
                }
                if seen.insert(callee) {
                    queue.push_back(callee);
                }
            }
        }
        false
    }

    /// Whether a call to `callee` from inside `caller` is part of a
    /// recursion, i.e. can lead back to `caller`.
    pub fn call_is_recursive(&self, callee: &str, caller: &str) -> bool {
        self.reaches(callee, caller)
    }

    /// Whether `name` participates in any recursion cycle, self or mutual.
    pub fn is_recursive(&self, name: &str) -> bool {
        self.callees(name).any(|callee| self.reaches(callee, name))
    }
}

/// Everything the type checker hands to the verification engine: per-name
/// signatures, per-declaration variable environments, and the call graph.
#[derive(Debug, Clone, Default)]
pub struct ProgramContext {
    pub signatures: HashMap<String, Signature>,
    pub vartypes: HashMap<String, TypeContext>,
    pub call_graph: CallGraph,
}

impl ProgramContext {
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.signatures.get(name)
    }

    pub fn env(&self, decl: &str) -> &TypeContext {
        &self.vartypes[decl]
    }
}

use std::fmt;

use thiserror::Error;

use crate::ast::Loc;

use super::ValueType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("variable `{name}` not defined")]
    UndefinedVariable { loc: Loc, name: String },
    #[error("`{name}` is not defined")]
    UndefinedFunction { loc: Loc, name: String },
    #[error("expected {expected}, got {actual}")]
    Mismatch {
        loc: Loc,
        expected: ValueType,
        actual: ValueType,
    },
    #[error("division is only allowed at the top level of an assignment or specification")]
    IllegalDivision { loc: Loc },
    #[error("call to procedure `{name}` is only allowed as the right-hand side of an assignment")]
    IllegalProcCall { loc: Loc, name: String },
    #[error("specification function `{name}` can only be called from specifications")]
    IllegalSpecCall { loc: Loc, name: String },
    #[error("`result` is only allowed in postconditions")]
    IllegalResult { loc: Loc },
    #[error("quantifiers are only allowed in specifications")]
    IllegalQuantifier { loc: Loc },
    #[error("`{name}` expects {expected} arguments, got {actual}")]
    ArityMismatch {
        loc: Loc,
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate declaration `{name}`")]
    DuplicateDeclaration { loc: Loc, name: String },
    #[error("duplicate parameter `{name}`")]
    DuplicateParameter { loc: Loc, name: String },
    #[error("`{name}` shadows a variable already in scope")]
    ShadowedBinding { loc: Loc, name: String },
    #[error("`{name}` is a reserved name")]
    ReservedName { loc: Loc, name: String },
    #[error("parameter `{name}` cannot be reassigned")]
    ParameterReassignment { loc: Loc, name: String },
    #[error("control can fall off the end of procedure `{name}` without returning")]
    MissingReturn { loc: Loc, name: String },
    #[error("cannot infer the return type of `{name}`")]
    AmbiguousReturnType { loc: Loc, name: String },
}

impl TypeError {
    pub fn loc(&self) -> Loc {
        match self {
            Self::UndefinedVariable { loc, .. }
            | Self::UndefinedFunction { loc, .. }
            | Self::Mismatch { loc, .. }
            | Self::IllegalDivision { loc }
            | Self::IllegalProcCall { loc, .. }
            | Self::IllegalSpecCall { loc, .. }
            | Self::IllegalResult { loc }
            | Self::IllegalQuantifier { loc }
            | Self::ArityMismatch { loc, .. }
            | Self::DuplicateDeclaration { loc, .. }
            | Self::DuplicateParameter { loc, .. }
            | Self::ShadowedBinding { loc, .. }
            | Self::ReservedName { loc, .. }
            | Self::ParameterReassignment { loc, .. }
            | Self::MissingReturn { loc, .. }
            | Self::AmbiguousReturnType { loc, .. } => *loc,
        }
    }
}

/// Source-level variable assignments witnessing a failed obligation,
/// extracted from a solver model and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counterexample {
    pub bindings: Vec<(String, String)>,
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.bindings {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing invariant expression")]
    MissingInvariant { loc: Loc },
    #[error("missing variant expression")]
    MissingVariant { loc: Loc },
    #[error("missing postcondition for procedure `{name}`")]
    MissingPostcondition { loc: Loc, name: String },
    #[error("cannot prove {obligation}")]
    Unprovable {
        loc: Loc,
        obligation: String,
        counterexample: Option<Counterexample>,
    },
    #[error("unsatisfiable precondition found")]
    UnsatisfiablePrecondition { loc: Loc },
    #[error("solver could not decide {obligation}")]
    SolverIncomplete { loc: Loc, obligation: String },
}

impl VerificationError {
    pub fn loc(&self) -> Loc {
        match self {
            Self::MissingInvariant { loc }
            | Self::MissingVariant { loc }
            | Self::MissingPostcondition { loc, .. }
            | Self::Unprovable { loc, .. }
            | Self::UnsatisfiablePrecondition { loc }
            | Self::SolverIncomplete { loc, .. } => *loc,
        }
    }

    pub fn counterexample(&self) -> Option<&Counterexample> {
        match self {
            Self::Unprovable {
                counterexample: Some(cex),
                ..
            } => Some(cex),
            _ => None,
        }
    }
}

/// The solver answered `unknown`. Decision-procedure incompleteness is an
/// internal failure, never a verification verdict; callers attach the
/// obligation and position.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("solver returned unknown")]
pub struct SolverUnknown;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl Error {
    pub fn loc(&self) -> Loc {
        match self {
            Self::Type(e) => e.loc(),
            Self::Verification(e) => e.loc(),
        }
    }

    /// Full positioned diagnostic, with the counterexample when one exists.
    pub fn report(&self, source: &str) -> String {
        let mut out = self.loc().render(source, &self.to_string());
        if let Self::Verification(e) = self {
            if let Some(cex) = e.counterexample() {
                out.push_str(&format!("\ncounterexample: {cex}"));
            }
        }
        out
    }
}

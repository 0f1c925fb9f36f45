use strum::{Display, EnumString};

use super::Loc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    BoolLit(BoolLit),
    IntLit(IntLit),
    Var(Var),
    UnOp(UnOp),
    BinOp(BinOp),
    Ternary(Ternary),
    Call(Call),
    Result(ResultVar),
    Quantified(Quantified),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoolLit {
    pub loc: Loc,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntLit {
    pub loc: Loc,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub loc: Loc,
    pub name: String,
}

#[derive(EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOpKind {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnOp {
    pub loc: Loc,
    pub op: UnOpKind,
    pub expr: Box<Expr>,
}

#[derive(EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Lte,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Gte,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Neq,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

impl BinOpKind {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Lte | Self::Gt | Self::Gte | Self::Eq | Self::Neq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_divmod(&self) -> bool {
        matches!(self, Self::Div | Self::Mod)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinOp {
    pub loc: Loc,
    pub op: BinOpKind,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ternary {
    pub loc: Loc,
    pub cond: Box<Expr>,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub loc: Loc,
    pub callee: String,
    pub args: Vec<Expr>,
}

/// The result-pseudo-variable, standing for a procedure's return value.
/// Only legal inside that procedure's postcondition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultVar {
    pub loc: Loc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Forall,
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantified {
    pub loc: Loc,
    pub quantifier: Quantifier,
    pub binders: Vec<Var>,
    pub body: Box<Expr>,
}

impl Expr {
    pub fn loc(&self) -> Loc {
        match self {
            Self::BoolLit(e) => e.loc,
            Self::IntLit(e) => e.loc,
            Self::Var(e) => e.loc,
            Self::UnOp(e) => e.loc,
            Self::BinOp(e) => e.loc,
            Self::Ternary(e) => e.loc,
            Self::Call(e) => e.loc,
            Self::Result(e) => e.loc,
            Self::Quantified(e) => e.loc,
        }
    }

    pub fn int(value: i64) -> Self {
        Self::IntLit(IntLit {
            loc: Loc::default(),
            value,
        })
    }

    pub fn bool(value: bool) -> Self {
        Self::BoolLit(BoolLit {
            loc: Loc::default(),
            value,
        })
    }

    pub fn var(name: &str) -> Self {
        Self::Var(Var::new(name))
    }

    pub fn unop(op: UnOpKind, expr: Expr) -> Self {
        Self::UnOp(UnOp {
            loc: Loc::default(),
            op,
            expr: Box::new(expr),
        })
    }

    pub fn binop(op: BinOpKind, left: Expr, right: Expr) -> Self {
        Self::BinOp(BinOp {
            loc: Loc::default(),
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn ternary(cond: Expr, left: Expr, right: Expr) -> Self {
        Self::Ternary(Ternary {
            loc: Loc::default(),
            cond: Box::new(cond),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Self::Call(Call {
            loc: Loc::default(),
            callee: callee.to_owned(),
            args,
        })
    }

    pub fn result() -> Self {
        Self::Result(ResultVar { loc: Loc::default() })
    }

    pub fn quantified(quantifier: Quantifier, binders: &[&str], body: Expr) -> Self {
        Self::Quantified(Quantified {
            loc: Loc::default(),
            quantifier,
            binders: binders.iter().map(|b| Var::new(b)).collect(),
            body: Box::new(body),
        })
    }
}

impl Var {
    pub fn new(name: &str) -> Self {
        Self {
            loc: Loc::default(),
            name: name.to_owned(),
        }
    }
}

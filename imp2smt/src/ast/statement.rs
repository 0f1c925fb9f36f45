use super::{Expr, Loc, Var};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Assign(Assign),
    If(If),
    While(While),
    Assert(Assert),
    Return(Return),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assign {
    pub loc: Loc,
    pub dest: Var,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct If {
    pub loc: Loc,
    pub cond: Expr,
    pub then_branch: Block,
    pub else_branch: Else,
}

/// The else arm is mandatory and is either a block or another conditional.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Else {
    Block(Block),
    If(Box<If>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct While {
    pub loc: Loc,
    pub invariant: Option<Expr>,
    pub variant: Option<Expr>,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assert {
    pub loc: Loc,
    pub cond: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Return {
    pub loc: Loc,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    pub loc: Loc,
    pub stmts: Vec<Stmt>,
}

impl Stmt {
    pub fn loc(&self) -> Loc {
        match self {
            Self::Assign(s) => s.loc,
            Self::If(s) => s.loc,
            Self::While(s) => s.loc,
            Self::Assert(s) => s.loc,
            Self::Return(s) => s.loc,
            Self::Block(s) => s.loc,
        }
    }

    pub fn assign(dest: &str, value: Expr) -> Self {
        Self::Assign(Assign {
            loc: Loc::default(),
            dest: Var::new(dest),
            value,
        })
    }

    pub fn if_else(cond: Expr, then_branch: Block, else_branch: Else) -> Self {
        Self::If(If {
            loc: Loc::default(),
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_loop(
        invariant: Option<Expr>,
        variant: Option<Expr>,
        cond: Expr,
        body: Block,
    ) -> Self {
        Self::While(While {
            loc: Loc::default(),
            invariant,
            variant,
            cond,
            body,
        })
    }

    pub fn assert(cond: Expr) -> Self {
        Self::Assert(Assert {
            loc: Loc::default(),
            cond,
        })
    }

    pub fn ret(value: Expr) -> Self {
        Self::Return(Return {
            loc: Loc::default(),
            value,
        })
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            loc: Loc::default(),
            stmts,
        }
    }
}

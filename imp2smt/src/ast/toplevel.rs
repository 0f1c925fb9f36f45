use super::{Block, Expr, Loc, Var};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Decl {
    Proc(Proc),
    SpecFn(SpecFn),
}

/// A procedure with its Hoare contract. The variant is the recursion
/// variant; loop variants live on the loops themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proc {
    pub loc: Loc,
    pub pre: Option<Expr>,
    pub post: Option<Expr>,
    pub variant: Option<Expr>,
    pub name: String,
    pub params: Vec<Var>,
    pub body: Block,
}

/// A pure specification function or predicate: a single expression over its
/// parameters, usable only from specification contexts. May be mutually
/// recursive with other specification functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecFn {
    pub loc: Loc,
    pub name: String,
    pub params: Vec<Var>,
    pub body: Expr,
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Self::Proc(p) => &p.name,
            Self::SpecFn(f) => &f.name,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Self::Proc(p) => p.loc,
            Self::SpecFn(f) => f.loc,
        }
    }
}

impl Proc {
    pub fn new(name: &str, params: &[&str], body: Block) -> Self {
        Self {
            loc: Loc::default(),
            pre: None,
            post: None,
            variant: None,
            name: name.to_owned(),
            params: params.iter().map(|p| Var::new(p)).collect(),
            body,
        }
    }

    pub fn with_pre(mut self, pre: Expr) -> Self {
        self.pre = Some(pre);
        self
    }

    pub fn with_post(mut self, post: Expr) -> Self {
        self.post = Some(post);
        self
    }

    pub fn with_variant(mut self, variant: Expr) -> Self {
        self.variant = Some(variant);
        self
    }
}

impl SpecFn {
    pub fn new(name: &str, params: &[&str], body: Expr) -> Self {
        Self {
            loc: Loc::default(),
            name: name.to_owned(),
            params: params.iter().map(|p| Var::new(p)).collect(),
            body,
        }
    }
}

use std::collections::{HashMap, HashSet};

use crate::ast::{Decl, Expr, SpecFn, UnOpKind, Var};
use crate::utils::{
    CallGraph, DeclKind, ExprContext, ProgramContext, Signature, TypeContext, TypeError,
    ValueType, RESERVED,
};

use super::statement::block_returns;

/// Checks a whole program: registers signatures (forward references are
/// fine), infers specification-function return types, then checks every
/// declaration. Fails on the first violation.
pub fn check_program(decls: &[Decl]) -> Result<ProgramContext, TypeError> {
    let mut checker = Checker::default();
    checker.register_signatures(decls)?;
    checker.infer_spec_returns()?;
    for decl in decls {
        checker.check_decl(decl)?;
    }
    Ok(ProgramContext {
        signatures: checker.signatures,
        vartypes: checker.vartypes,
        call_graph: checker.call_graph,
    })
}

#[derive(Default)]
pub(crate) struct Checker<'p> {
    spec_fns: HashMap<String, &'p SpecFn>,
    pub(crate) signatures: HashMap<String, Signature>,
    pub(crate) call_graph: CallGraph,
    vartypes: HashMap<String, TypeContext>,
    /// Name of the procedure currently being checked, for call-graph edges.
    pub(crate) current: String,
}

impl<'p> Checker<'p> {
    fn register_signatures(&mut self, decls: &'p [Decl]) -> Result<(), TypeError> {
        for decl in decls {
            let name = decl.name();
            if RESERVED.contains(name) {
                return Err(TypeError::ReservedName {
                    loc: decl.loc(),
                    name: name.to_owned(),
                });
            }
            if self.signatures.contains_key(name) {
                return Err(TypeError::DuplicateDeclaration {
                    loc: decl.loc(),
                    name: name.to_owned(),
                });
            }
            let signature = match decl {
                Decl::Proc(p) => Signature {
                    kind: DeclKind::Proc,
                    arity: p.params.len(),
                    returns: ValueType::Int,
                },
                Decl::SpecFn(f) => {
                    self.spec_fns.insert(f.name.clone(), f);
                    Signature {
                        kind: DeclKind::SpecFn,
                        arity: f.params.len(),
                        // refined by infer_spec_returns
                        returns: ValueType::Int,
                    }
                }
            };
            self.signatures.insert(name.to_owned(), signature);
        }
        Ok(())
    }

    /// Resolves every specification function's return type by a syntactic
    /// sketch of its body. Calls recurse into the callee's body; a cycle no
    /// branch grounds is an error.
    fn infer_spec_returns(&mut self) -> Result<(), TypeError> {
        let names: Vec<String> = self.spec_fns.keys().cloned().collect();
        for name in names {
            let returns = self.infer_return(&name, &mut HashSet::new())?;
            self.signatures
                .get_mut(&name)
                .expect("signature registered")
                .returns = returns;
        }
        Ok(())
    }

    fn infer_return(
        &mut self,
        name: &str,
        visiting: &mut HashSet<String>,
    ) -> Result<ValueType, TypeError> {
        let f = *self.spec_fns.get(name).expect("signature registered");
        if !visiting.insert(name.to_owned()) {
            return Err(TypeError::AmbiguousReturnType {
                loc: f.loc,
                name: name.to_owned(),
            });
        }
        let returns = self.sketch(&f.body, visiting)?;
        visiting.remove(name);
        Ok(returns)
    }

    fn sketch(
        &mut self,
        expr: &Expr,
        visiting: &mut HashSet<String>,
    ) -> Result<ValueType, TypeError> {
        match expr {
            Expr::BoolLit(_) => Ok(ValueType::Bool),
            Expr::IntLit(_) | Expr::Var(_) | Expr::Result(_) => Ok(ValueType::Int),
            Expr::UnOp(u) => Ok(match u.op {
                UnOpKind::Not => ValueType::Bool,
                UnOpKind::Plus | UnOpKind::Minus => ValueType::Int,
            }),
            Expr::BinOp(b) => Ok(if b.op.is_arithmetic() {
                ValueType::Int
            } else {
                ValueType::Bool
            }),
            Expr::Quantified(_) => Ok(ValueType::Bool),
            // a recursive spec-fn grounds its type in a non-recursive branch;
            // try the left arm first, fall back to the right
            Expr::Ternary(t) => {
                let snapshot = visiting.clone();
                match self.sketch(&t.left, visiting) {
                    Ok(typ) => Ok(typ),
                    Err(_) => {
                        *visiting = snapshot;
                        self.sketch(&t.right, visiting)
                    }
                }
            }
            Expr::Call(c) => match self.signatures.get(&c.callee) {
                None => Err(TypeError::UndefinedFunction {
                    loc: c.loc,
                    name: c.callee.clone(),
                }),
                Some(sig) if sig.kind == DeclKind::Proc => Ok(ValueType::Int),
                Some(_) => self.infer_return(&c.callee, visiting),
            },
        }
    }

    fn check_decl(&mut self, decl: &Decl) -> Result<(), TypeError> {
        let mut env = TypeContext::default();
        match decl {
            Decl::Proc(p) => {
                self.current = p.name.clone();
                self.declare_params(&p.params, &mut env)?;
                if let Some(pre) = &p.pre {
                    self.typecheck_root(pre, ValueType::Bool, &env, ExprContext::Metacondition)?;
                }
                if let Some(variant) = &p.variant {
                    self.typecheck_root(variant, ValueType::Int, &env, ExprContext::Metacondition)?;
                }
                self.check_block(&p.body, &mut env)?;
                if let Some(post) = &p.post {
                    self.typecheck_root(post, ValueType::Bool, &env, ExprContext::Postcondition)?;
                }
                if !block_returns(&p.body) {
                    return Err(TypeError::MissingReturn {
                        loc: p.loc,
                        name: p.name.clone(),
                    });
                }
            }
            Decl::SpecFn(f) => {
                self.declare_params(&f.params, &mut env)?;
                let expected = self.signatures[&f.name].returns;
                self.typecheck_root(&f.body, expected, &env, ExprContext::Metacondition)?;
            }
        }
        self.vartypes.insert(decl.name().to_owned(), env);
        Ok(())
    }

    fn declare_params(&self, params: &[Var], env: &mut TypeContext) -> Result<(), TypeError> {
        for param in params {
            if RESERVED.contains(param.name.as_str()) {
                return Err(TypeError::ReservedName {
                    loc: param.loc,
                    name: param.name.clone(),
                });
            }
            if env.get(&param.name).is_some() {
                return Err(TypeError::DuplicateParameter {
                    loc: param.loc,
                    name: param.name.clone(),
                });
            }
            env.declare_param(&param.name);
        }
        Ok(())
    }
}

use crate::ast::{BinOp, Call, Expr, Quantified, UnOpKind};
use crate::utils::{DeclKind, ExprContext, TypeContext, TypeError, ValueType, RESERVED};

use super::Checker;

impl Checker<'_> {
    /// Types a complete expression in its context, admitting the privileges
    /// that exist only at the root: a division/modulo heading a metacondition
    /// or an assignment RHS, and a procedure call filling an assignment RHS.
    pub(crate) fn typeof_root(
        &mut self,
        expr: &Expr,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        match expr {
            Expr::BinOp(b) if b.op.is_divmod() && ctx != ExprContext::Code => {
                self.typecheck(&b.left, ValueType::Int, env, ctx.child())?;
                self.typecheck(&b.right, ValueType::Int, env, ctx.child())?;
                Ok(ValueType::Int)
            }
            Expr::Call(c) if ctx == ExprContext::AssignmentRhs => self.typeof_rhs_call(c, env),
            _ => self.typeof_expr(expr, env, ctx),
        }
    }

    pub(crate) fn typecheck_root(
        &mut self,
        expr: &Expr,
        expected: ValueType,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        let actual = self.typeof_root(expr, env, ctx)?;
        if actual != expected {
            return Err(TypeError::Mismatch {
                loc: expr.loc(),
                expected,
                actual,
            });
        }
        Ok(actual)
    }

    pub(crate) fn typecheck(
        &mut self,
        expr: &Expr,
        expected: ValueType,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<(), TypeError> {
        let actual = self.typeof_expr(expr, env, ctx)?;
        if actual != expected {
            return Err(TypeError::Mismatch {
                loc: expr.loc(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn typeof_expr(
        &mut self,
        expr: &Expr,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        match expr {
            Expr::BoolLit(_) => Ok(ValueType::Bool),
            Expr::IntLit(_) => Ok(ValueType::Int),
            Expr::Var(v) => env.get(&v.name).ok_or_else(|| TypeError::UndefinedVariable {
                loc: v.loc,
                name: v.name.clone(),
            }),
            Expr::UnOp(u) => match u.op {
                UnOpKind::Plus | UnOpKind::Minus => {
                    self.typecheck(&u.expr, ValueType::Int, env, ctx.child())?;
                    Ok(ValueType::Int)
                }
                UnOpKind::Not => {
                    self.typecheck(&u.expr, ValueType::Bool, env, ctx.child())?;
                    Ok(ValueType::Bool)
                }
            },
            Expr::BinOp(b) => self.typeof_binop(b, env, ctx),
            Expr::Ternary(t) => {
                self.typecheck(&t.cond, ValueType::Bool, env, ctx.child())?;
                let left = self.typeof_expr(&t.left, env, ctx.child())?;
                self.typecheck(&t.right, left, env, ctx.child())?;
                Ok(left)
            }
            Expr::Call(c) => self.typeof_call(c, env, ctx),
            Expr::Result(r) => {
                if ctx != ExprContext::Postcondition {
                    return Err(TypeError::IllegalResult { loc: r.loc });
                }
                Ok(ValueType::Int)
            }
            Expr::Quantified(q) => self.typeof_quantified(q, env, ctx),
        }
    }

    fn typeof_binop(
        &mut self,
        b: &BinOp,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        if b.op.is_divmod() {
            return Err(TypeError::IllegalDivision { loc: b.loc });
        }
        if b.op.is_arithmetic() {
            self.typecheck(&b.left, ValueType::Int, env, ctx.child())?;
            self.typecheck(&b.right, ValueType::Int, env, ctx.child())?;
            Ok(ValueType::Int)
        } else if b.op.is_relational() {
            self.typecheck(&b.left, ValueType::Int, env, ctx.child())?;
            self.typecheck(&b.right, ValueType::Int, env, ctx.child())?;
            Ok(ValueType::Bool)
        } else {
            self.typecheck(&b.left, ValueType::Bool, env, ctx.child())?;
            self.typecheck(&b.right, ValueType::Bool, env, ctx.child())?;
            Ok(ValueType::Bool)
        }
    }

    /// Calls anywhere but the root of an assignment RHS: legal only for
    /// specification functions, and only from specification contexts.
    fn typeof_call(
        &mut self,
        c: &Call,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        let sig = *self
            .signatures
            .get(&c.callee)
            .ok_or_else(|| TypeError::UndefinedFunction {
                loc: c.loc,
                name: c.callee.clone(),
            })?;
        match sig.kind {
            DeclKind::Proc => Err(TypeError::IllegalProcCall {
                loc: c.loc,
                name: c.callee.clone(),
            }),
            DeclKind::SpecFn => {
                if !ctx.is_spec() {
                    return Err(TypeError::IllegalSpecCall {
                        loc: c.loc,
                        name: c.callee.clone(),
                    });
                }
                self.check_arity(c, sig.arity)?;
                for arg in &c.args {
                    self.typecheck(arg, ValueType::Int, env, ctx.child())?;
                }
                Ok(sig.returns)
            }
        }
    }

    /// A call filling the entire right-hand side of an assignment: legal for
    /// procedures, with arguments in Code context. Registers the call-graph
    /// edge from the enclosing procedure.
    fn typeof_rhs_call(&mut self, c: &Call, env: &TypeContext) -> Result<ValueType, TypeError> {
        let sig = *self
            .signatures
            .get(&c.callee)
            .ok_or_else(|| TypeError::UndefinedFunction {
                loc: c.loc,
                name: c.callee.clone(),
            })?;
        match sig.kind {
            DeclKind::SpecFn => Err(TypeError::IllegalSpecCall {
                loc: c.loc,
                name: c.callee.clone(),
            }),
            DeclKind::Proc => {
                self.check_arity(c, sig.arity)?;
                for arg in &c.args {
                    self.typecheck(arg, ValueType::Int, env, ExprContext::Code)?;
                }
                let caller = self.current.clone();
                self.call_graph.add_edge(&caller, &c.callee);
                Ok(ValueType::Int)
            }
        }
    }

    fn typeof_quantified(
        &mut self,
        q: &Quantified,
        env: &TypeContext,
        ctx: ExprContext,
    ) -> Result<ValueType, TypeError> {
        if !ctx.is_spec() {
            return Err(TypeError::IllegalQuantifier { loc: q.loc });
        }
        let mut inner = env.clone();
        for binder in &q.binders {
            if RESERVED.contains(binder.name.as_str()) {
                return Err(TypeError::ReservedName {
                    loc: binder.loc,
                    name: binder.name.clone(),
                });
            }
            // quantified variables are freshly bound integers
            if inner.get(&binder.name).is_some() {
                return Err(TypeError::ShadowedBinding {
                    loc: binder.loc,
                    name: binder.name.clone(),
                });
            }
            inner.declare(&binder.name, ValueType::Int);
        }
        self.typecheck(&q.body, ValueType::Bool, &inner, ctx)?;
        Ok(ValueType::Bool)
    }

    fn check_arity(&self, c: &Call, expected: usize) -> Result<(), TypeError> {
        if c.args.len() != expected {
            return Err(TypeError::ArityMismatch {
                loc: c.loc,
                name: c.callee.clone(),
                expected,
                actual: c.args.len(),
            });
        }
        Ok(())
    }
}

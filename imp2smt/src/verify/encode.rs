use std::collections::HashMap;

use z3::ast::{exists_const, forall_const, Ast, Bool, Dynamic, Int};
use z3::Context;

use crate::ast::{BinOpKind, Expr, Quantifier, UnOpKind};
use crate::utils::{TypeContext, ValueType};

use super::Smt;

/// Solver-side name of the result-pseudo-variable. `result` is reserved at
/// the surface, so the constant can never collide with a program variable.
pub const RESULT_NAME: &str = "result";

/// Translates checked expressions into solver terms. One instance per
/// declaration: the environment fixes the sort of every free variable, and
/// identical subtrees are encoded once.
pub struct EncodeCtx<'a, 'ctx> {
    pub smt: &'a Smt<'ctx>,
    env: &'a TypeContext,
    cache: HashMap<usize, Dynamic<'ctx>>,
}

impl<'a, 'ctx> EncodeCtx<'a, 'ctx> {
    pub fn new(smt: &'a Smt<'ctx>, env: &'a TypeContext) -> Self {
        Self {
            smt,
            env,
            cache: HashMap::new(),
        }
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.smt.ctx()
    }

    pub fn env(&self) -> &'a TypeContext {
        self.env
    }

    pub fn encode_bool(&mut self, expr: &Expr) -> Bool<'ctx> {
        self.encode(expr)
            .as_bool()
            .expect("the type checker admits only booleans here")
    }

    pub fn encode_int(&mut self, expr: &Expr) -> Int<'ctx> {
        self.encode(expr)
            .as_int()
            .expect("the type checker admits only integers here")
    }

    /// A free variable as a solver constant of its declared sort. Names the
    /// environment does not know are quantifier binders, always integers.
    pub fn var(&self, name: &str) -> Dynamic<'ctx> {
        match self.env.get(name) {
            Some(ValueType::Bool) => Dynamic::from_ast(&Bool::new_const(self.ctx(), name)),
            Some(ValueType::Int) | None => Dynamic::from_ast(&Int::new_const(self.ctx(), name)),
        }
    }

    pub fn encode(&mut self, expr: &Expr) -> Dynamic<'ctx> {
        let key = expr as *const Expr as usize;
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let encoded = self.encode_uncached(expr);
        self.cache.insert(key, encoded.clone());
        encoded
    }

    fn encode_uncached(&mut self, expr: &Expr) -> Dynamic<'ctx> {
        let ctx = self.ctx();
        match expr {
            Expr::BoolLit(b) => Dynamic::from_ast(&Bool::from_bool(ctx, b.value)),
            Expr::IntLit(i) => Dynamic::from_ast(&Int::from_i64(ctx, i.value)),
            Expr::Var(v) => self.var(&v.name),
            Expr::Result(_) => Dynamic::from_ast(&Int::new_const(ctx, RESULT_NAME)),
            Expr::UnOp(u) => match u.op {
                UnOpKind::Plus => self.encode(&u.expr),
                UnOpKind::Minus => Dynamic::from_ast(&self.encode_int(&u.expr).unary_minus()),
                UnOpKind::Not => Dynamic::from_ast(&self.encode_bool(&u.expr).not()),
            },
            Expr::BinOp(b) => {
                if b.op.is_logical() {
                    let l = self.encode_bool(&b.left);
                    let r = self.encode_bool(&b.right);
                    let out = match b.op {
                        BinOpKind::And => Bool::and(ctx, &[&l, &r]),
                        _ => Bool::or(ctx, &[&l, &r]),
                    };
                    return Dynamic::from_ast(&out);
                }
                let l = self.encode_int(&b.left);
                let r = self.encode_int(&b.right);
                match b.op {
                    BinOpKind::Add => Dynamic::from_ast(&Int::add(ctx, &[&l, &r])),
                    BinOpKind::Sub => Dynamic::from_ast(&Int::sub(ctx, &[&l, &r])),
                    BinOpKind::Mul => Dynamic::from_ast(&Int::mul(ctx, &[&l, &r])),
                    BinOpKind::Div => Dynamic::from_ast(&l.div(&r)),
                    BinOpKind::Mod => Dynamic::from_ast(&l.modulo(&r)),
                    BinOpKind::Lt => Dynamic::from_ast(&l.lt(&r)),
                    BinOpKind::Lte => Dynamic::from_ast(&l.le(&r)),
                    BinOpKind::Gt => Dynamic::from_ast(&l.gt(&r)),
                    BinOpKind::Gte => Dynamic::from_ast(&l.ge(&r)),
                    BinOpKind::Eq => Dynamic::from_ast(&l._eq(&r)),
                    BinOpKind::Neq => Dynamic::from_ast(&l._eq(&r).not()),
                    BinOpKind::And | BinOpKind::Or => unreachable!("handled above"),
                }
            }
            Expr::Ternary(t) => {
                let cond = self.encode_bool(&t.cond);
                let left = self.encode(&t.left);
                let right = self.encode(&t.right);
                cond.ite(&left, &right)
            }
            Expr::Call(c) => {
                let args: Vec<Dynamic> = c.args.iter().map(|a| self.encode(a)).collect();
                let refs: Vec<&dyn Ast> = args.iter().map(|a| a as &dyn Ast).collect();
                self.smt.spec_fn(&c.callee).apply(&refs)
            }
            Expr::Quantified(q) => {
                let binders: Vec<Int> = q
                    .binders
                    .iter()
                    .map(|b| Int::new_const(ctx, b.name.as_str()))
                    .collect();
                let bounds: Vec<&dyn Ast> = binders.iter().map(|b| b as &dyn Ast).collect();
                let body = self.encode_bool(&q.body);
                let out = match q.quantifier {
                    Quantifier::Forall => forall_const(ctx, &bounds, &[], &body),
                    Quantifier::Exists => exists_const(ctx, &bounds, &[], &body),
                };
                Dynamic::from_ast(&out)
            }
        }
    }
}

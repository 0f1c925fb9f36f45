use std::collections::HashMap;

use tracing::trace;
use z3::ast::{forall_const, Ast, Bool, Dynamic, Int};

use crate::ast::{Assert, Assign, Block, Call, Else, Expr, If, Loc, Proc, Return, Stmt, While};
use crate::utils::{
    Correctness, Fresh, ProgramContext, SolverUnknown, TypeContext, ValueType, VerificationError,
};

use super::{EncodeCtx, Smt, RESULT_NAME};

/// Everything one procedure's backward pass needs: the encoder bound to the
/// procedure's environment, the correctness mode, the procedure itself (for
/// its contract and variant), every procedure body (for call contracts), and
/// a fresh-name source for loop bounds.
pub(crate) struct VcCtx<'a, 'ctx> {
    pub enc: EncodeCtx<'a, 'ctx>,
    pub mode: Correctness,
    pub proc: &'a Proc,
    pub procs: &'a HashMap<String, &'a Proc>,
    pub program: &'a ProgramContext,
    pub fresh: Fresh,
}

impl<'a, 'ctx> VcCtx<'a, 'ctx> {
    fn smt(&self) -> &'a Smt<'ctx> {
        self.enc.smt
    }

    fn scope(&self) -> &'a TypeContext {
        self.enc.env()
    }

    /// Discharges `hypothesis ⇒ conclusion`, blaming `loc` on failure.
    fn check(
        &self,
        loc: Loc,
        hypothesis: &Bool<'ctx>,
        conclusion: &Bool<'ctx>,
    ) -> Result<(), VerificationError> {
        match self.smt().check_valid(hypothesis, conclusion, self.scope()) {
            Ok(None) => Ok(()),
            Ok(Some(cex)) => Err(VerificationError::Unprovable {
                loc,
                obligation: conclusion.to_string(),
                counterexample: Some(cex),
            }),
            Err(SolverUnknown) => Err(VerificationError::SolverIncomplete {
                loc,
                obligation: conclusion.to_string(),
            }),
        }
    }
}

/// Backward weakest-precondition transform: from what must hold after a
/// construct to what must hold before it.
pub(crate) trait Propagate {
    fn propagate<'ctx>(
        &self,
        post: Bool<'ctx>,
        vc: &mut VcCtx<'_, 'ctx>,
    ) -> Result<Bool<'ctx>, VerificationError>;
}

impl Propagate for Block {
    fn propagate<'ctx>(
        &self,
        post: Bool<'ctx>,
        vc: &mut VcCtx<'_, 'ctx>,
    ) -> Result<Bool<'ctx>, VerificationError> {
        self.stmts
            .iter()
            .rev()
            .try_fold(post, |post, stmt| stmt.propagate(post, vc))
    }
}

impl Propagate for Stmt {
    fn propagate<'ctx>(
        &self,
        post: Bool<'ctx>,
        vc: &mut VcCtx<'_, 'ctx>,
    ) -> Result<Bool<'ctx>, VerificationError> {
        let pre = match self {
            Stmt::Assign(a) => propagate_assign(a, post, vc),
            Stmt::If(i) => propagate_if(i, post, vc),
            Stmt::While(w) => propagate_while(w, post, vc),
            Stmt::Assert(a) => propagate_assert(a, post, vc),
            Stmt::Return(r) => propagate_return(r, vc),
            Stmt::Block(b) => b.propagate(post, vc),
        }?;
        trace!(pre = %pre, "propagated");
        // a contradictory intermediate condition means the code after this
        // point is unreachable, which is a bug in the program, not a proof
        match vc.smt().is_satisfiable(&pre) {
            Ok(true) => Ok(pre),
            Ok(false) => Err(VerificationError::UnsatisfiablePrecondition { loc: self.loc() }),
            Err(SolverUnknown) => Err(VerificationError::SolverIncomplete {
                loc: self.loc(),
                obligation: pre.to_string(),
            }),
        }
    }
}

fn propagate_assign<'ctx>(
    a: &Assign,
    post: Bool<'ctx>,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    if let Expr::Call(c) = &a.value {
        return propagate_call(a, c, post, vc);
    }
    let dest = vc.enc.var(&a.dest.name);
    let value = vc.enc.encode(&a.value);
    let substituted = post.substitute(&[(&dest, &value)]);
    // a division at the top of the RHS carries its well-definedness with it
    if let Expr::BinOp(b) = &a.value {
        if b.op.is_divmod() {
            let ctx = vc.enc.ctx();
            let divisor = vc.enc.encode_int(&b.right);
            let nonzero = divisor._eq(&Int::from_i64(ctx, 0)).not();
            return Ok(Bool::and(ctx, &[&substituted, &nonzero]));
        }
    }
    Ok(substituted)
}

fn propagate_if<'ctx>(
    i: &If,
    post: Bool<'ctx>,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    let then_pre = i.then_branch.propagate(post.clone(), vc)?;
    let else_pre = match &i.else_branch {
        Else::Block(b) => b.propagate(post, vc)?,
        Else::If(nested) => propagate_if(nested, post, vc)?,
    };
    let cond = vc.enc.encode_bool(&i.cond);
    Ok(cond.ite(&then_pre, &else_pre))
}

/// An assertion is an obligation, not an assumption: it must follow from
/// what the rest of the code already requires, and adds nothing to it.
fn propagate_assert<'ctx>(
    a: &Assert,
    post: Bool<'ctx>,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    let cond = vc.enc.encode_bool(&a.cond);
    vc.check(a.loc, &post, &cond)?;
    Ok(post)
}

/// Return discards whatever was required after it (that code is dead on this
/// path) and requires the procedure's postcondition with `result` replaced
/// by the returned value.
fn propagate_return<'ctx>(
    r: &Return,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    let post = vc
        .proc
        .post
        .as_ref()
        .ok_or_else(|| VerificationError::MissingPostcondition {
            loc: vc.proc.loc,
            name: vc.proc.name.clone(),
        })?;
    let result = Int::new_const(vc.enc.ctx(), RESULT_NAME);
    let value = vc.enc.encode_int(&r.value);
    let post = vc.enc.encode_bool(post);
    Ok(post.substitute(&[(&result, &value)]))
}

fn propagate_while<'ctx>(
    w: &While,
    post: Bool<'ctx>,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    let ctx = vc.enc.ctx();
    let invariant = w
        .invariant
        .as_ref()
        .ok_or(VerificationError::MissingInvariant { loc: w.loc })?;
    let inv = vc.enc.encode_bool(invariant);
    let cond = vc.enc.encode_bool(&w.cond);
    match vc.mode {
        Correctness::Partial => {
            // exit: the invariant without the guard establishes what follows
            vc.check(w.loc, &Bool::and(ctx, &[&inv, &cond.not()]), &post)?;
            // preservation: one iteration from a live invariant re-establishes it
            let body_pre = w.body.propagate(inv.clone(), vc)?;
            vc.check(w.loc, &Bool::and(ctx, &[&inv, &cond]), &body_pre)?;
            Ok(inv)
        }
        Correctness::Total => {
            let variant = w
                .variant
                .as_ref()
                .ok_or(VerificationError::MissingVariant { loc: w.loc })?;
            let var = vc.enc.encode_int(variant);
            let zero = Int::from_i64(ctx, 0);
            let pre = Bool::and(ctx, &[&inv, &zero.le(&var)]);
            // exit relies on the invariant alone, exactly as in partial mode;
            // the variant bound is this loop's obligation, not its knowledge
            vc.check(w.loc, &Bool::and(ctx, &[&inv, &cond.not()]), &post)?;
            // every iteration must leave the variant strictly below the value
            // it had on entry, captured by an otherwise unconstrained bound
            let upper = Int::new_const(ctx, vc.fresh.bound());
            let body_post = Bool::and(ctx, &[&pre, &var.lt(&upper)]);
            let body_pre = w.body.propagate(body_post, vc)?;
            vc.check(
                w.loc,
                &Bool::and(ctx, &[&pre, &cond, &var._eq(&upper)]),
                &body_pre,
            )?;
            Ok(pre)
        }
    }
}

/// A procedure call is opaque: all that is known about the destination
/// afterwards is the callee's postcondition, instantiated with the actual
/// arguments. The caller owes the callee's precondition, and in total mode a
/// strict variant decrease on every call that can recurse back.
fn propagate_call<'ctx>(
    a: &Assign,
    c: &Call,
    post: Bool<'ctx>,
    vc: &mut VcCtx<'_, 'ctx>,
) -> Result<Bool<'ctx>, VerificationError> {
    let ctx = vc.enc.ctx();
    let callee = *vc
        .procs
        .get(&c.callee)
        .expect("checked programs only call declared procedures");
    let callee_env = vc.program.env(&c.callee);
    let mut cenc = EncodeCtx::new(vc.enc.smt, callee_env);

    let args: Vec<Int> = c.args.iter().map(|arg| vc.enc.encode_int(arg)).collect();
    let params: Vec<Int> = callee
        .params
        .iter()
        .map(|p| Int::new_const(ctx, p.name.as_str()))
        .collect();
    let pairs: Vec<(&Int, &Int)> = params.iter().zip(args.iter()).collect();

    let mut required = match &callee.pre {
        Some(pre) => cenc.encode_bool(pre).substitute(&pairs),
        None => Bool::from_bool(ctx, true),
    };

    if vc.mode == Correctness::Total
        && vc.program.call_graph.call_is_recursive(&c.callee, &vc.proc.name)
    {
        let caller_variant = vc
            .proc
            .variant
            .as_ref()
            .ok_or(VerificationError::MissingVariant { loc: c.loc })?;
        let callee_variant = callee
            .variant
            .as_ref()
            .ok_or(VerificationError::MissingVariant { loc: c.loc })?;
        let at_entry = cenc.encode_int(callee_variant).substitute(&pairs);
        let current = vc.enc.encode_int(caller_variant);
        required = Bool::and(ctx, &[&required, &at_entry.lt(&current)]);
    }

    // the returned value is a fresh bound constant; binding the destination
    // itself would capture its pre-state occurrences in the arguments
    let returned = Int::new_const(ctx, vc.fresh.bound());
    let result = Int::new_const(ctx, RESULT_NAME);
    let mut bounds: Vec<Dynamic> = vec![Dynamic::from_ast(&returned)];
    let promised = match &callee.post {
        Some(p) => {
            // callee locals named by the contract mean nothing here; stand
            // them in with fresh constants, bound like the returned value
            let mut stand_ins: Vec<(Dynamic, Dynamic)> = Vec::new();
            for (name, typ) in callee_env.sorted_vars() {
                if callee_env.is_param(name) {
                    continue;
                }
                let local = cenc.var(name);
                let fresh = match typ {
                    ValueType::Int => Dynamic::from_ast(&Int::new_const(ctx, vc.fresh.bound())),
                    ValueType::Bool => Dynamic::from_ast(&Bool::new_const(ctx, vc.fresh.bound())),
                };
                stand_ins.push((local, fresh));
            }
            let stand_in_pairs: Vec<(&Dynamic, &Dynamic)> =
                stand_ins.iter().map(|(local, fresh)| (local, fresh)).collect();
            let instantiated = cenc
                .encode_bool(p)
                .substitute(&stand_in_pairs)
                .substitute(&pairs)
                .substitute(&[(&result, &returned)]);
            bounds.extend(stand_ins.into_iter().map(|(_, fresh)| fresh));
            instantiated
        }
        None => Bool::from_bool(ctx, true),
    };
    let dest = Int::new_const(ctx, a.dest.name.as_str());
    let continuation = post.substitute(&[(&dest, &returned)]);
    // whatever value satisfies the callee's promise must satisfy what follows
    let bound_refs: Vec<&dyn Ast> = bounds.iter().map(|b| b as &dyn Ast).collect();
    let opaque = forall_const(ctx, &bound_refs, &[], &promised.implies(&continuation));
    Ok(Bool::and(ctx, &[&required, &opaque]))
}

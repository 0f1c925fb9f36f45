use std::collections::HashMap;

use tracing::{debug, info};
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context};

use crate::ast::{Decl, Loc, Proc};
use crate::typecheck::check_program;
use crate::utils::{
    Correctness, Error, Fresh, ProgramContext, SolverUnknown, TypeError, VerificationError,
};

use super::{EncodeCtx, Propagate, Smt, VcCtx};

/// Verifies checked programs against one solver context. Specification
/// functions are installed once at construction; procedures are then
/// verified independently.
pub struct Verifier<'p, 'ctx> {
    smt: Smt<'ctx>,
    mode: Correctness,
    program: &'p ProgramContext,
    procs: HashMap<String, &'p Proc>,
}

impl<'p, 'ctx> Verifier<'p, 'ctx> {
    pub fn new(
        ctx: &'ctx Context,
        decls: &'p [Decl],
        mode: Correctness,
        program: &'p ProgramContext,
    ) -> Self {
        let mut smt = Smt::new(ctx);
        let mut procs = HashMap::new();
        // declare every specification function before defining any body, so
        // mutually recursive definitions resolve
        for decl in decls {
            match decl {
                Decl::Proc(p) => {
                    procs.insert(p.name.clone(), p);
                }
                Decl::SpecFn(f) => {
                    let sig = program
                        .signature(&f.name)
                        .expect("checked declarations have signatures");
                    smt.declare_spec_fn(&f.name, sig.arity, sig.returns);
                }
            }
        }
        for decl in decls {
            if let Decl::SpecFn(f) = decl {
                let params: Vec<Int> = f
                    .params
                    .iter()
                    .map(|p| Int::new_const(ctx, p.name.as_str()))
                    .collect();
                let mut enc = EncodeCtx::new(&smt, program.env(&f.name));
                let body = enc.encode(&f.body);
                smt.define_spec_fn(&f.name, &params, &body);
            }
        }
        Self {
            smt,
            mode,
            program,
            procs,
        }
    }

    /// Runs the backward pass over one procedure and returns the weakest
    /// precondition its body requires. When the procedure declares a
    /// precondition, that declaration must imply the computed one.
    pub fn verify_proc(&self, proc: &Proc) -> Result<Bool<'ctx>, VerificationError> {
        let post = proc
            .post
            .as_ref()
            .ok_or_else(|| VerificationError::MissingPostcondition {
                loc: proc.loc,
                name: proc.name.clone(),
            })?;
        let mut enc = EncodeCtx::new(&self.smt, self.program.env(&proc.name));
        let post = enc.encode_bool(post);
        debug!(proc = %proc.name, post = %post, "starting backward pass");
        let mut vc = VcCtx {
            enc,
            mode: self.mode,
            proc,
            procs: &self.procs,
            program: self.program,
            fresh: Fresh::default(),
        };
        let mut assertion = proc.body.propagate(post, &mut vc)?;
        // a recursive procedure in total mode owes a nonnegative variant on
        // entry, the base of the per-call decrease argument
        if self.mode == Correctness::Total && self.program.call_graph.is_recursive(&proc.name) {
            let variant = proc
                .variant
                .as_ref()
                .ok_or(VerificationError::MissingVariant { loc: proc.loc })?;
            let ctx = self.smt.ctx();
            let var = vc.enc.encode_int(variant);
            assertion = Bool::and(ctx, &[&assertion, &Int::from_i64(ctx, 0).le(&var)]);
        }
        // the per-statement gate has not seen the conjoined termination
        // obligation; a contradiction at this point means no entry state can
        // satisfy the procedure's demands
        match self.smt.is_satisfiable(&assertion) {
            Ok(true) => {}
            Ok(false) => {
                return Err(VerificationError::UnsatisfiablePrecondition { loc: proc.loc })
            }
            Err(SolverUnknown) => {
                return Err(VerificationError::SolverIncomplete {
                    loc: proc.loc,
                    obligation: assertion.to_string(),
                })
            }
        }
        if let Some(pre) = &proc.pre {
            let declared = vc.enc.encode_bool(pre);
            match self
                .smt
                .check_valid(&declared, &assertion, self.program.env(&proc.name))
            {
                Ok(None) => {}
                Ok(Some(cex)) => {
                    return Err(VerificationError::Unprovable {
                        loc: pre.loc(),
                        obligation: assertion.to_string(),
                        counterexample: Some(cex),
                    })
                }
                Err(_) => {
                    return Err(VerificationError::SolverIncomplete {
                        loc: pre.loc(),
                        obligation: assertion.to_string(),
                    })
                }
            }
        }
        info!(proc = %proc.name, "verified");
        Ok(assertion.simplify())
    }
}

/// Per-procedure verification verdict: the inferred precondition rendered as
/// a solver term, or why verification failed.
#[derive(Debug, Clone)]
pub struct ProcOutcome {
    pub name: String,
    pub loc: Loc,
    pub result: Result<String, VerificationError>,
}

/// Checks then verifies a whole program. Type errors abort; verification
/// failures are per-procedure verdicts, so one broken procedure does not
/// hide the others.
pub fn check_program_and_verify(
    decls: &[Decl],
    mode: Correctness,
) -> Result<Vec<ProcOutcome>, TypeError> {
    let program = check_program(decls)?;
    let mut config = Config::new();
    config.set_model_generation(true);
    let ctx = Context::new(&config);
    let verifier = Verifier::new(&ctx, decls, mode, &program);
    let mut outcomes = Vec::new();
    for decl in decls {
        if let Decl::Proc(p) = decl {
            outcomes.push(ProcOutcome {
                name: p.name.clone(),
                loc: p.loc,
                result: verifier.verify_proc(p).map(|pre| pre.to_string()),
            });
        }
    }
    Ok(outcomes)
}

/// Checks the program and returns the inferred precondition of one
/// procedure, failing fast on the first error anywhere.
pub fn infer_precondition(decls: &[Decl], name: &str, mode: Correctness) -> Result<String, Error> {
    let program = check_program(decls)?;
    let proc = decls
        .iter()
        .find_map(|d| match d {
            Decl::Proc(p) if p.name == name => Some(p),
            _ => None,
        })
        .ok_or_else(|| TypeError::UndefinedFunction {
            loc: Loc::default(),
            name: name.to_owned(),
        })?;
    let mut config = Config::new();
    config.set_model_generation(true);
    let ctx = Context::new(&config);
    let verifier = Verifier::new(&ctx, decls, mode, &program);
    let pre = verifier.verify_proc(proc)?;
    Ok(pre.to_string())
}

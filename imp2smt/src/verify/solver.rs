use std::collections::HashMap;

use tracing::debug;
use z3::ast::{Ast, Bool, Dynamic, Int};
use z3::{Context, Model, RecFuncDecl, SatResult, Solver, Sort};

use crate::utils::{Counterexample, SolverUnknown, TypeContext, ValueType};

/// The boundary to the external constraint solver. Everything the engine
/// asks of z3 goes through here: satisfiability gates, validity checks by
/// refutation, counterexample extraction, and the (mutually recursive)
/// definitions of specification functions.
pub struct Smt<'ctx> {
    ctx: &'ctx Context,
    spec_fns: HashMap<String, RecFuncDecl<'ctx>>,
}

impl<'ctx> Smt<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            spec_fns: HashMap::new(),
        }
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    /// Declares a specification function. All declarations happen before any
    /// definition so mutually recursive bodies resolve.
    pub fn declare_spec_fn(&mut self, name: &str, arity: usize, returns: ValueType) {
        let int = Sort::int(self.ctx);
        let domain: Vec<&Sort> = (0..arity).map(|_| &int).collect();
        let range = match returns {
            ValueType::Int => Sort::int(self.ctx),
            ValueType::Bool => Sort::bool(self.ctx),
        };
        let decl = RecFuncDecl::new(self.ctx, name, &domain, &range);
        self.spec_fns.insert(name.to_owned(), decl);
    }

    pub fn define_spec_fn(&self, name: &str, params: &[Int<'ctx>], body: &Dynamic<'ctx>) {
        let args: Vec<&dyn Ast> = params.iter().map(|p| p as &dyn Ast).collect();
        self.spec_fn(name).add_def(&args, body);
    }

    pub fn spec_fn(&self, name: &str) -> &RecFuncDecl<'ctx> {
        self.spec_fns
            .get(name)
            .expect("specification functions are declared before use")
    }

    pub fn is_satisfiable(&self, formula: &Bool<'ctx>) -> Result<bool, SolverUnknown> {
        let solver = Solver::new(self.ctx);
        solver.assert(formula);
        match solver.check() {
            SatResult::Sat => Ok(true),
            SatResult::Unsat => Ok(false),
            SatResult::Unknown => Err(SolverUnknown),
        }
    }

    /// Checks `hypothesis ⇒ conclusion` by refutation: the implication is
    /// valid iff `hypothesis ∧ ¬conclusion` has no satisfying assignment.
    /// A satisfying assignment, restricted to `scope`, is the counterexample.
    pub fn check_valid(
        &self,
        hypothesis: &Bool<'ctx>,
        conclusion: &Bool<'ctx>,
        scope: &TypeContext,
    ) -> Result<Option<Counterexample>, SolverUnknown> {
        debug!(hypothesis = %hypothesis, conclusion = %conclusion, "checking validity");
        let solver = Solver::new(self.ctx);
        solver.assert(hypothesis);
        solver.assert(&conclusion.not());
        match solver.check() {
            SatResult::Unsat => Ok(None),
            SatResult::Sat => Ok(Some(self.extract(solver.get_model(), scope))),
            SatResult::Unknown => Err(SolverUnknown),
        }
    }

    fn extract(&self, model: Option<Model<'ctx>>, scope: &TypeContext) -> Counterexample {
        let Some(model) = model else {
            return Counterexample::default();
        };
        let mut bindings = Vec::new();
        for (name, typ) in scope.sorted_vars() {
            let value = match typ {
                ValueType::Int => model
                    .eval(&Int::new_const(self.ctx, name), true)
                    .and_then(|v| v.as_i64())
                    .map(|v| v.to_string()),
                ValueType::Bool => model
                    .eval(&Bool::new_const(self.ctx, name), true)
                    .and_then(|v| v.as_bool())
                    .map(|v| v.to_string()),
            };
            if let Some(value) = value {
                bindings.push((name.to_owned(), value));
            }
        }
        Counterexample { bindings }
    }
}

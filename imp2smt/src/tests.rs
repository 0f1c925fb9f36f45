use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

use crate::ast::{BinOpKind, Block, Decl, Else, Expr, Loc, Proc, Quantifier, SpecFn, Stmt};
use crate::typecheck::check_program;
use crate::utils::{Correctness, VerificationError};
use crate::verify::{check_program_and_verify, infer_precondition, Verifier};

fn solver_ctx() -> Context {
    let mut config = Config::new();
    config.set_model_generation(true);
    Context::new(&config)
}

/// Runs the full pipeline on `decls` and returns the precondition inferred
/// for procedure `name`.
fn inferred<'ctx>(
    ctx: &'ctx Context,
    decls: &[Decl],
    name: &str,
    mode: Correctness,
) -> Result<Bool<'ctx>, VerificationError> {
    let program = check_program(decls).expect("test programs are well typed");
    let verifier = Verifier::new(ctx, decls, mode, &program);
    let proc = decls
        .iter()
        .find_map(|d| match d {
            Decl::Proc(p) if p.name == name => Some(p),
            _ => None,
        })
        .expect("test procedure exists");
    verifier.verify_proc(proc)
}

/// Inferred preconditions are solver terms, not normal forms; compare up to
/// logical equivalence.
fn assert_equiv(ctx: &Context, actual: &Bool, expected: &Bool) {
    let solver = Solver::new(ctx);
    solver.assert(&actual.iff(expected).not());
    assert_eq!(
        solver.check(),
        SatResult::Unsat,
        "{actual} is not equivalent to {expected}"
    );
}

fn binop(op: BinOpKind, l: Expr, r: Expr) -> Expr {
    Expr::binop(op, l, r)
}

fn eq(l: Expr, r: Expr) -> Expr {
    binop(BinOpKind::Eq, l, r)
}

fn sum_proc(variant: Option<Expr>) -> Proc {
    // i := 0; s := 0; while i < n { i := i + 1; s := s + i }; return s
    let invariant = binop(
        BinOpKind::And,
        eq(
            binop(BinOpKind::Mul, Expr::int(2), Expr::var("s")),
            binop(
                BinOpKind::Mul,
                Expr::var("i"),
                binop(BinOpKind::Add, Expr::var("i"), Expr::int(1)),
            ),
        ),
        binop(BinOpKind::Lte, Expr::var("i"), Expr::var("n")),
    );
    let body = Block::new(vec![
        Stmt::assign("i", binop(BinOpKind::Add, Expr::var("i"), Expr::int(1))),
        Stmt::assign("s", binop(BinOpKind::Add, Expr::var("s"), Expr::var("i"))),
    ]);
    let stmts = vec![
        Stmt::assign("i", Expr::int(0)),
        Stmt::assign("s", Expr::int(0)),
        Stmt::while_loop(
            Some(invariant),
            variant,
            binop(BinOpKind::Lt, Expr::var("i"), Expr::var("n")),
            body,
        ),
        Stmt::ret(Expr::var("s")),
    ];
    Proc::new("sum", &["n"], Block::new(stmts)).with_post(eq(
        binop(BinOpKind::Mul, Expr::int(2), Expr::result()),
        binop(
            BinOpKind::Mul,
            Expr::var("n"),
            binop(BinOpKind::Add, Expr::var("n"), Expr::int(1)),
        ),
    ))
}

#[test]
fn straight_line_assignments_need_nothing() {
    // a := x; b := y; a := a + b; z := b; z := z + a; return z
    let p = Proc::new(
        "linear",
        &["x", "y"],
        Block::new(vec![
            Stmt::assign("a", Expr::var("x")),
            Stmt::assign("b", Expr::var("y")),
            Stmt::assign("a", binop(BinOpKind::Add, Expr::var("a"), Expr::var("b"))),
            Stmt::assign("z", Expr::var("b")),
            Stmt::assign("z", binop(BinOpKind::Add, Expr::var("z"), Expr::var("a"))),
            Stmt::ret(Expr::var("z")),
        ]),
    )
    .with_post(eq(
        Expr::result(),
        binop(
            BinOpKind::Add,
            Expr::var("x"),
            binop(BinOpKind::Mul, Expr::int(2), Expr::var("y")),
        ),
    ));
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "linear", Correctness::Partial).unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

#[test]
fn branches_are_joined_by_the_condition() {
    // min of two values: both branches discharge the postcondition
    let p = Proc::new(
        "min",
        &["a", "b"],
        Block::new(vec![Stmt::if_else(
            binop(BinOpKind::Lt, Expr::var("a"), Expr::var("b")),
            Block::new(vec![Stmt::ret(Expr::var("a"))]),
            Else::Block(Block::new(vec![Stmt::ret(Expr::var("b"))])),
        )]),
    )
    .with_post(eq(
        Expr::result(),
        Expr::ternary(
            binop(BinOpKind::Lt, Expr::var("a"), Expr::var("b")),
            Expr::var("a"),
            Expr::var("b"),
        ),
    ));
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "min", Correctness::Partial).unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

fn tally_proc(variant: Option<Expr>) -> Proc {
    // i := 0; total := 0; while i != n { total := total + 2*i; i := i + 1 };
    // return total   with invariant total == i*(i-1)
    let invariant = eq(
        Expr::var("total"),
        binop(
            BinOpKind::Mul,
            Expr::var("i"),
            binop(BinOpKind::Sub, Expr::var("i"), Expr::int(1)),
        ),
    );
    let body = Block::new(vec![
        Stmt::assign(
            "total",
            binop(
                BinOpKind::Add,
                Expr::var("total"),
                binop(BinOpKind::Mul, Expr::int(2), Expr::var("i")),
            ),
        ),
        Stmt::assign("i", binop(BinOpKind::Add, Expr::var("i"), Expr::int(1))),
    ]);
    let stmts = vec![
        Stmt::assign("i", Expr::int(0)),
        Stmt::assign("total", Expr::int(0)),
        Stmt::while_loop(
            Some(invariant),
            variant,
            binop(BinOpKind::Neq, Expr::var("i"), Expr::var("n")),
            body,
        ),
        Stmt::ret(Expr::var("total")),
    ];
    Proc::new("tally", &["n"], Block::new(stmts)).with_post(eq(
        Expr::result(),
        binop(
            BinOpKind::Mul,
            Expr::var("n"),
            binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1)),
        ),
    ))
}

#[test]
fn exact_exit_condition_needs_no_entry_bound() {
    // with an i != n guard the invariant alone carries partial correctness
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(tally_proc(None))],
        "tally",
        Correctness::Partial,
    )
    .unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

#[test]
fn exact_exit_condition_still_needs_a_bound_for_termination() {
    let variant = binop(BinOpKind::Sub, Expr::var("n"), Expr::var("i"));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(tally_proc(Some(variant)))],
        "tally",
        Correctness::Total,
    )
    .unwrap();
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn loop_invariant_carries_partial_correctness() {
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(sum_proc(None))],
        "sum",
        Correctness::Partial,
    )
    .unwrap();
    // the invariant demands i <= n on entry, hence n >= 0
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn loop_variant_carries_total_correctness() {
    let variant = binop(BinOpKind::Sub, Expr::var("n"), Expr::var("i"));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(sum_proc(Some(variant)))],
        "sum",
        Correctness::Total,
    )
    .unwrap();
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn total_exit_relies_on_the_invariant_alone() {
    // i := n; while i > 0 { i := i - 1 }; return i   with invariant true:
    // nonnegativity of the variant is owed, not assumed, so the trivial
    // invariant cannot establish result >= 0 at exit
    let p = Proc::new(
        "countdown",
        &["n"],
        Block::new(vec![
            Stmt::assign("i", Expr::var("n")),
            Stmt::while_loop(
                Some(Expr::bool(true)),
                Some(Expr::var("i")),
                binop(BinOpKind::Gt, Expr::var("i"), Expr::int(0)),
                Block::new(vec![Stmt::assign(
                    "i",
                    binop(BinOpKind::Sub, Expr::var("i"), Expr::int(1)),
                )]),
            ),
            Stmt::ret(Expr::var("i")),
        ]),
    )
    .with_post(binop(BinOpKind::Gte, Expr::result(), Expr::int(0)));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "countdown", Correctness::Total).unwrap_err();
    assert!(matches!(err, VerificationError::Unprovable { .. }));
}

#[test]
fn partial_mode_ignores_variants() {
    // anything provable totally is provable partially, annotations included
    let variant = binop(BinOpKind::Sub, Expr::var("n"), Expr::var("i"));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(sum_proc(Some(variant)))],
        "sum",
        Correctness::Partial,
    )
    .unwrap();
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn total_mode_demands_a_loop_variant() {
    let ctx = solver_ctx();
    let err = inferred(
        &ctx,
        &[Decl::Proc(sum_proc(None))],
        "sum",
        Correctness::Total,
    )
    .unwrap_err();
    assert!(matches!(err, VerificationError::MissingVariant { .. }));
}

#[test]
fn loops_demand_an_invariant() {
    let p = Proc::new(
        "spin",
        &["n"],
        Block::new(vec![
            Stmt::while_loop(
                None,
                None,
                binop(BinOpKind::Gt, Expr::var("n"), Expr::int(0)),
                Block::new(vec![]),
            ),
            Stmt::ret(Expr::int(0)),
        ]),
    )
    .with_post(Expr::bool(true));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "spin", Correctness::Partial).unwrap_err();
    assert!(matches!(err, VerificationError::MissingInvariant { .. }));
}

#[test]
fn division_owes_a_nonzero_divisor() {
    let p = Proc::new(
        "quot",
        &["a", "b"],
        Block::new(vec![
            Stmt::assign("q", binop(BinOpKind::Div, Expr::var("a"), Expr::var("b"))),
            Stmt::ret(Expr::var("q")),
        ]),
    )
    .with_post(Expr::bool(true));
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "quot", Correctness::Partial).unwrap();
    let b = Int::new_const(&ctx, "b");
    assert_equiv(&ctx, &pre, &b._eq(&Int::from_i64(&ctx, 0)).not());
}

#[test]
fn recursion_needs_a_decreasing_variant() {
    // rec_sum(n) = n == 0 ? 0 : rec_sum(n - 1) + n, variant n
    let rec_call = Stmt::assign(
        "r",
        Expr::call("rec_sum", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
    );
    let p = Proc::new(
        "rec_sum",
        &["n"],
        Block::new(vec![Stmt::if_else(
            eq(Expr::var("n"), Expr::int(0)),
            Block::new(vec![Stmt::ret(Expr::int(0))]),
            Else::Block(Block::new(vec![
                rec_call,
                Stmt::assign("s", binop(BinOpKind::Add, Expr::var("r"), Expr::var("n"))),
                Stmt::ret(Expr::var("s")),
            ])),
        )]),
    )
    .with_post(eq(
        binop(BinOpKind::Mul, Expr::int(2), Expr::result()),
        binop(
            BinOpKind::Mul,
            Expr::var("n"),
            binop(BinOpKind::Add, Expr::var("n"), Expr::int(1)),
        ),
    ))
    .with_variant(Expr::var("n"));
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "rec_sum", Correctness::Total).unwrap();
    // the variant must be nonnegative on entry
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn recursive_call_without_variants_is_rejected() {
    let p = Proc::new(
        "loopy",
        &["n"],
        Block::new(vec![Stmt::if_else(
            eq(Expr::var("n"), Expr::int(0)),
            Block::new(vec![Stmt::ret(Expr::int(0))]),
            Else::Block(Block::new(vec![
                Stmt::assign(
                    "r",
                    Expr::call("loopy", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
                ),
                Stmt::ret(Expr::var("r")),
            ])),
        )]),
    )
    .with_post(Expr::bool(true));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "loopy", Correctness::Total).unwrap_err();
    assert!(matches!(err, VerificationError::MissingVariant { .. }));
}

#[test]
fn unmeetable_termination_obligations_are_reported() {
    // the variant -1 - n*n is negative everywhere, so no entry state can
    // discharge the termination obligation even though the body is fine
    let p = Proc::new(
        "shrink",
        &["n"],
        Block::new(vec![Stmt::if_else(
            eq(Expr::var("n"), Expr::int(0)),
            Block::new(vec![Stmt::ret(Expr::int(0))]),
            Else::Block(Block::new(vec![
                Stmt::assign(
                    "r",
                    Expr::call("shrink", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
                ),
                Stmt::ret(Expr::var("r")),
            ])),
        )]),
    )
    .with_post(Expr::bool(true))
    .with_variant(binop(
        BinOpKind::Sub,
        Expr::int(-1),
        binop(BinOpKind::Mul, Expr::var("n"), Expr::var("n")),
    ));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "shrink", Correctness::Total).unwrap_err();
    assert!(matches!(
        err,
        VerificationError::UnsatisfiablePrecondition { .. }
    ));
}

#[test]
fn mutual_recursion_decreases_across_both_procedures() {
    let flip = |me: &str, other: &str, base: i64| {
        Proc::new(
            me,
            &["n"],
            Block::new(vec![Stmt::if_else(
                eq(Expr::var("n"), Expr::int(0)),
                Block::new(vec![Stmt::ret(Expr::int(base))]),
                Else::Block(Block::new(vec![
                    Stmt::assign(
                        "r",
                        Expr::call(other, vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
                    ),
                    Stmt::ret(Expr::var("r")),
                ])),
            )]),
        )
        .with_post(binop(BinOpKind::Gte, Expr::result(), Expr::int(0)))
        .with_pre(binop(BinOpKind::Gte, Expr::var("n"), Expr::int(0)))
        .with_variant(Expr::var("n"))
    };
    let decls = [
        Decl::Proc(flip("peven", "podd", 1)),
        Decl::Proc(flip("podd", "peven", 0)),
    ];
    let ctx = solver_ctx();
    for name in ["peven", "podd"] {
        inferred(&ctx, &decls, name, Correctness::Total).unwrap();
    }
}

#[test]
fn call_arguments_read_the_destinations_prior_value() {
    // x := n; x := id(x); return x — the argument is x before the call, the
    // postcondition talks about x after it
    let id = Proc::new("id", &["k"], Block::new(vec![Stmt::ret(Expr::var("k"))]))
        .with_post(eq(Expr::result(), Expr::var("k")));
    let copy = Proc::new(
        "copy",
        &["n"],
        Block::new(vec![
            Stmt::assign("x", Expr::var("n")),
            Stmt::assign("x", Expr::call("id", vec![Expr::var("x")])),
            Stmt::ret(Expr::var("x")),
        ]),
    )
    .with_post(eq(Expr::result(), Expr::var("n")));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(id), Decl::Proc(copy)],
        "copy",
        Correctness::Partial,
    )
    .unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

fn bump_proc(post: Expr) -> Proc {
    // s := n + 1; return s
    Proc::new(
        "bump",
        &["n"],
        Block::new(vec![
            Stmt::assign("s", binop(BinOpKind::Add, Expr::var("n"), Expr::int(1))),
            Stmt::ret(Expr::var("s")),
        ]),
    )
    .with_post(post)
}

#[test]
fn callee_locals_do_not_alias_caller_variables() {
    // bump promises only result == s for its own local s, which says nothing
    // at a call site; a caller variable spelled s must not stand in for it
    let bump = bump_proc(eq(Expr::result(), Expr::var("s")));
    let caller = Proc::new(
        "caller",
        &["n"],
        Block::new(vec![
            Stmt::assign("s", binop(BinOpKind::Add, Expr::var("n"), Expr::int(1))),
            Stmt::assign("y", Expr::call("bump", vec![Expr::var("n")])),
            Stmt::ret(Expr::var("y")),
        ]),
    )
    .with_post(eq(
        Expr::result(),
        binop(BinOpKind::Add, Expr::var("n"), Expr::int(1)),
    ));
    let ctx = solver_ctx();
    let err = inferred(
        &ctx,
        &[Decl::Proc(bump), Decl::Proc(caller)],
        "caller",
        Correctness::Partial,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        VerificationError::UnsatisfiablePrecondition { .. }
    ));
}

#[test]
fn contracts_can_pin_down_their_locals() {
    // the same contract plus s == n + 1 determines the result again
    let bump = bump_proc(binop(
        BinOpKind::And,
        eq(Expr::result(), Expr::var("s")),
        eq(Expr::var("s"), binop(BinOpKind::Add, Expr::var("n"), Expr::int(1))),
    ));
    let caller = Proc::new(
        "caller",
        &["n"],
        Block::new(vec![
            Stmt::assign("y", Expr::call("bump", vec![Expr::var("n")])),
            Stmt::ret(Expr::var("y")),
        ]),
    )
    .with_post(eq(
        Expr::result(),
        binop(BinOpKind::Add, Expr::var("n"), Expr::int(1)),
    ));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::Proc(bump), Decl::Proc(caller)],
        "caller",
        Correctness::Partial,
    )
    .unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

#[test]
fn contracts_tie_procedures_to_spec_functions() {
    // fn ssum(n) := n <= 0 ? 0 : n + ssum(n - 1)
    let ssum = SpecFn::new(
        "ssum",
        &["n"],
        Expr::ternary(
            binop(BinOpKind::Lte, Expr::var("n"), Expr::int(0)),
            Expr::int(0),
            binop(
                BinOpKind::Add,
                Expr::var("n"),
                Expr::call("ssum", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
            ),
        ),
    );
    let p = Proc::new(
        "sum_rec",
        &["n"],
        Block::new(vec![Stmt::if_else(
            eq(Expr::var("n"), Expr::int(0)),
            Block::new(vec![Stmt::ret(Expr::int(0))]),
            Else::Block(Block::new(vec![
                Stmt::assign(
                    "t",
                    Expr::call("sum_rec", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
                ),
                Stmt::ret(binop(BinOpKind::Add, Expr::var("t"), Expr::var("n"))),
            ])),
        )]),
    )
    .with_post(eq(Expr::result(), Expr::call("ssum", vec![Expr::var("n")])))
    .with_variant(Expr::var("n"));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::SpecFn(ssum), Decl::Proc(p)],
        "sum_rec",
        Correctness::Total,
    )
    .unwrap();
    let n = Int::new_const(&ctx, "n");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).le(&n));
}

#[test]
fn spec_functions_unfold_on_ground_arguments() {
    let fact = SpecFn::new(
        "fact",
        &["n"],
        Expr::ternary(
            binop(BinOpKind::Lte, Expr::var("n"), Expr::int(1)),
            Expr::int(1),
            binop(
                BinOpKind::Mul,
                Expr::var("n"),
                Expr::call("fact", vec![binop(BinOpKind::Sub, Expr::var("n"), Expr::int(1))]),
            ),
        ),
    );
    let p = Proc::new("six", &[], Block::new(vec![Stmt::ret(Expr::int(6))]))
        .with_post(eq(Expr::result(), Expr::call("fact", vec![Expr::int(3)])));
    let ctx = solver_ctx();
    let pre = inferred(
        &ctx,
        &[Decl::SpecFn(fact), Decl::Proc(p)],
        "six",
        Correctness::Partial,
    )
    .unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

#[test]
fn assertions_must_follow_from_what_comes_after() {
    // assert x > 0 is discharged by the same demand the return makes
    let p = Proc::new(
        "pos",
        &["x"],
        Block::new(vec![
            Stmt::assert(binop(BinOpKind::Gt, Expr::var("x"), Expr::int(0))),
            Stmt::ret(Expr::var("x")),
        ]),
    )
    .with_post(binop(BinOpKind::Gt, Expr::result(), Expr::int(0)));
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "pos", Correctness::Partial).unwrap();
    let x = Int::new_const(&ctx, "x");
    assert_equiv(&ctx, &pre, &Int::from_i64(&ctx, 0).lt(&x));
}

#[test]
fn failed_assertions_carry_a_counterexample() {
    let p = Proc::new(
        "pos",
        &["x"],
        Block::new(vec![
            Stmt::assert(binop(BinOpKind::Gt, Expr::var("x"), Expr::int(0))),
            Stmt::ret(Expr::var("x")),
        ]),
    )
    .with_post(Expr::bool(true));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "pos", Correctness::Partial).unwrap_err();
    let VerificationError::Unprovable { counterexample, .. } = err else {
        panic!("expected an unprovable assertion, got {err:?}");
    };
    let cex = counterexample.unwrap();
    let x = cex
        .bindings
        .iter()
        .find(|(name, _)| name == "x")
        .expect("counterexample binds x");
    assert!(x.1.parse::<i64>().unwrap() <= 0);
}

#[test]
fn contradictory_demands_are_reported_as_unsatisfiable() {
    let p = Proc::new("p", &["n"], Block::new(vec![Stmt::ret(Expr::var("n"))])).with_post(binop(
        BinOpKind::And,
        eq(Expr::result(), Expr::var("n")),
        eq(Expr::result(), binop(BinOpKind::Add, Expr::var("n"), Expr::int(1))),
    ));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "p", Correctness::Partial).unwrap_err();
    assert!(matches!(
        err,
        VerificationError::UnsatisfiablePrecondition { .. }
    ));
}

#[test]
fn declared_preconditions_must_imply_the_inferred_one() {
    let sufficient = sum_proc(None).with_pre(binop(
        BinOpKind::Gte,
        Expr::var("n"),
        Expr::int(0),
    ));
    let ctx = solver_ctx();
    inferred(&ctx, &[Decl::Proc(sufficient)], "sum", Correctness::Partial).unwrap();

    let insufficient = sum_proc(None).with_pre(Expr::bool(true));
    let err = inferred(
        &ctx,
        &[Decl::Proc(insufficient)],
        "sum",
        Correctness::Partial,
    )
    .unwrap_err();
    let VerificationError::Unprovable { counterexample, .. } = err else {
        panic!("expected an unprovable precondition, got {err:?}");
    };
    let cex = counterexample.unwrap();
    let n = cex
        .bindings
        .iter()
        .find(|(name, _)| name == "n")
        .expect("counterexample binds n");
    assert!(n.1.parse::<i64>().unwrap() < 0);
}

#[test]
fn missing_postcondition_is_reported_per_procedure() {
    let p = Proc::new("p", &[], Block::new(vec![Stmt::ret(Expr::int(0))]));
    let ctx = solver_ctx();
    let err = inferred(&ctx, &[Decl::Proc(p)], "p", Correctness::Partial).unwrap_err();
    assert!(matches!(
        err,
        VerificationError::MissingPostcondition { name, .. } if name == "p"
    ));
}

#[test]
fn quantified_postconditions_are_encoded() {
    let p = Proc::new("id", &["n"], Block::new(vec![Stmt::ret(Expr::var("n"))])).with_post(
        Expr::quantified(Quantifier::Exists, &["k"], eq(Expr::result(), Expr::var("k"))),
    );
    let ctx = solver_ctx();
    let pre = inferred(&ctx, &[Decl::Proc(p)], "id", Correctness::Partial).unwrap();
    assert_equiv(&ctx, &pre, &Bool::from_bool(&ctx, true));
}

#[test]
fn one_failing_procedure_does_not_hide_the_others() {
    let good = Proc::new("good", &[], Block::new(vec![Stmt::ret(Expr::int(0))]))
        .with_post(eq(Expr::result(), Expr::int(0)));
    let bad = Proc::new("bad", &[], Block::new(vec![Stmt::ret(Expr::int(0))]));
    let outcomes =
        check_program_and_verify(&[Decl::Proc(good), Decl::Proc(bad)], Correctness::Partial)
            .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        outcomes[1].result,
        Err(VerificationError::MissingPostcondition { .. })
    ));
}

#[test]
fn infer_precondition_renders_a_formula() {
    let p = Proc::new(
        "quot",
        &["a", "b"],
        Block::new(vec![
            Stmt::assign("q", binop(BinOpKind::Div, Expr::var("a"), Expr::var("b"))),
            Stmt::ret(Expr::var("q")),
        ]),
    )
    .with_post(Expr::bool(true));
    let rendered =
        infer_precondition(&[Decl::Proc(p)], "quot", Correctness::Partial).unwrap();
    assert!(rendered.contains('b'), "missing divisor in {rendered}");

    assert!(infer_precondition(&[], "nowhere", Correctness::Partial).is_err());
}

#[test]
fn diagnostics_point_into_the_source() {
    let source = "proc p()\n  x := 1\n";
    let loc = Loc::new(11);
    let rendered = loc.render(source, "something is off");
    assert_eq!(rendered, "2:3: something is off\n  x := 1\n  ^");
}

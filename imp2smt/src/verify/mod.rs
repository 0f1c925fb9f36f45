mod encode;
mod solver;
mod statement;
mod toplevel;

pub(crate) use encode::{EncodeCtx, RESULT_NAME};
pub(crate) use statement::{Propagate, VcCtx};

pub use solver::Smt;
pub use toplevel::{check_program_and_verify, infer_precondition, ProcOutcome, Verifier};

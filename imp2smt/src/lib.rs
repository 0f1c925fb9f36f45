pub mod ast;
pub mod typecheck;
pub mod utils;
pub mod verify;

#[cfg(test)]
mod tests;

pub use typecheck::check_program;
pub use utils::{Correctness, Counterexample, Error, TypeError, VerificationError};
pub use verify::{check_program_and_verify, infer_precondition, ProcOutcome, Verifier};

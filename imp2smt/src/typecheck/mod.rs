mod expression;
mod statement;
mod toplevel;


pub use toplevel::check_program;
pub(crate) use toplevel::Checker;

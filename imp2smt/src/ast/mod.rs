mod expression;
mod position;
mod statement;
mod toplevel;

pub use expression::*;
pub use position::Loc;
pub use statement::*;
pub use toplevel::*;

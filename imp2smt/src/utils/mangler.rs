use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Surface keywords and pseudo-variables the checker rejects as
    /// identifiers.
    pub static ref RESERVED: HashSet<&'static str> = [
        "result", "true", "false", "if", "else", "while", "proc", "fn",
        "assert", "return", "forall", "exists",
    ]
    .into_iter()
    .collect();
}

/// Produces the `e!N` names used for loop variant bounds. `!` is not a legal
/// identifier character, so these can never collide with source variables.
#[derive(Debug, Clone, Default)]
pub struct Fresh {
    counter: u64,
}

impl Fresh {
    pub fn bound(&mut self) -> String {
        let name = format!("e!{}", self.counter);
        self.counter += 1;
        name
    }
}

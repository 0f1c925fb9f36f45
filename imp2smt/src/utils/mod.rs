mod contexts;
mod errors;
mod mangler;

pub use contexts::*;
pub use errors::*;
pub use mangler::{Fresh, RESERVED};

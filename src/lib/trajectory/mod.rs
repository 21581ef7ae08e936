mod trajectory;
pub mod loader;

pub use self::{trajectory::*, loader::*};

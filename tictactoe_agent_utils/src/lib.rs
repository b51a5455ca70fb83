mod strategy;
mod taunts;
pub use strategy::*;
pub use taunts::*;

pub use board::*;
pub use errors::*;
pub use protocol_types::*;
pub use state::*;
pub use visualization::*;

#[cfg(test)]
mod arbitrary;
mod board;
mod errors;
mod protocol_types;
mod state;
mod visualization;

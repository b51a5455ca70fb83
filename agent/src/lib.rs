mod agent;
mod client;
mod config;
mod error;
mod recording;
mod shutdown;
#[cfg(test)]
mod test_support;
mod transport;
pub use agent::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use recording::*;
pub use shutdown::*;
pub use transport::*;

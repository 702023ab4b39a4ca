//! Error helpers and filesystem utilities used across all skilldeck crates.

pub mod error;
pub mod fs;

pub use error::FromMessage;

pub mod config;
pub mod logging;

pub mod catalog;
pub mod coordinator;
pub mod digest;
pub mod fetch;
pub mod limiter;
pub mod verify;

pub use coordinator::{run, RunError, RunOptions, RunReport};

#[cfg(test)]
mod testing;

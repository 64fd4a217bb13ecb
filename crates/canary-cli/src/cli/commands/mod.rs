//! CLI command handlers. Each command is in its own file.

mod completions;
mod digest;
mod list;
mod run;

pub use completions::run_completions;
pub use digest::run_digest;
pub use list::run_list;
pub use run::run_verify;

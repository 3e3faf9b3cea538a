pub mod classifier;
pub mod cleanup;
pub mod completion;
pub mod config;
pub mod confirm;
pub mod error;
pub mod exec_log;
pub mod gherkin;
pub mod git;
pub mod history;
pub mod hook;
pub mod images;
pub mod interrupt;
pub mod io;
pub mod message;
pub mod paths;
pub mod plan;
pub mod squash;

#[cfg(test)]
mod test_support;

pub use error::{HookError, Result};

//! apicase - interactive runner for chained HTTP API test cases
//!
//! This library provides the execution engine (variable threading,
//! response normalization, validation and the sequential run controller),
//! the suite file repository and the HTTP transport behind the CLI.

pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod suite;
pub mod transport;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{ExecutionResult, RunController, RunMode};
pub use suite::TestCase;

//! Suites and test cases
//!
//! Case definitions are loaded from YAML suite files and handed to the
//! engine as an ordered queue. The engine never persists anything itself.

mod case;
mod repository;

pub use case::{SnapshotRequest, Suite, TestCase};
pub use repository::{CaseRepository, SuiteFile, YamlRepository};

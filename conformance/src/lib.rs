//! Git LFS API server compliance harness.
//!
//! Builds two fixture sets, objects known to exist on the server and objects
//! known to be absent, then runs every registered compliance test against
//! them one after another.
//!
//! # Usage
//!
//! ```bash
//! lfs-test-server-api --url https://lfs.example.com/api
//! lfs-test-server-api --clone https://git.example.com/org/repo.git
//! lfs-test-server-api --url https://lfs.example.com/api exists.txt missing.txt
//! ```
//!
//! Without fixture files the harness uploads freshly generated objects to
//! the server and synthesizes ids for the missing set. With fixture files,
//! each line is `<oid> <size>` and the server is left untouched.
//!
//! The process exits with:
//! - 0: every test passed
//! - 1: at least one test failed
//! - 2: configuration or fixture setup error (no tests ran)

pub mod config;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod loader;
pub mod suite;
pub mod synth;
pub mod testcase;
pub mod upload;

pub use error::HarnessError;
pub use fixture::{FixtureSet, FixtureSource, TestObject};
pub use harness::{RunSummary, run_tests, run_with_fixtures};
pub use testcase::{Registry, TestCase, TestResult};

//! Harness errors.
//!
//! Every variant is fatal: it means fixtures could not be brought into a
//! known state, so no test may run. Individual test failures are not errors
//! here, they are [`crate::TestResult`]s.

use std::path::PathBuf;

use lfs_api::{ApiError, TransferError};
use lfs_testrepo::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Bad command line or environment.
    #[error("{0}")]
    Config(String),

    /// A fixture file could not be opened or read.
    #[error("Error opening file {}: {source}", path.display())]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The test repository could not materialize fixture content.
    #[error("Failed to set up test data: {0}")]
    Repo(#[from] RepoError),

    /// The API client or upload queue could not be constructed.
    #[error("Failed to set up test data: {0}")]
    Setup(#[from] ApiError),

    /// The upload queue reported a fatal transfer error.
    #[error("Fatal error setting up test data: {0}")]
    Fatal(TransferError),

    /// A runtime for the test suite could not be started.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The report could not be written.
    #[error("Failed to write report: {0}")]
    Output(#[source] std::io::Error),
}

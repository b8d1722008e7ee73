//! lfs-testrepo: scaffolding for exercising Git LFS servers.
//!
//! Provides [`TestRepo`], an isolated throwaway repository whose commits
//! produce real content objects with known ids, and [`server::MockServer`],
//! an in-process batch API server for tests.

mod repo;
pub mod server;

pub use repo::{
    CommitInput, CommitOutput, DirGuard, FileInput, FileOutput, RepoError, TestRepo, sha256_hex,
};

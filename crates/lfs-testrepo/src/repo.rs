//! Throwaway test repository.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Directory, relative to the repo root, holding stored objects.
const OBJECTS_DIR: &str = ".lfs/objects";

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid commit input: {0}")]
    InvalidInput(String),
}

impl RepoError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file to create in a commit.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub filename: String,
    pub size: u64,
}

impl FileInput {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }
}

/// One change-set: a message and the files it adds.
#[derive(Debug, Clone, Default)]
pub struct CommitInput {
    pub message: String,
    pub files: Vec<FileInput>,
}

impl CommitInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            files: Vec::new(),
        }
    }

    pub fn file(mut self, filename: impl Into<String>, size: u64) -> Self {
        self.files.push(FileInput::new(filename, size));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub filename: String,
    pub oid: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct CommitOutput {
    pub message: String,
    pub files: Vec<FileOutput>,
}

/// An isolated repository in a temporary directory.
///
/// Committed files are written to the working tree and copied into a local
/// object store laid out the way Git LFS lays out `.git/lfs/objects`. The
/// whole directory is removed when the repo is dropped.
pub struct TestRepo {
    dir: TempDir,
    rng: Mutex<ChaCha20Rng>,
}

impl TestRepo {
    /// Create a repo whose file content is seeded from OS entropy, so every
    /// run produces objects no server has seen.
    pub fn new() -> Result<Self, RepoError> {
        Self::with_rng(ChaCha20Rng::from_entropy())
    }

    /// Create a repo with reproducible file content.
    pub fn with_seed(seed: u64) -> Result<Self, RepoError> {
        Self::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha20Rng) -> Result<Self, RepoError> {
        let dir = tempfile::Builder::new()
            .prefix("lfs-testrepo-")
            .tempdir()
            .map_err(|e| RepoError::io("failed to create", &std::env::temp_dir(), e))?;
        let objects = dir.path().join(OBJECTS_DIR);
        std::fs::create_dir_all(&objects)
            .map_err(|e| RepoError::io("failed to create", &objects, e))?;
        debug!(root = %dir.path().display(), "created test repo");
        Ok(Self {
            dir,
            rng: Mutex::new(rng),
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Make the repo the process working directory until the guard drops.
    pub fn pushd(&self) -> Result<DirGuard<'_>, RepoError> {
        let previous =
            std::env::current_dir().map_err(|e| RepoError::io("failed to read", Path::new("."), e))?;
        std::env::set_current_dir(self.root())
            .map_err(|e| RepoError::io("failed to enter", self.root(), e))?;
        Ok(DirGuard {
            previous,
            _repo: PhantomData,
        })
    }

    /// Where the content for `oid` is stored.
    pub fn object_path(&self, oid: &str) -> PathBuf {
        let mut path = self.root().join(OBJECTS_DIR);
        if let (Some(a), Some(b)) = (oid.get(0..2), oid.get(2..4)) {
            path.push(a);
            path.push(b);
        }
        path.push(oid);
        path
    }

    /// Apply each commit in order and report the objects it created.
    pub fn add_commits(&self, commits: &[CommitInput]) -> Result<Vec<CommitOutput>, RepoError> {
        commits.iter().map(|c| self.add_commit(c)).collect()
    }

    fn add_commit(&self, commit: &CommitInput) -> Result<CommitOutput, RepoError> {
        let mut seen = HashSet::new();
        for file in &commit.files {
            if file.filename.is_empty() {
                return Err(RepoError::InvalidInput("empty filename".to_string()));
            }
            if !seen.insert(file.filename.as_str()) {
                return Err(RepoError::InvalidInput(format!(
                    "duplicate filename {:?}",
                    file.filename
                )));
            }
        }

        let mut files = Vec::with_capacity(commit.files.len());
        for file in &commit.files {
            let content = self.random_content(file.size);
            let oid = sha256_hex(&content);

            let work_path = self.root().join(&file.filename);
            if let Some(parent) = work_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RepoError::io("failed to create", parent, e))?;
            }
            std::fs::write(&work_path, &content)
                .map_err(|e| RepoError::io("failed to write", &work_path, e))?;

            let object_path = self.object_path(&oid);
            if let Some(parent) = object_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RepoError::io("failed to create", parent, e))?;
            }
            std::fs::write(&object_path, &content)
                .map_err(|e| RepoError::io("failed to write", &object_path, e))?;

            files.push(FileOutput {
                filename: file.filename.clone(),
                oid,
                size: file.size,
            });
        }

        debug!(message = %commit.message, files = files.len(), "committed");
        Ok(CommitOutput {
            message: commit.message.clone(),
            files,
        })
    }

    fn random_content(&self, size: u64) -> Vec<u8> {
        let mut content = vec![0u8; size as usize];
        self.rng.lock().fill_bytes(&mut content);
        content
    }
}

/// Restores the previous working directory on drop.
///
/// Borrows the repo so the directory cannot be deleted while the process
/// is still inside it.
pub struct DirGuard<'a> {
    previous: PathBuf,
    _repo: PhantomData<&'a TestRepo>,
}

impl Drop for DirGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(dir = %self.previous.display(), error = %e, "failed to restore working directory");
        }
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

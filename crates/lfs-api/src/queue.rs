//! Concurrent upload queue.
//!
//! The queue owns a tokio runtime. [`TransferQueue::add`] spawns the
//! transfer right away, bounded by a semaphore, and [`TransferQueue::wait`]
//! blocks the caller until every spawned transfer has finished. Callers never
//! see the concurrency, only the drained queue and its error list.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::batch::{ObjectSpec, Operation};
use crate::client::Client;
use crate::error::{ApiError, TransferError};

/// Default number of transfers in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// The blocking surface of an upload queue.
pub trait TransferQueue {
    /// Enqueue one object.
    fn add(&mut self, object: Uploadable);

    /// Block until every enqueued object has been transferred or failed.
    fn wait(&mut self);

    /// Errors accumulated so far.
    fn errors(&self) -> &[TransferError];
}

/// A local object that can be uploaded.
#[derive(Debug, Clone)]
pub struct Uploadable {
    oid: String,
    size: u64,
    path: PathBuf,
}

impl Uploadable {
    /// Describe the object stored at `path`; its size is taken from the file.
    pub fn new(oid: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|source| ApiError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            oid: oid.into(),
            size: metadata.len(),
            path,
        })
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> ObjectSpec {
        ObjectSpec {
            oid: self.oid.clone(),
            size: self.size as i64,
        }
    }
}

/// Upload queue backed by [`Client`].
pub struct UploadQueue {
    client: Arc<Client>,
    runtime: Runtime,
    permits: Arc<Semaphore>,
    pending: Vec<(String, JoinHandle<Result<(), TransferError>>)>,
    errors: Vec<TransferError>,
    completed: Arc<AtomicUsize>,
    expected_count: usize,
    expected_size: u64,
    verbose: bool,
}

impl UploadQueue {
    /// Create a queue expecting `count` objects totalling `size` bytes.
    pub fn new(
        client: Arc<Client>,
        count: usize,
        size: u64,
        verbose: bool,
    ) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("lfs-upload")
            .enable_all()
            .build()
            .map_err(ApiError::Runtime)?;

        Ok(Self {
            client,
            runtime,
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            pending: Vec::with_capacity(count),
            errors: Vec::new(),
            completed: Arc::new(AtomicUsize::new(0)),
            expected_count: count,
            expected_size: size,
            verbose,
        })
    }

    /// Limit the number of concurrent transfers (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }
}

impl TransferQueue for UploadQueue {
    fn add(&mut self, object: Uploadable) {
        let client = self.client.clone();
        let permits = self.permits.clone();
        let completed = self.completed.clone();
        let expected = self.expected_count;
        let verbose = self.verbose;
        let oid = object.oid.clone();

        let handle = self.runtime.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| TransferError::Fatal {
                    oid: object.oid.clone(),
                    message: format!("upload queue closed: {e}"),
                })?;
            let result = transfer(&client, &object).await;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if verbose {
                info!(oid = %object.oid, done, expected, ok = result.is_ok(), "upload finished");
            }
            result
        });
        self.pending.push((oid, handle));
    }

    fn wait(&mut self) {
        debug!(
            pending = self.pending.len(),
            expected_count = self.expected_count,
            expected_size = self.expected_size,
            "waiting for upload queue to drain"
        );
        for (oid, handle) in self.pending.drain(..) {
            match self.runtime.block_on(handle) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.errors.push(e),
                Err(e) => self.errors.push(TransferError::Fatal {
                    oid,
                    message: format!("upload task failed: {e}"),
                }),
            }
        }
    }

    fn errors(&self) -> &[TransferError] {
        &self.errors
    }
}

/// Upload one object through the batch API and the basic transfer adapter.
async fn transfer(client: &Client, object: &Uploadable) -> Result<(), TransferError> {
    let spec = object.spec();
    let response = client
        .batch(Operation::Upload, std::slice::from_ref(&spec))
        .await
        .map_err(|e| TransferError::from_api(&spec.oid, e))?;

    let Some(entry) = response.object(&spec.oid) else {
        return Err(TransferError::Fatal {
            oid: spec.oid,
            message: "batch response did not mention the object".to_string(),
        });
    };

    if let Some(error) = &entry.error {
        return Err(TransferError::Object {
            oid: spec.oid,
            code: error.code,
            message: error.message.clone(),
        });
    }

    let Some(upload) = entry.action(Operation::Upload) else {
        debug!(oid = %spec.oid, "server already has object");
        return Ok(());
    };

    let content = tokio::fs::read(object.path())
        .await
        .map_err(|source| TransferError::from_api(
            &spec.oid,
            ApiError::Io {
                path: object.path().to_path_buf(),
                source,
            },
        ))?;

    client
        .upload(upload, content)
        .await
        .map_err(|e| TransferError::from_api(&spec.oid, e))?;

    if let Some(verify) = entry.verify_action() {
        client
            .verify(verify, &spec)
            .await
            .map_err(|e| TransferError::from_api(&spec.oid, e))?;
    }

    debug!(oid = %spec.oid, size = spec.size, "uploaded object");
    Ok(())
}

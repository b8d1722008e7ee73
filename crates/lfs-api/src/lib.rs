//! lfs-api: client side of the Git LFS batch API.
//!
//! This crate provides the pieces the compliance harness talks to a server
//! through:
//!
//! - [`Endpoint`]: the API base URL, given directly or derived from a clone URL
//! - [`Client`]: batch requests plus the basic transfer adapter (PUT/GET/verify)
//! - [`UploadQueue`]: a concurrent upload queue with a blocking
//!   "add many, then wait" surface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lfs_api::{Client, Endpoint, TransferQueue, UploadQueue, Uploadable};
//!
//! let client = Arc::new(Client::new(Endpoint::from_clone_url("https://example.com/org/repo")?)?);
//! let mut queue = UploadQueue::new(client, 1, 128, false)?;
//! queue.add(Uploadable::new(oid, path)?);
//! queue.wait();
//! assert!(queue.errors().iter().all(|e| !e.is_fatal()));
//! ```

pub mod batch;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod queue;

pub use batch::{
    Action, Actions, BatchRequest, BatchResponse, ErrorBody, MEDIA_TYPE, ObjectError,
    ObjectResponse, ObjectSpec, Operation,
};
pub use client::{Client, Credentials};
pub use endpoint::Endpoint;
pub use error::{ApiError, TransferError};
pub use queue::{DEFAULT_CONCURRENCY, TransferQueue, UploadQueue, Uploadable};

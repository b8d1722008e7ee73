//! Git LFS API compliance tests.
//!
//! Each module covers one area of the batch API. Every test receives the
//! objects known to exist on the server and the objects known to be absent,
//! and talks to the server through a shared [`ApiContext`].

pub mod batch;
pub mod download;
pub mod upload;

use std::sync::Arc;

use lfs_api::{BatchResponse, Client, ObjectResponse, ObjectSpec, Operation};
use tokio::runtime::Runtime;

use crate::fixture::TestObject;
use crate::testcase::{Registry, TestResult};

/// Outcome of a test body; the error becomes the report's failure message.
pub type Check = Result<(), String>;

type TestBody = fn(&ApiContext, &[TestObject], &[TestObject]) -> Check;

/// Registered tests, in run order.
const TESTS: &[(&str, TestBody)] = &[
    ("Test download: exists (batch)", download::exists),
    ("Test download: missing (batch)", download::missing),
    ("Test download: mixed (batch)", download::mixed),
    ("Test download: content matches oid", download::content_matches_oid),
    ("Test upload: all missing (batch)", upload::all_missing),
    ("Test upload: all present (batch)", upload::all_present),
    ("Test upload: mixed (batch)", upload::mixed),
    ("Test upload: invalid oid", upload::invalid_oid),
    ("Test upload: negative size", upload::negative_size),
    ("Test batch: unknown operation", batch::unknown_operation),
];

/// Names of every compliance test, in run order.
pub fn names() -> Vec<&'static str> {
    TESTS.iter().map(|(name, _)| *name).collect()
}

/// Register every compliance test against the server behind `client`.
///
/// Test bodies block on `runtime`, so the runner must not itself be inside
/// an async context.
pub fn register(registry: &mut Registry, client: Arc<Client>, runtime: Arc<Runtime>) {
    let context = Arc::new(ApiContext { client, runtime });
    for &(name, body) in TESTS {
        let context = context.clone();
        registry.register(name, move |existing, missing| {
            TestResult::from(body(&context, existing, missing))
        });
    }
}

/// Client plus the runtime its requests are driven on.
pub struct ApiContext {
    client: Arc<Client>,
    runtime: Arc<Runtime>,
}

impl ApiContext {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run a future to completion on the suite's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Batch request for `objects`, failing the test on any HTTP error.
    pub fn batch(&self, operation: Operation, objects: &[TestObject]) -> Result<BatchResponse, String> {
        let specs: Vec<ObjectSpec> = objects.iter().map(TestObject::spec).collect();
        self.block_on(self.client.batch(operation, &specs))
            .map_err(|e| format!("{} batch request failed: {e}", operation.as_str()))
    }

    /// POST a hand-built batch body. Returns the status and, for a 2xx, the
    /// decoded response.
    pub fn batch_raw(
        &self,
        body: &serde_json::Value,
    ) -> Result<(u16, Option<BatchResponse>), String> {
        let (status, value) = self
            .block_on(self.client.batch_raw(body))
            .map_err(|e| format!("batch request failed: {e}"))?;
        if !(200..300).contains(&status) {
            return Ok((status, None));
        }
        let response = serde_json::from_value(value)
            .map_err(|e| format!("status {status} with undecodable batch response: {e}"))?;
        Ok((status, Some(response)))
    }
}

/// The response entry for `oid`, or a failure naming it.
pub(crate) fn find<'a>(response: &'a BatchResponse, oid: &str) -> Result<&'a ObjectResponse, String> {
    response
        .object(oid)
        .ok_or_else(|| format!("object {oid} missing from batch response"))
}

/// Fail if `object` carries an error.
pub(crate) fn expect_no_error(object: &ObjectResponse) -> Check {
    match &object.error {
        Some(error) => Err(format!(
            "object {} returned error {}: {}",
            object.oid, error.code, error.message
        )),
        None => Ok(()),
    }
}

/// Fail unless `object` carries an error with `code`.
pub(crate) fn expect_error_code(object: &ObjectResponse, code: u16) -> Check {
    match &object.error {
        Some(error) if error.code == code => Ok(()),
        Some(error) => Err(format!(
            "object {} returned code {}, expected {code}",
            object.oid, error.code
        )),
        None => Err(format!("object {} returned no error, expected {code}", object.oid)),
    }
}

/// Alternate between `a` and `b`, then append whatever is left of the longer.
pub(crate) fn interleave(a: &[TestObject], b: &[TestObject]) -> Vec<TestObject> {
    let mut mixed = Vec::with_capacity(a.len() + b.len());
    let mut a = a.iter();
    let mut b = b.iter();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return mixed,
            (x, y) => mixed.extend(x.into_iter().chain(y).cloned()),
        }
    }
}

/// An object with a well-formed id for request-shape tests, taken from the
/// fixtures when any exist.
pub(crate) fn sample_object(existing: &[TestObject], missing: &[TestObject]) -> TestObject {
    missing
        .first()
        .or_else(|| existing.first())
        .cloned()
        .unwrap_or_else(|| TestObject::new(EMPTY_OID, 0))
}

/// SHA-256 of the empty string.
const EMPTY_OID: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

//! Request-level batch API tests.

use serde_json::json;

use super::{ApiContext, Check, sample_object};
use crate::fixture::TestObject;

// =============================================================================
// Test batch: unknown operation
// =============================================================================
// Only "upload" and "download" are defined. A server may reject the request
// outright with 422 or fail every object in it.

pub fn unknown_operation(
    context: &ApiContext,
    existing: &[TestObject],
    missing: &[TestObject],
) -> Check {
    let object = sample_object(existing, missing);
    let body = json!({
        "operation": "destroy",
        "transfers": ["basic"],
        "objects": [{ "oid": object.oid, "size": object.size }],
    });

    let (status, response) = context.batch_raw(&body)?;
    if status == 422 {
        return Ok(());
    }
    let Some(response) = response else {
        return Err(format!("server returned status {status}, expected 422"));
    };
    if response.objects.is_empty() {
        return Err("batch response has no objects, expected error 422".to_string());
    }
    match response.objects.iter().find(|o| o.error.is_none()) {
        Some(accepted) => Err(format!(
            "object {} accepted for unknown operation",
            accepted.oid
        )),
        None => Ok(()),
    }
}

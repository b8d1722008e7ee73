//! Upload batch tests.

use lfs_api::{BatchResponse, Operation};
use serde_json::json;

use super::{ApiContext, Check, expect_no_error, find, interleave, sample_object};
use crate::fixture::TestObject;

fn expect_upload_action(response: &BatchResponse, oid: &str) -> Check {
    let entry = find(response, oid)?;
    expect_no_error(entry)?;
    if entry.action(Operation::Upload).is_none() {
        return Err(format!("object {oid} has no upload action"));
    }
    Ok(())
}

fn expect_no_upload_action(response: &BatchResponse, oid: &str) -> Check {
    let entry = find(response, oid)?;
    expect_no_error(entry)?;
    if entry.action(Operation::Upload).is_some() {
        return Err(format!("object {oid} is already present but has an upload action"));
    }
    Ok(())
}

/// Pass if the server rejected `body` with 422, either for the whole request
/// or for its single object.
fn expect_unprocessable(context: &ApiContext, body: serde_json::Value, what: &str) -> Check {
    let (status, response) = context.batch_raw(&body)?;
    if status == 422 {
        return Ok(());
    }
    let Some(response) = response else {
        return Err(format!("{what}: server returned status {status}, expected 422"));
    };
    let Some(object) = response.objects.first() else {
        return Err(format!("{what}: batch response has no objects"));
    };
    match &object.error {
        Some(error) if error.code == 422 => Ok(()),
        Some(error) => Err(format!("{what}: object returned code {}, expected 422", error.code)),
        None => Err(format!("{what}: object accepted, expected error 422")),
    }
}

// =============================================================================
// Test upload: all missing (batch)
// =============================================================================

pub fn all_missing(context: &ApiContext, _existing: &[TestObject], missing: &[TestObject]) -> Check {
    if missing.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Upload, missing)?;
    for object in missing {
        expect_upload_action(&response, &object.oid)?;
    }
    Ok(())
}

// =============================================================================
// Test upload: all present (batch)
// =============================================================================
// The server already has these objects; it must not ask for them again.

pub fn all_present(context: &ApiContext, existing: &[TestObject], _missing: &[TestObject]) -> Check {
    if existing.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Upload, existing)?;
    for object in existing {
        expect_no_upload_action(&response, &object.oid)?;
    }
    Ok(())
}

// =============================================================================
// Test upload: mixed (batch)
// =============================================================================

pub fn mixed(context: &ApiContext, existing: &[TestObject], missing: &[TestObject]) -> Check {
    let objects = interleave(existing, missing);
    if objects.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Upload, &objects)?;
    for object in existing {
        expect_no_upload_action(&response, &object.oid)?;
    }
    for object in missing {
        expect_upload_action(&response, &object.oid)?;
    }
    Ok(())
}

// =============================================================================
// Test upload: invalid oid
// =============================================================================

pub fn invalid_oid(context: &ApiContext, _existing: &[TestObject], _missing: &[TestObject]) -> Check {
    let body = json!({
        "operation": "upload",
        "transfers": ["basic"],
        "objects": [{ "oid": "not-a-valid-oid!", "size": 10 }],
    });
    expect_unprocessable(context, body, "invalid oid")
}

// =============================================================================
// Test upload: negative size
// =============================================================================

pub fn negative_size(context: &ApiContext, existing: &[TestObject], missing: &[TestObject]) -> Check {
    let object = sample_object(existing, missing);
    let body = json!({
        "operation": "upload",
        "transfers": ["basic"],
        "objects": [{ "oid": object.oid, "size": -1 }],
    });
    expect_unprocessable(context, body, "negative size")
}

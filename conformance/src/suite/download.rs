//! Download batch tests.

use lfs_api::Operation;
use lfs_testrepo::sha256_hex;

use super::{ApiContext, Check, expect_error_code, expect_no_error, find, interleave};
use crate::fixture::TestObject;

fn expect_download(context: &ApiContext, objects: &[TestObject]) -> Check {
    let response = context.batch(Operation::Download, objects)?;
    for object in objects {
        let entry = find(&response, &object.oid)?;
        expect_no_error(entry)?;
        if entry.action(Operation::Download).is_none() {
            return Err(format!("object {} has no download action", object.oid));
        }
    }
    Ok(())
}

// =============================================================================
// Test download: exists (batch)
// =============================================================================
// Every object the server holds is offered for download.

pub fn exists(context: &ApiContext, existing: &[TestObject], _missing: &[TestObject]) -> Check {
    if existing.is_empty() {
        return Ok(());
    }
    expect_download(context, existing)
}

// =============================================================================
// Test download: missing (batch)
// =============================================================================
// Absent objects come back with a per-object 404, not a failed request.

pub fn missing(context: &ApiContext, _existing: &[TestObject], missing: &[TestObject]) -> Check {
    if missing.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Download, missing)?;
    for object in missing {
        expect_error_code(find(&response, &object.oid)?, 404)?;
    }
    Ok(())
}

// =============================================================================
// Test download: mixed (batch)
// =============================================================================

pub fn mixed(context: &ApiContext, existing: &[TestObject], missing: &[TestObject]) -> Check {
    let objects = interleave(existing, missing);
    if objects.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Download, &objects)?;

    for object in existing {
        let entry = find(&response, &object.oid)?;
        expect_no_error(entry)?;
        if entry.action(Operation::Download).is_none() {
            return Err(format!("object {} has no download action", object.oid));
        }
    }
    for object in missing {
        expect_error_code(find(&response, &object.oid)?, 404)?;
    }
    Ok(())
}

// =============================================================================
// Test download: content matches oid
// =============================================================================
// Downloaded bytes hash to the object id and have the advertised size.

pub fn content_matches_oid(
    context: &ApiContext,
    existing: &[TestObject],
    _missing: &[TestObject],
) -> Check {
    if existing.is_empty() {
        return Ok(());
    }
    let response = context.batch(Operation::Download, existing)?;

    for object in existing {
        let entry = find(&response, &object.oid)?;
        expect_no_error(entry)?;
        let action = entry
            .action(Operation::Download)
            .ok_or_else(|| format!("object {} has no download action", object.oid))?;

        let content = context
            .block_on(context.client().download(action))
            .map_err(|e| format!("downloading {} failed: {e}", object.oid))?;

        if content.len() as i64 != object.size {
            return Err(format!(
                "object {} downloaded {} bytes, expected {}",
                object.oid,
                content.len(),
                object.size
            ));
        }
        let oid = sha256_hex(&content);
        if oid != object.oid {
            return Err(format!("object {} downloaded content hashing to {oid}", object.oid));
        }
    }
    Ok(())
}

//! Fixture files.
//!
//! One object per line, `<oid> <size>`, whitespace separated. Lines that do
//! not have exactly two fields, or are not valid UTF-8, are skipped; a size
//! that does not parse as a signed 64-bit integer reads as zero.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::HarnessError;
use crate::fixture::TestObject;

/// Read a fixture file.
pub fn read_test_oids(path: &Path) -> Result<Vec<TestObject>, HarnessError> {
    let io_error = |source| HarnessError::FixtureIo {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(path).map_err(io_error)?);
    let mut objects = Vec::new();
    let mut skipped = 0usize;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(io_error)? == 0 {
            break;
        }
        match std::str::from_utf8(&buf).ok().and_then(parse_line) {
            Some(object) => objects.push(object),
            None => skipped += 1,
        }
    }

    debug!(
        path = %path.display(),
        objects = objects.len(),
        skipped,
        "read fixture file"
    );
    Ok(objects)
}

/// Parse one fixture line.
pub fn parse_line(line: &str) -> Option<TestObject> {
    let mut fields = line.split_whitespace();
    let (Some(oid), Some(size), None) = (fields.next(), fields.next(), fields.next()) else {
        return None;
    };
    Some(TestObject::new(oid, size.parse().unwrap_or(0)))
}

//! Fixture types and fixture construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lfs_api::{ApiError, Client, ObjectSpec, TransferQueue, UploadQueue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn};

use crate::error::HarnessError;
use crate::{loader, synth, upload};

/// Smallest generated object size, in bytes.
pub const MIN_SIZE: u64 = 50;
/// Largest generated object size, in bytes (inclusive).
pub const MAX_SIZE: u64 = 249;

/// Default number of objects per fixture set.
pub const DEFAULT_COUNT: usize = 50;

/// A content-addressed fixture: object id plus size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestObject {
    pub oid: String,
    pub size: i64,
}

impl TestObject {
    pub fn new(oid: impl Into<String>, size: i64) -> Self {
        Self {
            oid: oid.into(),
            size,
        }
    }

    pub fn spec(&self) -> ObjectSpec {
        ObjectSpec {
            oid: self.oid.clone(),
            size: self.size,
        }
    }
}

/// Pick a generated object size.
pub(crate) fn random_size<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen_range(MIN_SIZE..=MAX_SIZE)
}

/// Objects known to exist on the server and objects known to be absent.
///
/// Built once per run and only handed out as shared slices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureSet {
    existing: Vec<TestObject>,
    missing: Vec<TestObject>,
}

impl FixtureSet {
    pub fn new(existing: Vec<TestObject>, missing: Vec<TestObject>) -> Self {
        Self { existing, missing }
    }

    pub fn existing(&self) -> &[TestObject] {
        &self.existing
    }

    pub fn missing(&self) -> &[TestObject] {
        &self.missing
    }

    /// Ids present in both sets. Empty for every set this crate generates.
    pub fn overlap(&self) -> Vec<&str> {
        let existing: HashSet<&str> = self.existing.iter().map(|o| o.oid.as_str()).collect();
        self.missing
            .iter()
            .map(|o| o.oid.as_str())
            .filter(|oid| existing.contains(oid))
            .collect()
    }
}

/// Where fixtures come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureSource {
    /// Read both sets from files; the server is not modified.
    Files { exists: PathBuf, missing: PathBuf },
    /// Upload `count` fresh objects and synthesize `count` absent ids.
    Generate { count: usize },
}

/// Read both fixture sets from files.
pub fn load_fixtures(exists: &Path, missing: &Path) -> Result<FixtureSet, HarnessError> {
    let fixtures = FixtureSet::new(
        loader::read_test_oids(exists)?,
        loader::read_test_oids(missing)?,
    );

    let overlap = fixtures.overlap();
    if !overlap.is_empty() {
        warn!(
            count = overlap.len(),
            first = overlap[0],
            "fixture files list the same object as existing and missing"
        );
    }
    Ok(fixtures)
}

/// Upload `count` fresh objects and synthesize `count` ids that no content
/// hashes to.
///
/// `make_queue` receives the object count and total byte size of the batch.
/// The missing set is seeded from `count` alone, so it is identical across
/// runs with the same count.
pub fn generate_fixtures<R, Q, F>(
    count: usize,
    rng: &mut R,
    make_queue: F,
) -> Result<FixtureSet, HarnessError>
where
    R: Rng + ?Sized,
    Q: TransferQueue,
    F: FnOnce(usize, u64) -> Result<Q, ApiError>,
{
    let existing = upload::upload_existing(count, rng, make_queue)?;

    let mut missing_rng = synth::missing_rng(count);
    let missing = synth::synthesize_missing(&mut missing_rng, count);

    info!(
        existing = existing.len(),
        missing = missing.len(),
        "test data ready"
    );
    Ok(FixtureSet::new(existing, missing))
}

/// Build fixtures from `source`, uploading through `client` when generating.
pub fn prepare_fixtures(
    source: &FixtureSource,
    client: &Arc<Client>,
    concurrency: usize,
) -> Result<FixtureSet, HarnessError> {
    match source {
        FixtureSource::Files { exists, missing } => load_fixtures(exists, missing),
        FixtureSource::Generate { count } => {
            let mut rng = ChaCha20Rng::from_entropy();
            generate_fixtures(*count, &mut rng, |count, size| {
                Ok(UploadQueue::new(client.clone(), count, size, false)?
                    .with_concurrency(concurrency))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CWD_LOCK, FakeQueue};

    #[test]
    fn test_generated_sets_are_disjoint() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let fixtures = generate_fixtures(20, &mut rng, |_, _| Ok(FakeQueue::default())).unwrap();

        assert_eq!(fixtures.existing().len(), 20);
        assert_eq!(fixtures.missing().len(), 20);
        assert!(fixtures.overlap().is_empty());

        let unique: HashSet<_> = fixtures.existing().iter().map(|o| &o.oid).collect();
        assert_eq!(unique.len(), 20);
        for object in fixtures.existing().iter().chain(fixtures.missing()) {
            assert!((MIN_SIZE as i64..=MAX_SIZE as i64).contains(&object.size));
        }
    }

    #[test]
    fn test_missing_set_depends_only_on_count() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let a = generate_fixtures(5, &mut ChaCha20Rng::seed_from_u64(1), |_, _| {
            Ok(FakeQueue::default())
        })
        .unwrap();
        let b = generate_fixtures(5, &mut ChaCha20Rng::seed_from_u64(2), |_, _| {
            Ok(FakeQueue::default())
        })
        .unwrap();

        assert_eq!(a.missing(), b.missing());
        assert_ne!(a.existing(), b.existing());
    }

    #[test]
    fn test_overlap_detects_shared_ids() {
        let fixtures = FixtureSet::new(
            vec![TestObject::new("a", 1), TestObject::new("b", 2)],
            vec![TestObject::new("b", 2), TestObject::new("c", 3)],
        );
        assert_eq!(fixtures.overlap(), vec!["b"]);
    }

    #[test]
    fn test_load_fixtures_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let exists = dir.path().join("exists");
        let missing = dir.path().join("missing");
        std::fs::write(&exists, "aaa 10\nbbb 20\n").unwrap();
        std::fs::write(&missing, "ccc 30\n").unwrap();

        let fixtures = load_fixtures(&exists, &missing).unwrap();
        assert_eq!(
            fixtures.existing(),
            &[TestObject::new("aaa", 10), TestObject::new("bbb", 20)]
        );
        assert_eq!(fixtures.missing(), &[TestObject::new("ccc", 30)]);
    }

    #[test]
    fn test_load_fixtures_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let exists = dir.path().join("exists");
        std::fs::write(&exists, "aaa 10\n").unwrap();

        let err = load_fixtures(&exists, &dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, HarnessError::FixtureIo { .. }));
    }
}

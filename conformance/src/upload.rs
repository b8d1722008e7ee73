//! Objects guaranteed to exist on the server.
//!
//! Fresh content is committed to a throwaway [`TestRepo`], which yields the
//! true id of every file, and the resulting objects are pushed through an
//! upload queue. The repo and the working directory change are released when
//! this returns, on every path.

use lfs_api::{ApiError, TransferQueue, Uploadable};
use lfs_testrepo::{CommitInput, FileInput, TestRepo};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::HarnessError;
use crate::fixture::{TestObject, random_size};

/// Upload `count` freshly generated objects and return them.
///
/// Sizes are drawn from `rng`. `make_queue` is called with the object count
/// and total byte size once the content exists. A fatal queue error fails
/// the whole call; object-level errors (the server already having an object,
/// say) are logged and ignored.
pub fn upload_existing<R, Q, F>(
    count: usize,
    rng: &mut R,
    make_queue: F,
) -> Result<Vec<TestObject>, HarnessError>
where
    R: Rng + ?Sized,
    Q: TransferQueue,
    F: FnOnce(usize, u64) -> Result<Q, ApiError>,
{
    let repo = TestRepo::new()?;
    let _cwd = repo.pushd()?;

    let mut commit = CommitInput::new("Add test data");
    let mut total_size = 0u64;
    for i in 0..count {
        let size = random_size(rng);
        commit.files.push(FileInput::new(format!("file{i}.dat"), size));
        total_size += size;
    }

    let files = repo
        .add_commits(std::slice::from_ref(&commit))?
        .into_iter()
        .flat_map(|output| output.files)
        .collect::<Vec<_>>();

    let mut queue = make_queue(files.len(), total_size)?;
    let mut existing = Vec::with_capacity(files.len());
    for file in &files {
        queue.add(Uploadable::new(&file.oid, repo.object_path(&file.oid))?);
        existing.push(TestObject::new(&file.oid, file.size as i64));
    }

    debug!(count = files.len(), total_size, "waiting for uploads");
    queue.wait();

    for error in queue.errors() {
        if error.is_fatal() {
            return Err(HarnessError::Fatal(error.clone()));
        }
        warn!(%error, "ignoring non-fatal upload error");
    }

    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CWD_LOCK, FakeQueue};
    use lfs_api::TransferError;
    use lfs_testrepo::sha256_hex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::cell::RefCell;

    #[test]
    fn test_queue_sized_to_batch() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let seen = RefCell::new(None);
        let objects = upload_existing(10, &mut ChaCha20Rng::seed_from_u64(5), |count, size| {
            *seen.borrow_mut() = Some((count, size));
            Ok(FakeQueue::default())
        })
        .unwrap();

        let total: i64 = objects.iter().map(|o| o.size).sum();
        assert_eq!(*seen.borrow(), Some((10, total as u64)));
    }

    #[test]
    fn test_objects_are_real_content() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let added = RefCell::new(Vec::new());
        struct Recording<'a>(FakeQueue, &'a RefCell<Vec<(String, Vec<u8>)>>);
        impl TransferQueue for Recording<'_> {
            fn add(&mut self, object: Uploadable) {
                let content = std::fs::read(object.path()).unwrap();
                self.1.borrow_mut().push((object.oid().to_string(), content));
                self.0.add(object);
            }
            fn wait(&mut self) {
                self.0.wait();
            }
            fn errors(&self) -> &[TransferError] {
                self.0.errors()
            }
        }

        let objects = upload_existing(4, &mut ChaCha20Rng::seed_from_u64(5), |_, _| {
            Ok(Recording(FakeQueue::default(), &added))
        })
        .unwrap();

        let added = added.into_inner();
        assert_eq!(added.len(), 4);
        for (object, (oid, content)) in objects.iter().zip(&added) {
            assert_eq!(&object.oid, oid);
            assert_eq!(sha256_hex(content), object.oid);
            assert_eq!(content.len() as i64, object.size);
        }
    }

    #[test]
    fn test_fatal_error_aborts() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = std::env::current_dir().unwrap();
        let result = upload_existing(3, &mut ChaCha20Rng::seed_from_u64(5), |_, _| {
            Ok(FakeQueue::failing(vec![TransferError::Fatal {
                oid: "x".into(),
                message: "server down".into(),
            }]))
        });

        assert!(matches!(result, Err(HarnessError::Fatal(_))));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_object_errors_tolerated() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let objects = upload_existing(3, &mut ChaCha20Rng::seed_from_u64(5), |_, _| {
            Ok(FakeQueue::failing(vec![TransferError::Object {
                oid: "x".into(),
                code: 409,
                message: "already exists".into(),
            }]))
        })
        .unwrap();
        assert_eq!(objects.len(), 3);
    }

    #[test]
    fn test_queue_construction_failure_propagates() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let result = upload_existing::<_, FakeQueue, _>(
            3,
            &mut ChaCha20Rng::seed_from_u64(5),
            |_, _| {
                Err(ApiError::Runtime(std::io::Error::other("no threads")))
            },
        );
        assert!(matches!(result, Err(HarnessError::Setup(_))));
    }

    #[test]
    fn test_zero_objects() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let objects = upload_existing(0, &mut ChaCha20Rng::seed_from_u64(5), |count, size| {
            assert_eq!((count, size), (0, 0));
            Ok(FakeQueue::default())
        })
        .unwrap();
        assert!(objects.is_empty());
    }
}

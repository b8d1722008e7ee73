//! Sequential test runner.
//!
//! Every test gets the full fixture sets and runs to completion on the
//! calling thread before the next one starts; tests share server state, so
//! they never overlap. A failing test is reported and the run moves on.
//!
//! Report format, one line per test, name padded to [`LINE_LEN`] columns:
//!
//! ```text
//! Running 3 tests...
//! Test download: exists (batch)                                          OK
//! Test download: missing (batch)                                         FAILED
//! object 1f0e... returned code 200, expected 404
//! ```
//!
//! While a test runs its line ends in `...\r` so the result overwrites it.

use std::io::{self, Write};

use tracing::debug;

use crate::error::HarnessError;
use crate::fixture::FixtureSet;
use crate::testcase::{Registry, TestCase, TestResult};

/// Column width of the test name in the report.
pub const LINE_LEN: usize = 70;

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Truncate or pad `name` to exactly [`LINE_LEN`] characters.
pub fn status_line(name: &str) -> String {
    let truncated: String = name.chars().take(LINE_LEN).collect();
    format!("{truncated:<LINE_LEN$}")
}

/// Run one test and report it.
pub fn run_test<W: Write>(
    test: &TestCase,
    fixtures: &FixtureSet,
    out: &mut W,
) -> io::Result<TestResult> {
    let line = status_line(test.name());
    write!(out, "{line}...\r")?;
    out.flush()?;

    debug!(test = test.name(), "running");
    let result = test.run(fixtures.existing(), fixtures.missing());

    if result.passed {
        writeln!(out, "{line} OK")?;
    } else {
        writeln!(out, "{line} FAILED")?;
        writeln!(out, "{}", result.error.as_deref().unwrap_or("(no error message)"))?;
    }
    out.flush()?;
    Ok(result)
}

/// Run every registered test in order against `fixtures`.
pub fn run_tests<W: Write>(
    registry: &Registry,
    fixtures: &FixtureSet,
    out: &mut W,
) -> io::Result<RunSummary> {
    writeln!(out, "Running {} tests...", registry.len())?;

    let mut summary = RunSummary::default();
    for test in registry.iter() {
        if run_test(test, fixtures, out)?.passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
    }
    Ok(summary)
}

/// Build fixtures with `prepare`, then run the registry against them.
///
/// If `prepare` fails no test runs.
pub fn run_with_fixtures<W, P>(
    registry: &Registry,
    prepare: P,
    out: &mut W,
) -> Result<RunSummary, HarnessError>
where
    W: Write,
    P: FnOnce() -> Result<FixtureSet, HarnessError>,
{
    let fixtures = prepare()?;
    run_tests(registry, &fixtures, out).map_err(HarnessError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{TestObject, generate_fixtures};
    use crate::test_support::{CWD_LOCK, FakeQueue};
    use lfs_api::TransferError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn fixtures() -> FixtureSet {
        FixtureSet::new(
            vec![TestObject::new("e1", 10), TestObject::new("e2", 20)],
            vec![TestObject::new("m1", 30)],
        )
    }

    fn run(registry: &Registry) -> (RunSummary, String) {
        let mut out = Vec::new();
        let summary = run_tests(registry, &fixtures(), &mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    /// Final text of each report line, after carriage-return overwrites.
    fn final_lines(output: &str) -> Vec<String> {
        output
            .lines()
            .map(|l| l.rsplit('\r').next().unwrap_or(l).to_string())
            .collect()
    }

    #[test]
    fn test_status_line_width() {
        assert_eq!(status_line("short").len(), LINE_LEN);
        assert!(status_line("short").starts_with("short "));

        let long = "x".repeat(LINE_LEN + 30);
        assert_eq!(status_line(&long), "x".repeat(LINE_LEN));

        let exact = "y".repeat(LINE_LEN);
        assert_eq!(status_line(&exact), exact);

        let wide = "é".repeat(LINE_LEN + 1);
        assert_eq!(status_line(&wide).chars().count(), LINE_LEN);
    }

    #[test]
    fn test_failure_does_not_stop_run() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        for (name, pass) in [("first", true), ("second", false), ("third", true)] {
            let calls = calls.clone();
            registry.register(name, move |_, _| {
                calls.lock().unwrap().push(name);
                if pass {
                    TestResult::pass()
                } else {
                    TestResult::fail("second broke")
                }
            });
        }

        let (summary, output) = run(&registry);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(summary, RunSummary { passed: 2, failed: 1 });

        let lines = final_lines(&output);
        assert_eq!(lines[0], "Running 3 tests...");
        assert_eq!(lines[1], format!("{} OK", status_line("first")));
        assert_eq!(lines[2], format!("{} FAILED", status_line("second")));
        assert_eq!(lines[3], "second broke");
        assert_eq!(lines[4], format!("{} OK", status_line("third")));
        assert_eq!(lines.len(), 5);

        assert_eq!(output.matches(" FAILED\n").count(), 1);
        assert_eq!(output.matches(" OK\n").count(), 2);
    }

    #[test]
    fn test_progress_marker_precedes_result() {
        let mut registry = Registry::new();
        registry.register("only", |_, _| TestResult::pass());
        let (_, output) = run(&registry);
        let line = status_line("only");
        assert!(output.contains(&format!("{line}...\r{line} OK\n")));
    }

    #[test]
    fn test_every_test_sees_full_unchanged_fixtures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        for name in ["a", "b"] {
            let seen = seen.clone();
            registry.register(name, move |existing, missing| {
                seen.lock()
                    .unwrap()
                    .push((existing.to_vec(), missing.to_vec()));
                TestResult::pass()
            });
        }

        let fixtures = fixtures();
        let mut out = Vec::new();
        run_tests(&registry, &fixtures, &mut out).unwrap();
        run_tests(&registry, &fixtures, &mut out).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        for (existing, missing) in seen.iter() {
            assert_eq!(existing.as_slice(), fixtures.existing());
            assert_eq!(missing.as_slice(), fixtures.missing());
        }
    }

    #[test]
    fn test_empty_registry() {
        let (summary, output) = run(&Registry::new());
        assert_eq!(summary.total(), 0);
        assert!(summary.all_passed());
        assert_eq!(output, "Running 0 tests...\n");
    }

    #[test]
    fn test_fatal_setup_runs_nothing() {
        let _cwd = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let invocations = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        for name in ["a", "b", "c"] {
            let invocations = invocations.clone();
            registry.register(name, move |_, _| {
                invocations.fetch_add(1, Ordering::SeqCst);
                TestResult::pass()
            });
        }

        let mut out = Vec::new();
        let result = run_with_fixtures(
            &registry,
            || {
                generate_fixtures(5, &mut ChaCha20Rng::seed_from_u64(1), |_, _| {
                    Ok(FakeQueue::failing(vec![TransferError::Fatal {
                        oid: "abc".into(),
                        message: "connection refused".into(),
                    }]))
                })
            },
            &mut out,
        );

        assert!(matches!(result, Err(HarnessError::Fatal(_))));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert!(out.is_empty());
    }
}

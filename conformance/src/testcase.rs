//! Test cases and the registry that orders them.

use std::fmt;

use crate::fixture::TestObject;

/// Result of running a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if failed.
    pub error: Option<String>,
}

impl TestResult {
    /// Create a passing result.
    pub fn pass() -> Self {
        Self {
            passed: true,
            error: None,
        }
    }

    /// Create a failing result with an error message.
    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(msg.into()),
        }
    }
}

impl<E: fmt::Display> From<Result<(), E>> for TestResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::pass(),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

/// Signature of a test body: existing objects, missing objects.
pub type TestFn = dyn Fn(&[TestObject], &[TestObject]) -> TestResult + Send + Sync;

/// A named test.
pub struct TestCase {
    name: String,
    func: Box<TestFn>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[TestObject], &[TestObject]) -> TestResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, existing: &[TestObject], missing: &[TestObject]) -> TestResult {
        (self.func)(existing, missing)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// Tests in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    tests: Vec<TestCase>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a test. Tests run in the order they were registered.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[TestObject], &[TestObject]) -> TestResult + Send + Sync + 'static,
    {
        self.tests.push(TestCase::new(name, func));
        self
    }

    /// Keep only tests whose name contains `filter`.
    pub fn retain_matching(&mut self, filter: &str) {
        self.tests.retain(|t| t.name.contains(filter));
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TestCase> {
        self.tests.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.tests.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tests.iter().map(TestCase::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let mut registry = Registry::new();
        registry
            .register("b", |_, _| TestResult::pass())
            .register("a", |_, _| TestResult::pass())
            .register("c", |_, _| TestResult::pass());
        assert_eq!(registry.names(), vec!["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_retain_matching() {
        let mut registry = Registry::new();
        registry
            .register("Test upload: one", |_, _| TestResult::pass())
            .register("Test download: two", |_, _| TestResult::pass())
            .register("Test upload: three", |_, _| TestResult::pass());
        registry.retain_matching("upload");
        assert_eq!(registry.names(), vec!["Test upload: one", "Test upload: three"]);
    }

    #[test]
    fn test_case_receives_fixtures() {
        let case = TestCase::new("count", |existing, missing| {
            if existing.len() == 1 && missing.is_empty() {
                TestResult::pass()
            } else {
                TestResult::fail("wrong fixtures")
            }
        });
        assert!(case.run(&[TestObject::new("a", 1)], &[]).passed);
        assert!(!case.run(&[], &[]).passed);
    }

    #[test]
    fn test_result_from_result() {
        assert_eq!(TestResult::from(Ok::<(), String>(())), TestResult::pass());
        let failed = TestResult::from(Err::<(), _>("boom"));
        assert!(!failed.passed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}

//! Test runner (spec component 8 / spec.md §4.6).
//!
//! Aggregates tests, each carrying an ordered list of mocks, and
//! sequences `setup -> apply(mocks) -> body -> restore(mocks) ->
//! teardown` per test, serially. Grounded on `src/tapi.c` in the
//! original source (`tapi_setup_tests`/`add_test`/`run_tests`).
//!
//! Mocks are restored in the reverse of their apply order (last applied,
//! first restored) — one of two orderings the contract permits; see
//! SPEC_FULL.md's resolved open questions for why this one was picked.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::mock::Mock;

/// The outcome of running a single test's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

impl TestResult {
    fn console_word(self) -> &'static str {
        match self {
            TestResult::Passed => "passed",
            TestResult::Failed => "failed",
            TestResult::Skipped => "skipped",
        }
    }
}

type TestBody = Box<dyn FnMut() -> bool>;
type Hook = Box<dyn FnMut()>;

/// A single test: a body, optional setup/teardown hooks, and the mocks
/// to apply for its duration.
pub struct Test {
    name: String,
    function: TestBody,
    setup: Option<Hook>,
    teardown: Option<Hook>,
    mocks: Vec<Mock>,
    result: Option<TestResult>,
}

impl Test {
    /// `function` returning `true` marks the test passed; `false`, or a
    /// panic (e.g. from `assert!`), marks it failed.
    pub fn new(name: impl Into<String>, function: impl FnMut() -> bool + 'static) -> Test {
        Test {
            name: name.into(),
            function: Box::new(function),
            setup: None,
            teardown: None,
            mocks: Vec::new(),
            result: None,
        }
    }

    pub fn with_setup(mut self, setup: impl FnMut() + 'static) -> Test {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn with_teardown(mut self, teardown: impl FnMut() + 'static) -> Test {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Append a mock targeting `(caller, callee, replacement)`, applied
    /// for the duration of this test.
    ///
    /// # Safety
    ///
    /// See [`Mock::create`].
    pub unsafe fn add_mock(
        &mut self,
        caller: *const u8,
        callee: *const u8,
        replacement: *const u8,
    ) {
        self.mocks.push(unsafe { Mock::create(caller, callee, replacement) });
    }

    pub fn result(&self) -> Option<TestResult> {
        self.result
    }
}

/// Aggregates tests and runs them serially in insertion order.
#[derive(Default)]
pub struct Runner {
    tests: Vec<Test>,
}

impl Runner {
    pub fn new() -> Runner {
        Runner { tests: Vec::new() }
    }

    /// Seed the runner's test list, replacing whatever was there.
    pub fn setup_tests(&mut self, tests: Vec<Test>) {
        self.tests = tests;
    }

    pub fn add_test(&mut self, test: Test) {
        self.tests.push(test);
    }

    /// Run every test in order, printing the stable per-test and summary
    /// console lines, and returning the number passed.
    pub fn run_tests(&mut self) -> usize {
        let total = self.tests.len();
        let mut passed = 0usize;

        for test in self.tests.iter_mut() {
            let result = run_one(test);
            test.result = Some(result);
            if result == TestResult::Passed {
                passed += 1;
            }
            println!("[{passed}/{total}] tapi: {}, {}.", test.name, result.console_word());
        }

        println!("tapi; total tests passed: [{passed}/{total}].");
        passed
    }

    /// Drop every test, releasing any mocks still held.
    pub fn destroy_tests(&mut self) {
        self.tests.clear();
    }
}

fn run_one(test: &mut Test) -> TestResult {
    if let Some(setup) = test.setup.as_mut() {
        if catch_unwind(AssertUnwindSafe(|| setup())).is_err() {
            log::error!("tapi, runner; setup panicked for test '{}'; skipping", test.name);
            return TestResult::Skipped;
        }
    }

    for mock in test.mocks.iter_mut() {
        if let Err(e) = mock.apply() {
            log::error!("tapi, runner; mock apply failed for test '{}': {e}", test.name);
        }
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| (test.function)()));

    for mock in test.mocks.iter_mut().rev() {
        if let Err(e) = mock.restore() {
            log::error!("tapi, runner; mock restore failed for test '{}': {e}", test.name);
        }
    }

    if let Some(teardown) = test.teardown.as_mut() {
        if catch_unwind(AssertUnwindSafe(|| teardown())).is_err() {
            log::error!("tapi, runner; teardown panicked for test '{}'", test.name);
        }
    }

    match outcome {
        Ok(true) => TestResult::Passed,
        Ok(false) => TestResult::Failed,
        Err(_) => TestResult::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn sequences_setup_body_teardown_and_tallies_results() {
        let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));

        let l1 = log.clone();
        let l2 = log.clone();
        let l3 = log.clone();
        let test = Test::new("arithmetic", move || {
            l2.borrow_mut().push("body");
            2 + 2 == 4
        })
        .with_setup(move || l1.borrow_mut().push("setup"))
        .with_teardown(move || l3.borrow_mut().push("teardown"));

        let mut runner = Runner::new();
        runner.add_test(test);
        let passed = runner.run_tests();

        assert_eq!(passed, 1);
        assert_eq!(*log.borrow(), vec!["setup", "body", "teardown"]);
    }

    #[test]
    fn a_panicking_body_is_recorded_as_failed() {
        let test = Test::new("panics", || panic!("boom"));
        let mut runner = Runner::new();
        runner.add_test(test);
        assert_eq!(runner.run_tests(), 0);
    }
}

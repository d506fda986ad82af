//! Assertion context and the structured test report.
//!
//! Tests run inside a [`TestRun`] handed out by [`TestContext::section`].
//! Each call to [`TestRun::test`] records one test result made of named
//! checks; a failing check carries its human readable message into the
//! report. The finished [`Report`] serializes to YAML or JSON through
//! serde.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to the clause of a standards document a test enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationDetails {
    pub doc_name: String,
    pub section: String,
    pub command: String,
    pub command_count: u32,
}

impl SpecificationDetails {
    pub fn new(
        doc_name: impl Into<String>,
        section: impl Into<String>,
        command: impl Into<String>,
        command_count: u32,
    ) -> Self {
        Self {
            doc_name: doc_name.into(),
            section: section.into(),
            command: command.into(),
            command_count,
        }
    }
}

impl fmt::Display for SpecificationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.doc_name, self.section, self.command, self.command_count
        )
    }
}

/// One assertion: a boolean outcome paired with the message reported when
/// it is false.
#[derive(Debug, Clone)]
pub struct Check {
    pub(crate) pass: bool,
    pub(crate) fail_message: String,
}

impl Check {
    /// Assert that `pass` holds, reporting `fail_message` otherwise.
    pub fn expect(pass: bool, fail_message: impl Into<String>) -> Self {
        Self {
            pass,
            fail_message: fail_message.into(),
        }
    }

    /// Assert that two values are equal.
    pub fn expect_eq<T: PartialEq + fmt::Debug>(actual: T, expected: T) -> Self {
        Self {
            pass: actual == expected,
            fail_message: format!("expected {expected:?}, got {actual:?}"),
        }
    }

    /// Assert that a result is Ok.
    pub fn expect_ok<T, E: fmt::Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self {
                pass: true,
                fail_message: String::new(),
            },
            Err(e) => Self {
                pass: false,
                fail_message: format!("unexpected error: {e}"),
            },
        }
    }
}

/// Outcome of one check within a test result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Result of one test: its message and the outcome of each check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    pub message: String,
    pub checks: Vec<CheckResult>,
}

/// A batch of test results run under one header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestSection {
    pub header: String,
    pub tests: Vec<TestResult>,
    pub pass: bool,
    pub pass_count: usize,
    pub fail_count: usize,
}

/// A registered test that was never reached during the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedTest {
    pub test_key: String,
    pub desc: String,
}

/// The full structured report of a harness run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Conjunction of every executed test.
    pub test_pass: bool,
    pub tests: Vec<TestSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_tests: Vec<SkippedTest>,
}

/// Collects sections and skipped registrations into a [`Report`].
#[derive(Debug)]
pub struct TestContext {
    report: Report,
    global_pass: bool,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            report: Report::default(),
            global_pass: true,
        }
    }

    /// Run a batch of tests under a header. Sections that record no test
    /// results are dropped from the report.
    pub fn section(&mut self, header: impl Into<String>, body: impl FnOnce(&mut TestRun)) {
        let mut run = TestRun {
            section: TestSection {
                header: header.into(),
                tests: Vec::new(),
                pass: true,
                pass_count: 0,
                fail_count: 0,
            },
            last_pass: true,
        };

        body(&mut run);

        if run.section.fail_count != 0 {
            self.global_pass = false;
        }
        if !run.section.tests.is_empty() {
            self.report.tests.push(run.section);
        }
    }

    /// Record a registered test that was never visited.
    pub fn register_skipped_test(&mut self, key: impl Into<String>, desc: impl Into<String>) {
        self.report.skipped_tests.push(SkippedTest {
            test_key: key.into(),
            desc: desc.into(),
        });
    }

    /// Finish the run and produce the report.
    pub fn into_report(mut self) -> Report {
        self.report.test_pass = self.global_pass;
        self.report
    }
}

/// Assertion surface handed to test callbacks.
#[derive(Debug)]
pub struct TestRun {
    section: TestSection,
    last_pass: bool,
}

impl TestRun {
    /// Record one test made of the given checks.
    pub fn test(
        &mut self,
        message: impl Into<String>,
        detail: SpecificationDetails,
        checks: Vec<Check>,
    ) {
        self.last_pass = true;

        let mut result = TestResult {
            message: format!("{detail}: {}", message.into()),
            checks: Vec::with_capacity(checks.len()),
        };

        for check in checks {
            if check.pass {
                self.section.pass_count += 1;
                result.checks.push(CheckResult {
                    pass: true,
                    error_message: None,
                });
            } else {
                self.section.fail_count += 1;
                self.section.pass = false;
                self.last_pass = false;
                result.checks.push(CheckResult {
                    pass: false,
                    error_message: Some(check.fail_message),
                });
            }
        }

        self.section.tests.push(result);
    }

    /// Whether the most recent [`TestRun::test`] call passed.
    pub fn passed(&self) -> bool {
        self.last_pass
    }
}

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Possible states of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    NotRun,
    Running,
    Failed,
    Passed,
}

impl TestStatus {
    /// Maps the boolean reported by an execution unit onto a terminal status.
    pub fn from_outcome(passed: bool) -> Self {
        if passed {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Failed | TestStatus::Passed)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TestStatus::NotRun => "not run",
            TestStatus::Running => "running",
            TestStatus::Failed => "failed",
            TestStatus::Passed => "passed",
        };
        f.write_str(label)
    }
}

/// Errors raised by the test case lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestCaseError {
    #[error("test case name must not be empty")]
    EmptyName,

    #[error("test case `{name}` is already running")]
    AlreadyRunning { name: String },
}

/// What happened to a completion reported by an execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The run was still current; the test moved to the given status.
    Applied(TestStatus),
    /// The run was superseded by a reset or a newer start and the result was dropped.
    Stale,
}

/// Runtime state that is mutated while a test case executes.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionState {
    pub status: TestStatus,
    pub logs: Vec<String>,
    // bumped by every start and reset, captured by each Completion
    pub epoch: u64,
}

impl ExecutionState {
    pub fn new() -> Self {
        ExecutionState {
            status: TestStatus::NotRun,
            logs: Vec::new(),
            epoch: 0,
        }
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.status == TestStatus::Running
    }
}

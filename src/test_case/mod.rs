pub mod data;
pub mod keywords;
pub mod progress;

pub use data::*;
pub use keywords::substitute_keywords;
pub use progress::*;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// Listener notified whenever a test case changes status.
///
/// Called synchronously from the code path performing the transition, which
/// may be the thread an execution unit completes on. Implementations should
/// return quickly.
pub trait TestObserver<C>: Send + Sync {
    fn test_status_changed(&self, test: &TestCase<C>, status: TestStatus);
}

type Execution<C> = dyn Fn(&C, Completion<C>) + Send + Sync;

/// A named, re-runnable unit of test logic with a status and a log.
///
/// `TestCase` is a cheap handle; clones share the same status and log.
pub struct TestCase<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    name: String,
    execution: Box<Execution<C>>,
    state: Mutex<ExecutionState>,
    observer: Mutex<Option<Weak<dyn TestObserver<C>>>>,
}

impl<C> Clone for TestCase<C> {
    fn clone(&self) -> Self {
        TestCase {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> TestCase<C> {
    /// Creates a test case in the `NotRun` state with an empty log.
    ///
    /// The execution unit receives the context passed to [`TestCase::start`]
    /// and a [`Completion`] it must resolve exactly once, on every path,
    /// including its own internal failures. A unit that never resolves its
    /// completion leaves the test `Running` for good; this is not detected
    /// beyond a warning when the completion is dropped unresolved.
    pub fn new<F>(name: impl Into<String>, execution: F) -> Result<Self, TestCaseError>
    where
        F: Fn(&C, Completion<C>) + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(TestCaseError::EmptyName);
        }

        Ok(TestCase {
            inner: Arc::new(Inner {
                name,
                execution: Box::new(execution),
                state: Mutex::new(ExecutionState::new()),
                observer: Mutex::new(None),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn status(&self) -> TestStatus {
        self.state().status
    }

    /// Registers the status listener. Only a weak reference is kept.
    pub fn set_observer<O>(&self, observer: &Arc<O>)
    where
        O: TestObserver<C> + 'static,
    {
        let observer: Weak<O> = Arc::downgrade(observer);
        let observer: Weak<dyn TestObserver<C>> = observer;
        self.replace_observer(Some(observer));
    }

    pub fn clear_observer(&self) {
        self.replace_observer(None);
    }

    /// Installs `observer` and hands back the one it replaces.
    pub fn replace_observer(
        &self,
        observer: Option<Weak<dyn TestObserver<C>>>,
    ) -> Option<Weak<dyn TestObserver<C>>> {
        std::mem::replace(&mut *self.observer_slot(), observer)
    }

    /// Returns the test to `NotRun` and clears its log.
    ///
    /// A run that is still in flight is not stopped, but its completion and
    /// any log lines it reports through its [`Completion`] are discarded.
    pub fn reset(&self) {
        let mut state = self.state();
        state.status = TestStatus::NotRun;
        state.logs.clear();
        state.epoch += 1;
        debug!(test = %self.name(), epoch = state.epoch, "test reset");
    }

    /// Starts the execution unit with `ctx` and returns without waiting for it.
    ///
    /// The observer sees `Running` before the unit is invoked. Starting a test
    /// that is already running is rejected and leaves the in-flight run alone.
    pub fn start(&self, ctx: &C) -> Result<(), TestCaseError> {
        let epoch = {
            let mut state = self.state();
            if state.status == TestStatus::Running {
                return Err(TestCaseError::AlreadyRunning {
                    name: self.name().to_string(),
                });
            }
            state.status = TestStatus::Running;
            state.epoch += 1;
            state.epoch
        };
        debug!(test = %self.name(), epoch, "test started");
        self.notify(TestStatus::Running);

        let completion = Completion {
            test: self.clone(),
            epoch,
            resolved: false,
        };
        (self.inner.execution)(ctx, completion);
        Ok(())
    }

    /// Appends a line to the log. Any string is accepted, including an empty one.
    pub fn add_log(&self, text: impl Into<String>) {
        self.state().logs.push(text.into());
    }

    /// Appends a line only while the test is still running.
    ///
    /// The status check and the append happen under the same lock.
    pub fn add_log_if_running(&self, text: impl Into<String>) -> bool {
        let mut state = self.state();
        if state.status != TestStatus::Running {
            return false;
        }
        state.logs.push(text.into());
        true
    }

    /// Snapshot of the log in insertion order.
    pub fn get_logs(&self) -> Vec<String> {
        self.state().logs.clone()
    }

    fn add_log_for_run(&self, epoch: u64, text: String) -> bool {
        let mut state = self.state();
        if !state.is_current(epoch) {
            return false;
        }
        state.logs.push(text);
        true
    }

    fn finish(&self, epoch: u64, passed: bool) -> CompletionOutcome {
        let status = {
            let mut state = self.state();
            if !state.is_current(epoch) {
                debug!(
                    test = %self.name(),
                    epoch,
                    current = state.epoch,
                    "discarding stale completion"
                );
                return CompletionOutcome::Stale;
            }
            state.status = TestStatus::from_outcome(passed);
            state.status
        };
        debug!(test = %self.name(), epoch, %status, "test finished");
        self.notify(status);
        CompletionOutcome::Applied(status)
    }

    fn notify(&self, status: TestStatus) {
        // upgrade outside the state lock so observers may query the test
        let observer = self.observer_slot().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            observer.test_status_changed(self, status);
        }
    }

    fn state(&self) -> MutexGuard<'_, ExecutionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn observer_slot(&self) -> MutexGuard<'_, Option<Weak<dyn TestObserver<C>>>> {
        self.inner
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> fmt::Debug for TestCase<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("TestCase")
            .field("name", &self.inner.name)
            .field("status", &state.status)
            .field("logs", &state.logs)
            .finish()
    }
}

/// Handle through which an execution unit reports the result of one run.
///
/// Resolving consumes the handle, so a run can complete at most once. Log
/// lines added through the handle belong to its run and are dropped once the
/// test has been reset or restarted.
pub struct Completion<C> {
    test: TestCase<C>,
    epoch: u64,
    resolved: bool,
}

impl<C> Completion<C> {
    /// Whether this run is still the one the test is tracking.
    pub fn is_current(&self) -> bool {
        self.test.state().is_current(self.epoch)
    }

    /// Appends to the test log if this run is still current.
    pub fn add_log(&self, text: impl Into<String>) -> bool {
        self.test.add_log_for_run(self.epoch, text.into())
    }

    /// Reports the outcome of the run.
    pub fn complete(mut self, passed: bool) -> CompletionOutcome {
        self.resolved = true;
        self.test.finish(self.epoch, passed)
    }

    /// Logs `reason` and reports failure.
    pub fn fail(self, reason: impl Into<String>) -> CompletionOutcome {
        self.add_log(reason);
        self.complete(false)
    }
}

impl<C> Drop for Completion<C> {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(
                test = %self.test.name(),
                epoch = self.epoch,
                "completion dropped without a result, test stays running"
            );
        }
    }
}

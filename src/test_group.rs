/* Implements the notion of a test group.
    A test group is an ordered collection of related test cases.
    Tests run one at a time: each one is started and then awaited
    until it reports a result or the wait deadline passes.
*/

use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::test_case::{ProgressDisplay, TestCase, TestObserver, TestStatus};
use crate::test_events::{TestCaseBegin, TestCaseEnd, TestEvent, TestGroupBegin, TestGroupEnd};

/// How the runner classifies a test once it stops waiting for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    /// Still running when the wait deadline passed.
    Hung,
    /// The test could not be started.
    Skipped,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TestOutcome::Passed => "PASSED",
            TestOutcome::Failed => "FAILED",
            TestOutcome::Hung => "HUNG",
            TestOutcome::Skipped => "SKIPPED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub hung: usize,
    pub skipped: usize,
    pub exec_duration: Duration,
}

impl GroupStats {
    fn record(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Hung => self.hung += 1,
            TestOutcome::Skipped => self.skipped += 1,
        }
    }
}

struct StatusUpdate {
    index: usize,
    status: TestStatus,
}

/// Forwards status changes of one test into the group's channel, and on to
/// whichever observer the test had before the group took over.
struct StatusRelay<C> {
    index: usize,
    tx: Mutex<Sender<StatusUpdate>>,
    previous: Option<Weak<dyn TestObserver<C>>>,
}

impl<C> TestObserver<C> for StatusRelay<C> {
    fn test_status_changed(&self, test: &TestCase<C>, status: TestStatus) {
        debug!(test = %test.name(), %status, "status changed");
        {
            let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            // the group stopped listening, nothing left to tell
            let _ = tx.send(StatusUpdate {
                index: self.index,
                status,
            });
        }
        if let Some(previous) = self.previous.as_ref().and_then(Weak::upgrade) {
            previous.test_status_changed(test, status);
        }
    }
}

pub struct TestGroup<C> {
    name: String,
    test_cases: Vec<TestCase<C>>,
    stats: GroupStats,
}

impl<C: 'static> TestGroup<C> {
    pub fn new(name: impl Into<String>, test_cases: Vec<TestCase<C>>) -> Self {
        let stats = GroupStats {
            total: test_cases.len(),
            ..GroupStats::default()
        };
        TestGroup {
            name: name.into(),
            test_cases,
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test_cases(&self) -> &[TestCase<C>] {
        &self.test_cases
    }

    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    /// Keeps only the tests whose name satisfies `keep`.
    pub fn retain_tests<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.test_cases.retain(|test| keep(test.name()));
        self.stats.total = self.test_cases.len();
    }

    /// Runs every test in order against `ctx`, waiting at most `timeout` for each.
    ///
    /// While a test is awaited the group holds its observer slot; the
    /// observer registered beforehand keeps receiving every status change
    /// and is put back once the test is done with.
    pub fn run(
        &mut self,
        ctx: &C,
        timeout: Duration,
        run_id: Uuid,
        tx: &Sender<TestEvent>,
    ) -> &GroupStats {
        let _ = tx.send(TestEvent::EvtTestGroupBegin(TestGroupBegin {
            run_id,
            group_name: self.name.clone(),
            test_count: self.test_cases.len(),
        }));

        let started = Instant::now();
        let (status_tx, status_rx) = mpsc::channel();
        let mut stats = GroupStats {
            total: self.test_cases.len(),
            ..GroupStats::default()
        };

        for (index, test_case) in self.test_cases.iter().enumerate() {
            let outcome =
                self.run_test(index, test_case, ctx, timeout, &status_tx, &status_rx, run_id, tx);
            stats.record(outcome);
        }

        stats.exec_duration = started.elapsed();
        self.stats = stats;

        let _ = tx.send(TestEvent::EvtTestGroupEnd(TestGroupEnd {
            run_id,
            group_name: self.name.clone(),
            stats: self.stats.clone(),
        }));
        &self.stats
    }

    #[allow(clippy::too_many_arguments)]
    fn run_test(
        &self,
        index: usize,
        test_case: &TestCase<C>,
        ctx: &C,
        timeout: Duration,
        status_tx: &Sender<StatusUpdate>,
        status_rx: &Receiver<StatusUpdate>,
        run_id: Uuid,
        tx: &Sender<TestEvent>,
    ) -> TestOutcome {
        let _ = tx.send(TestEvent::EvtTestCaseBegin(TestCaseBegin {
            run_id,
            group_name: self.name.clone(),
            testcase_index: index,
            testcase_name: test_case.name().to_string(),
        }));

        let relay = Arc::new(StatusRelay {
            index,
            tx: Mutex::new(status_tx.clone()),
            previous: test_case.replace_observer(None),
        });
        test_case.set_observer(&relay);

        let started = Instant::now();
        test_case.reset();
        let outcome = match test_case.start(ctx) {
            Ok(()) => {
                let spinner = ProgressBar::new_spinner();
                ProgressDisplay::show_progress(test_case.name(), &spinner);
                let outcome = match await_outcome(status_rx, index, timeout) {
                    TestOutcome::Hung => settle_overdue(test_case, timeout),
                    outcome => outcome,
                };
                ProgressDisplay::stop_progress(&spinner);
                outcome
            }
            Err(e) => {
                warn!(test = %test_case.name(), "could not start test: {}", e);
                test_case.add_log(e.to_string());
                TestOutcome::Skipped
            }
        };

        test_case.replace_observer(relay.previous.clone());

        let _ = tx.send(TestEvent::EvtTestCaseEnd(TestCaseEnd {
            run_id,
            group_name: self.name.clone(),
            testcase_index: index,
            testcase_name: test_case.name().to_string(),
            exec_duration: started.elapsed(),
            status: test_case.status(),
            outcome,
            logs: test_case.get_logs(),
        }));
        outcome
    }
}

// Waits for the terminal status of the test at `index`, ignoring updates
// from earlier tests in the group that completed late.
fn await_outcome(rx: &Receiver<StatusUpdate>, index: usize, timeout: Duration) -> TestOutcome {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(update) if update.index == index => match update.status {
                TestStatus::Passed => return TestOutcome::Passed,
                TestStatus::Failed => return TestOutcome::Failed,
                TestStatus::NotRun | TestStatus::Running => continue,
            },
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return TestOutcome::Hung
            }
        }
    }
}

// Classifies a test whose deadline passed. The completion may still have
// landed after the wait gave up, in which case the test's own status wins.
fn settle_overdue<C>(test_case: &TestCase<C>, timeout: Duration) -> TestOutcome {
    let note = format!("test did not complete within {} ms", timeout.as_millis());
    if test_case.add_log_if_running(note) {
        warn!(test = %test_case.name(), ?timeout, "test did not complete in time");
        return TestOutcome::Hung;
    }

    match test_case.status() {
        TestStatus::Passed => TestOutcome::Passed,
        TestStatus::Failed => TestOutcome::Failed,
        TestStatus::NotRun | TestStatus::Running => TestOutcome::Hung,
    }
}

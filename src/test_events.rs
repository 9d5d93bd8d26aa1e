//
// Define test events.  Test events are fired by the runner
// whenever certain actions occur.  When a suite, a group or a
// single test begins or ends, an event is sent to whoever is
// listening on the channel (the console reporter, by default).
//
use std::time::Duration;
use uuid::Uuid;

use crate::test_case::TestStatus;
use crate::test_group::{GroupStats, TestOutcome};
use crate::test_suite::SuiteSummary;

#[derive(Debug)]
pub struct TestSuiteBegin {
    pub run_id: Uuid,
    pub suite_name: String,
    pub group_count: usize,
}

#[derive(Debug)]
pub struct TestSuiteEnd {
    pub exec_duration: Duration,
    pub run_id: Uuid,
    pub suite_name: String,
    pub summary: SuiteSummary,
}

#[derive(Debug)]
pub struct TestGroupBegin {
    pub run_id: Uuid,
    pub group_name: String,
    pub test_count: usize,
}

#[derive(Debug)]
pub struct TestGroupEnd {
    pub run_id: Uuid,
    pub group_name: String,
    pub stats: GroupStats,
}

#[derive(Debug)]
pub struct TestCaseBegin {
    pub run_id: Uuid,
    pub group_name: String,
    pub testcase_index: usize,
    pub testcase_name: String,
}

#[derive(Debug)]
pub struct TestCaseEnd {
    pub run_id: Uuid,
    pub group_name: String,
    pub testcase_index: usize,
    pub testcase_name: String,
    pub exec_duration: Duration,
    pub status: TestStatus,
    pub outcome: TestOutcome,
    pub logs: Vec<String>,
}

#[derive(Debug)]
pub enum TestEvent {
    EvtTestSuiteBegin(TestSuiteBegin),
    EvtTestSuiteEnd(TestSuiteEnd),
    EvtTestGroupBegin(TestGroupBegin),
    EvtTestGroupEnd(TestGroupEnd),
    EvtTestCaseBegin(TestCaseBegin),
    EvtTestCaseEnd(TestCaseEnd),
}

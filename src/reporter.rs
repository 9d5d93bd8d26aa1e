use colored::Colorize;
use std::sync::mpsc::Receiver;
use tracing::debug;

use crate::test_events::{TestCaseEnd, TestEvent};
use crate::test_group::{GroupStats, TestOutcome};
use crate::test_suite::SuiteSummary;

/// Prints test events to the console as they arrive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        ConsoleReporter { verbose }
    }

    /// Consumes events until every sender has been dropped.
    pub fn listen(self, events: Receiver<TestEvent>) {
        for event in events {
            self.handle(&event);
        }
    }

    pub fn handle(&self, event: &TestEvent) {
        match event {
            TestEvent::EvtTestSuiteBegin(begin) => {
                println!("{}", format!("Running suite '{}'", begin.suite_name).blue().bold());
                println!("======================");
            }
            TestEvent::EvtTestGroupBegin(begin) => {
                println!();
                println!(
                    "{}",
                    format!("Group '{}' ({} tests)", begin.group_name, begin.test_count).bold()
                );
            }
            TestEvent::EvtTestCaseBegin(begin) => {
                debug!(test = %begin.testcase_name, "test case began");
            }
            TestEvent::EvtTestCaseEnd(end) => {
                println!("{}", result_line(end));
                if self.verbose || end.outcome != TestOutcome::Passed {
                    for line in &end.logs {
                        println!("\t{}", line);
                    }
                }
            }
            TestEvent::EvtTestGroupEnd(end) => {
                println!("{}", group_stats_line(&end.group_name, &end.stats));
            }
            TestEvent::EvtTestSuiteEnd(end) => {
                println!("------------------------------");
                println!("{}", summary_line(&end.summary));
            }
        }
    }
}

fn outcome_label(outcome: TestOutcome) -> String {
    let label = format!("{:<8}", outcome.to_string());
    match outcome {
        TestOutcome::Passed => label.green().to_string(),
        TestOutcome::Failed => label.red().to_string(),
        TestOutcome::Hung => label.magenta().to_string(),
        TestOutcome::Skipped => label.yellow().to_string(),
    }
}

pub fn result_line(end: &TestCaseEnd) -> String {
    format!(
        "  [{}] {} ({:?}, {})",
        outcome_label(end.outcome),
        end.testcase_name,
        end.exec_duration,
        end.status
    )
}

pub fn group_stats_line(name: &str, stats: &GroupStats) -> String {
    format!(
        "Group Summary: {{ Name: {}, Total: {}, Passed: {}, Failed: {}, Hung: {}, Skipped: {} }}",
        name, stats.total, stats.passed, stats.failed, stats.hung, stats.skipped
    )
}

pub fn summary_line(summary: &SuiteSummary) -> String {
    let line = format!(
        "Summary: {{ Total: {}, Passed: {}, Failed: {}, Hung: {}, Skipped: {} }} in {:?}",
        summary.total,
        summary.passed,
        summary.failed,
        summary.hung,
        summary.skipped,
        summary.exec_duration
    );
    if summary.all_passed() {
        line.green().bold().to_string()
    } else {
        line.red().bold().to_string()
    }
}

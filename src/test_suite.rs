// test_suite.rs
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::test_events::{TestEvent, TestSuiteBegin, TestSuiteEnd};
use crate::test_group::{GroupStats, TestGroup};

/// Aggregate statistics over every group run by a suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub hung: usize,
    pub skipped: usize,
    pub exec_duration: Duration,
}

impl SuiteSummary {
    fn add(&mut self, stats: &GroupStats) {
        self.total += stats.total;
        self.passed += stats.passed;
        self.failed += stats.failed;
        self.hung += stats.hung;
        self.skipped += stats.skipped;
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.hung == 0 && self.skipped == 0
    }
}

pub struct TestSuite<C> {
    name: String,
    groups: Vec<TestGroup<C>>,
}

impl<C: 'static> TestSuite<C> {
    pub fn new(name: impl Into<String>, groups: Vec<TestGroup<C>>) -> Self {
        TestSuite {
            name: name.into(),
            groups,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[TestGroup<C>] {
        &self.groups
    }

    /// Drops the groups and tests not selected by the configuration.
    pub fn apply_filters(&mut self, config: &Config) {
        if let Some(selected) = &config.groups {
            self.groups
                .retain(|group| selected.iter().any(|name| name == group.name()));
        }

        if let Some(filter) = &config.test_filter {
            for group in &mut self.groups {
                group.retain_tests(|name| name.contains(filter.as_str()));
            }
            self.groups.retain(|group| !group.test_cases().is_empty());
        }
    }

    pub fn run(&mut self, ctx: &C, config: &Config, tx: &Sender<TestEvent>) -> SuiteSummary {
        let run_id = Uuid::new_v4();
        info!(suite = %self.name, %run_id, groups = self.groups.len(), "running test suite");

        let _ = tx.send(TestEvent::EvtTestSuiteBegin(TestSuiteBegin {
            run_id,
            suite_name: self.name.clone(),
            group_count: self.groups.len(),
        }));

        let started = Instant::now();
        let mut summary = SuiteSummary::default();
        for group in &mut self.groups {
            let stats = group.run(ctx, config.timeout(), run_id, tx);
            summary.add(stats);
        }
        summary.exec_duration = started.elapsed();

        let _ = tx.send(TestEvent::EvtTestSuiteEnd(TestSuiteEnd {
            exec_duration: summary.exec_duration,
            run_id,
            suite_name: self.name.clone(),
            summary: summary.clone(),
        }));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_case::{Completion, TestCase};
    use std::sync::mpsc;

    fn test_case(name: &str, passed: bool) -> TestCase<()> {
        TestCase::new(name, move |_: &(), done: Completion<()>| {
            done.complete(passed);
        })
        .unwrap()
    }

    fn sample_suite() -> TestSuite<()> {
        TestSuite::new(
            "sample",
            vec![
                TestGroup::new(
                    "insert",
                    vec![test_case("insert item", true), test_case("insert empty", true)],
                ),
                TestGroup::new(
                    "round-trip",
                    vec![test_case("lookup item", true), test_case("delete item", false)],
                ),
            ],
        )
    }

    #[test]
    fn test_summary_aggregates_groups() {
        let mut suite = sample_suite();
        let (tx, rx) = mpsc::channel();

        let summary = suite.run(&(), &Config::default(), &tx);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(TestEvent::EvtTestSuiteBegin(_))));
        assert!(matches!(events.last(), Some(TestEvent::EvtTestSuiteEnd(_))));
    }

    #[test]
    fn test_group_selection() {
        let mut suite = sample_suite();
        let config = Config {
            groups: Some(vec!["insert".to_string()]),
            ..Config::default()
        };
        suite.apply_filters(&config);
        assert_eq!(suite.groups().len(), 1);
        assert_eq!(suite.groups()[0].name(), "insert");

        let (tx, _rx) = mpsc::channel();
        assert!(suite.run(&(), &config, &tx).all_passed());
    }

    #[test]
    fn test_name_filter_drops_empty_groups() {
        let mut suite = sample_suite();
        let config = Config {
            test_filter: Some("lookup".to_string()),
            ..Config::default()
        };
        suite.apply_filters(&config);
        assert_eq!(suite.groups().len(), 1);
        assert_eq!(suite.groups()[0].test_cases()[0].name(), "lookup item");
    }
}

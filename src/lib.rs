pub mod config;
pub mod reporter;
pub mod test_case;
pub mod test_context;
pub mod test_events;
pub mod test_group;
pub mod test_suite;
pub mod todo_table;

use anyhow::Context;
use std::sync::mpsc;
use std::thread;

use crate::config::Config;
use crate::reporter::ConsoleReporter;
use crate::test_context::TestCtx;
use crate::test_suite::{SuiteSummary, TestSuite};

pub use crate::test_case::{
    Completion, CompletionOutcome, TestCase, TestCaseError, TestObserver, TestStatus,
};

fn selected_suite(config: &Config) -> anyhow::Result<TestSuite<TestCtx>> {
    let mut suite = todo_tests::builtin_suite().context("failed to build the to-do test suite")?;
    suite.apply_filters(config);
    Ok(suite)
}

/// Runs the selected tests, reporting to the console, and returns the summary.
pub fn exec(config: &Config) -> anyhow::Result<SuiteSummary> {
    let mut suite = selected_suite(config)?;
    if suite.groups().is_empty() {
        anyhow::bail!(
            "no tests in suite '{}' match the selected groups and filter",
            suite.name()
        );
    }

    let ctx = TestCtx::from_config(config);
    let (tx, rx) = mpsc::channel();
    let reporter = ConsoleReporter::new(config.verbose);
    let listener = thread::spawn(move || reporter.listen(rx));

    let summary = suite.run(&ctx, config, &tx);

    // closing the channel lets the reporter drain and exit
    drop(tx);
    listener
        .join()
        .map_err(|_| anyhow::anyhow!("reporter thread panicked"))?;

    Ok(summary)
}

/// Lists the groups and tests that `exec` would run.
pub fn list(config: &Config) -> anyhow::Result<Vec<(String, Vec<String>)>> {
    let suite = selected_suite(config)?;
    Ok(suite
        .groups()
        .iter()
        .map(|group| {
            let tests = group
                .test_cases()
                .iter()
                .map(|test| test.name().to_string())
                .collect();
            (group.name().to_string(), tests)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_honours_filters() {
        let config = Config {
            groups: Some(vec!["round-trip".to_string()]),
            test_filter: Some("lookup".to_string()),
            ..Config::default()
        };
        let listing = list(&config).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].0, "round-trip");
        assert_eq!(
            listing[0].1,
            vec!["insert then lookup".to_string(), "delete then lookup fails".to_string()]
        );
    }

    #[test]
    fn test_exec_rejects_empty_selection() {
        let config = Config {
            groups: Some(vec!["nonexistent".to_string()]),
            ..Config::default()
        };
        let err = exec(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no tests in suite 'todo quickstart' match the selected groups and filter"
        );
    }

    #[test]
    fn test_exec_runs_selected_group() {
        let config = Config {
            groups: Some(vec!["insert".to_string()]),
            ..Config::default()
        };
        let summary = exec(&config).unwrap();
        assert_eq!(summary.total, 3);
        assert!(summary.all_passed());
    }
}

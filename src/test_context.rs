use std::time::Duration;

use crate::config::Config;
use crate::todo_table::TodoTable;

// Context handed to every execution unit of the bundled suite.
// In future, more backends can be added here without changing the test signatures.
#[derive(Debug, Clone, Default)]
pub struct TestCtx {
    pub table: TodoTable,
}

impl TestCtx {
    pub fn new(latency: Duration) -> Self {
        TestCtx {
            table: TodoTable::new(latency),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.latency())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_has_empty_table() {
        let config = Config {
            latency_ms: 3,
            ..Config::default()
        };
        let ctx = TestCtx::from_config(&config);
        assert!(ctx.table.is_empty());
    }
}

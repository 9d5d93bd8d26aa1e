use indicatif::ProgressBar;
use std::time::Duration;

/// Utilities for displaying progress while a test is awaited.
pub struct ProgressDisplay;

impl ProgressDisplay {
    /// Shows a spinner with a message for the test being awaited.
    ///
    /// # Arguments
    ///
    /// * `test_name` - Name of the running test
    /// * `pb` - The progress bar instance
    ///
    /// # Returns
    ///
    /// Reference to the progress bar for chaining
    pub fn show_progress<'a>(test_name: &str, pb: &'a ProgressBar) -> &'a ProgressBar {
        pb.set_message(format!("Running {}...", test_name));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Stops the spinner and removes it, so the reporter output stays clean.
    pub fn stop_progress(pb: &ProgressBar) {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }
}

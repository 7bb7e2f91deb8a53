//! User-facing progress output.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Where the orchestrator sends messages meant for the person at the terminal.
pub trait ProgressReporter {
    fn step(&self, msg: &str);
    /// Start an indeterminate wait, replacing any wait already shown.
    fn start_wait(&self, msg: &str);
    fn finish_wait(&self);
    fn success(&self, msg: &str);
    fn failure(&self, msg: &str);
}

/// Prints steps to stdout and shows a spinner during waits.
#[derive(Default)]
pub struct TerminalReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

impl ProgressReporter for TerminalReporter {
    fn step(&self, msg: &str) {
        match self.spinner.lock().ok().and_then(|slot| slot.clone()) {
            Some(pb) => pb.println(msg),
            None => println!("{msg}"),
        }
    }

    fn start_wait(&self, msg: &str) {
        self.clear_spinner();
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner(msg));
        }
    }

    fn finish_wait(&self) {
        self.clear_spinner();
    }

    fn success(&self, msg: &str) {
        self.clear_spinner();
        println!("✓ {msg}");
    }

    fn failure(&self, msg: &str) {
        self.clear_spinner();
        eprintln!("✗ {msg}");
    }
}

/// Discards everything. Used by `--quiet` and in tests.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _: &str) {}
    fn start_wait(&self, _: &str) {}
    fn finish_wait(&self) {}
    fn success(&self, _: &str) {}
    fn failure(&self, _: &str) {}
}

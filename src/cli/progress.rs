use almatoolkit::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};

/// Progress bars on stderr for each bulk run, one at a time
pub struct CliProgress {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl CliProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:.cyan}/{len:.cyan} | ETA: {eta}")
            .expect("Invalid progress template")
            .progress_chars("█▓▒░ ")
    }
}

impl ProgressObserver for CliProgress {
    fn start(&self, description: &str, total: usize) {
        if self.hidden {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(description.to_string());
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self, completed: usize) {
        if let Some(bar) = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            bar.inc(completed as u64);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            bar.finish_and_clear();
        }
    }
}

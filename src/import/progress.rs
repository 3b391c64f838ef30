//! Progress reporting for stage submissions

use console::{style, Term};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const BAR_WIDTH: usize = 20;

/// Receives progress of a batch of submissions
pub trait Progress: Send + Sync {
    fn start(&self, label: &str, total: usize);
    fn tick(&self);
    fn finish(&self);
}

/// Discards all progress
#[derive(Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _label: &str, _total: usize) {}
    fn tick(&self) {}
    fn finish(&self) {}
}

/// Renders `  <label> saving [====      ]  40%` on stderr
pub struct ConsoleProgress {
    term: Term,
    label: Mutex<String>,
    total: AtomicUsize,
    done: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Mutex::new(String::new()),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }

    fn render(&self) {
        let label = self.label.lock().map(|l| l.clone()).unwrap_or_default();
        let line = render_bar(
            &label,
            self.done.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        );
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&line);
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn start(&self, label: &str, total: usize) {
        if let Ok(mut l) = self.label.lock() {
            *l = label.to_string();
        }
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        self.render();
    }

    fn tick(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.render();
    }

    fn finish(&self) {
        self.render();
        let _ = self.term.write_line("");
    }
}

fn render_bar(label: &str, done: usize, total: usize) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        (done.min(total) as f64) / (total as f64)
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!(
        "  {} saving [{}{}] {:>3}%",
        style(label).cyan(),
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        (ratio * 100.0).round() as usize
    )
}

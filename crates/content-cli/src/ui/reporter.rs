//! Terminal reporter
//!
//! Implements `content_core::Reporter` for an interactive terminal. Bundle
//! progress redraws a single line on stderr; everything else is a normal
//! line on stdout.

use super::progress::{format_percent, progress_bar};
use content_core::Reporter;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use std::io::Write;
use std::sync::Mutex;

const BAR_WIDTH: usize = 24;

/// Styled terminal output.
#[derive(Debug, Default)]
pub struct TerminalReporter {
    quiet: bool,
    // Whether a progress line is currently drawn on stderr.
    live: Mutex<bool>,
}

impl TerminalReporter {
    /// Reporter that prints everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that only prints warnings and errors.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            live: Mutex::new(false),
        }
    }

    fn clear_live(&self) {
        let mut live = self.live.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *live {
            let mut err = std::io::stderr();
            let _ = queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = err.flush();
            *live = false;
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        self.clear_live();
        println!("{text}");
    }
}

impl Reporter for TerminalReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            self.line(format!("\n{}", title.bold()));
        }
    }

    fn bundle_progress(&self, addon: &str, bundle: &str, percent: f32) {
        if self.quiet {
            return;
        }
        let mut live = self.live.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut err = std::io::stderr();
        let _ = queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = write!(
            err,
            "  {} {} {}",
            progress_bar(percent, BAR_WIDTH).cyan(),
            format_percent(percent),
            format!("{addon}/{bundle}").dim()
        );
        let _ = err.flush();
        *live = true;
    }

    fn bundle_done(&self, addon: &str, bundle: &str, detail: &str) {
        if !self.quiet {
            self.line(format!("  {} {addon}/{bundle} {}", "✓".green(), detail.dim()));
        }
    }

    fn bundle_failed(&self, addon: &str, bundle: &str, reason: &str) {
        self.clear_live();
        eprintln!("  {} {addon}/{bundle} {}", "✗".red(), reason.red());
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            self.line(msg);
        }
    }

    fn success(&self, msg: &str) {
        if !self.quiet {
            self.line(msg.green());
        }
    }

    fn warning(&self, msg: &str) {
        self.clear_live();
        eprintln!("{} {msg}", "warning:".yellow().bold());
    }

    fn error(&self, msg: &str) {
        self.clear_live();
        eprintln!("{} {msg}", "error:".red().bold());
    }
}

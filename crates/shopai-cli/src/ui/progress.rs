//! Spinner for slow CLI steps (model loading, embedding the catalog).
//!
//! Spinners draw on stderr and only when stderr is an interactive terminal,
//! so piped output and `--json` stay clean.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner tick characters (Braille-based).
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: animated spinner
    Interactive,
    /// Non-TTY or `--quiet`: no spinner
    Quiet,
    /// `--json`: no spinner and no trailing messages
    Silent,
}

impl ProgressMode {
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !std::io::stderr().is_terminal() {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// A spinner wrapping indicatif, hidden outside interactive mode.
pub struct Progress {
    bar: ProgressBar,
    mode: ProgressMode,
}

impl Progress {
    /// Start a spinner for an operation of unknown length.
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        if !mode.is_interactive() {
            return Self {
                bar: ProgressBar::hidden(),
                mode,
            };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(SPINNER_CHARS)
            .template("{spinner:.cyan} {msg} ({elapsed})")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar, mode }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Remove the spinner line.
    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Remove the spinner and print `message` in its place.
    ///
    /// Nothing is printed in silent mode.
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_and_clear();
        if self.mode != ProgressMode::Silent && !message.is_empty() {
            println!("{}", message);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.bar.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_always_silent() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, true), ProgressMode::Silent);
    }

    #[test]
    fn test_quiet_is_never_interactive() {
        assert!(!ProgressMode::detect(true, false).is_interactive());
    }

    #[test]
    fn test_hidden_spinner_finishes_quietly() {
        let progress = Progress::spinner("Loading", ProgressMode::Silent);
        progress.set_message("Still loading");
        progress.finish_with_message("");
        progress.finish_clear();
    }
}

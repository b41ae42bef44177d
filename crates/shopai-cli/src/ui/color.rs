//! Color mode detection for CLI output.
//!
//! Respects the `NO_COLOR` environment variable and TTY detection.
//! See https://no-color.org/ for the NO_COLOR standard.

use std::io::IsTerminal;

use clap::ValueEnum;

/// Color output mode, selected with `--color` or `SHOPAI_COLOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Always use colors, even when output is not a TTY.
    Always,
    /// Never use colors.
    Never,
    /// Colors when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
}

impl ColorMode {
    /// Check if colors should be used based on current mode.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

/// Current terminal width, 100 when it cannot be determined.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_mode_from_flag() {
        assert_eq!(ColorMode::from_str("always", true), Ok(ColorMode::Always));
        assert_eq!(ColorMode::from_str("NEVER", true), Ok(ColorMode::Never));
        assert_eq!(ColorMode::from_str("auto", true), Ok(ColorMode::Auto));
        assert!(ColorMode::from_str("sometimes", true).is_err());
    }

    #[test]
    fn test_explicit_modes() {
        assert!(ColorMode::Always.is_enabled());
        assert!(!ColorMode::Never.is_enabled());
    }
}

//! Message styling for CLI output.
//!
//! Provides consistent prefixes, colors, and formatting for all CLI messages.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use owo_colors::OwoColorize;

use shopai_core::Price;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Operation completed successfully
    Ok,
    /// Operation failed, cannot continue
    Err,
    /// Operation succeeded with caveats (degraded stages, stale index)
    Warn,
    /// Neutral status
    Info,
    /// Actionable next step
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
///
/// # Example
///
/// ```
/// use shopai_cli::ui::{Style, MessageType, ColorMode};
///
/// let style = Style::new(ColorMode::Never);
/// println!("{}", style.message(MessageType::Ok, "Index built"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a simple message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if !self.colors_enabled() {
            return format!("{} {}", prefix, text);
        }
        let colored_prefix = match msg_type {
            MessageType::Ok => prefix.green().to_string(),
            MessageType::Err => prefix.red().to_string(),
            MessageType::Warn => prefix.yellow().to_string(),
            MessageType::Info => prefix.blue().to_string(),
            MessageType::Hint => prefix.cyan().to_string(),
        };
        format!("{} {}", colored_prefix, text)
    }

    /// Detail line under a message, indented past the prefix.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// Section header such as `PRODUCTS`.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a structured error with optional cause and hint.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);

        if let Some(cause_text) = cause {
            output.push_str(&format!("\n      Cause: {}", cause_text));
        }
        if let Some(hint_text) = hint {
            output.push_str(&format!("\n      Hint: {}", hint_text));
        }

        output
    }

    /// Bulleted line, used for warnings and problem lists.
    pub fn bullet(&self, text: &str) -> String {
        format!("  • {}", text)
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Price with currency sign.
    pub fn price(&self, price: Price) -> String {
        let formatted = format!("¥{}", price);
        if self.colors_enabled() {
            formatted.yellow().to_string()
        } else {
            formatted
        }
    }

    /// Combined fusion score, colored against the fusion thresholds.
    ///
    /// - >= 0.7: green (strong)
    /// - >= 0.3: yellow (needs name evidence)
    /// - < 0.3: red
    pub fn score(&self, value: f32) -> String {
        let formatted = format!("{:.2}", value);
        if !self.colors_enabled() {
            return formatted;
        }
        if value >= 0.7 {
            formatted.green().to_string()
        } else if value >= 0.3 {
            formatted.yellow().to_string()
        } else {
            formatted.red().to_string()
        }
    }
}

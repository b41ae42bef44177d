//! # CLI UI Module
//!
//! Styling and formatting layer for `shopai` output.
//!
//! Human output is meant to be scanned: a prefix tells success from failure,
//! tables carry the products. Every command also has a `--json` form that
//! prints the core result types unchanged, and nothing decorative goes to
//! stdout in that mode.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Width-aware truncation and duration formatting
//! - `table`: Product, ranking and status tables with comfy-table
//! - `progress`: Spinner for model loading and index builds

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};

//! # shopai CLI
//!
//! Command-line interface for the shopping assistant.
//!
//! This binary provides human-friendly access to `shopai-core`: free-text
//! recommendations, cart suggestions, catalog listing and index management.
//! Run `shopai --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}

//! Command-line driver for the restocking engine.
//!
//! Reads the inventory and sales ledgers from JSON files and prints engine
//! output as JSON on stdout.

pub mod command;
pub mod json_source;

pub use command::{CliError, Command};
pub use json_source::JsonFileSource;

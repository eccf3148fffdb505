//! Process-wide logging setup for the restocking engine binaries.

pub mod subscriber;

pub use subscriber::{LogFormat, LogSettings};

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(&LogSettings::default());
}

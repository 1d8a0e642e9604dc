//! Project-specific utilities live here.

/// Formats a shared log prefix for module logs.
pub fn log_prefix(module: &str) -> String {
    format!("shelf::{module}")
}

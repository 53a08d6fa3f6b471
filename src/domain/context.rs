//! Error context extension trait
//!
//! Adds `.context()` / `.with_context()` to any result whose error converts into
//! [`QuarryError`], so library code can attach the table or object key it was
//! working on without switching to `anyhow`.
//!
//! # Examples
//!
//! ```rust
//! use quarry::domain::Result;
//! use quarry::domain::context::ResultExt;
//!
//! fn read_state(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::QuarryError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error, computing it only on failure
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<QuarryError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

/// Prefixes the message while keeping the variant, so callers can still match on
/// `NotFound` or `Storage` after context was added.
fn wrap(err: QuarryError, context: impl std::fmt::Display) -> QuarryError {
    match err {
        QuarryError::NotFound(msg) => QuarryError::NotFound(format!("{context}: {msg}")),
        QuarryError::Storage(msg) => QuarryError::Storage(format!("{context}: {msg}")),
        QuarryError::State(msg) => QuarryError::State(format!("{context}: {msg}")),
        QuarryError::Configuration(msg) => {
            QuarryError::Configuration(format!("{context}: {msg}"))
        }
        other => QuarryError::Other(format!("{context}: {other}")),
    }
}

//! Reporter trait for dependency injection
//!
//! Lets index builds report per-manifest progress without being coupled to
//! a specific terminal UI.

use std::path::Path;

pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Indexing manifests").
    fn section(&self, title: &str);

    /// A manifest was written to the index.
    fn indexed(&self, id: &str, version: &str, updated: bool);

    /// A manifest file was left out of the index.
    fn skipped(&self, path: &Path, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn indexed(&self, id: &str, version: &str, updated: bool) {
        (**self).indexed(id, version, updated);
    }
    fn skipped(&self, path: &Path, reason: &str) {
        (**self).skipped(path, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn indexed(&self, _: &str, _: &str, _: bool) {}
    fn skipped(&self, _: &Path, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}

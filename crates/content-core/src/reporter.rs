//! Reporter trait for dependency injection
//!
//! Build and mount logic report progress through this trait so they are not
//! coupled to a terminal. The CLI supplies a styled implementation; tests and
//! background tasks use [`NullReporter`].

/// Sink for user-facing build and mount progress.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Building", "Mounting").
    fn section(&self, title: &str);

    /// Updates the load progress of a bundle, in percent.
    fn bundle_progress(&self, addon: &str, bundle: &str, percent: f32);

    /// Marks a bundle as built or mounted.
    fn bundle_done(&self, addon: &str, bundle: &str, detail: &str);

    /// Marks a bundle as failed with a specific reason.
    fn bundle_failed(&self, addon: &str, bundle: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn bundle_progress(&self, addon: &str, bundle: &str, percent: f32) {
        (**self).bundle_progress(addon, bundle, percent);
    }
    fn bundle_done(&self, addon: &str, bundle: &str, detail: &str) {
        (**self).bundle_done(addon, bundle, detail);
    }
    fn bundle_failed(&self, addon: &str, bundle: &str, reason: &str) {
        (**self).bundle_failed(addon, bundle, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn bundle_progress(&self, _: &str, _: &str, _: f32) {}
    fn bundle_done(&self, _: &str, _: &str, _: &str) {}
    fn bundle_failed(&self, _: &str, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

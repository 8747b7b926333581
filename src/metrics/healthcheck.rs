use std::fmt;

use parking_lot::Mutex;

type CheckFn = dyn Fn() -> Result<(), String> + Send + Sync;

/// A health check whose value is computed on demand.
///
/// The exporter calls `check()` once per tick, then reads `error()`.
/// `None` means healthy.
pub struct Healthcheck {
    check: Box<CheckFn>,
    error: Mutex<Option<String>>,
}

impl Healthcheck {
    /// Wrap a check function. Any `Display` error is kept as its text.
    pub fn new<F, E>(check: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            check: Box::new(move || check().map_err(|e| e.to_string())),
            error: Mutex::new(None),
        }
    }

    /// Run the check function and store its outcome.
    pub fn check(&self) {
        let outcome = (self.check)();
        *self.error.lock() = outcome.err();
    }

    /// Last stored error, if any.
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    pub fn healthy(&self) {
        *self.error.lock() = None;
    }

    pub fn unhealthy(&self, err: impl fmt::Display) {
        *self.error.lock() = Some(err.to_string());
    }
}

impl fmt::Debug for Healthcheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Healthcheck")
            .field("error", &*self.error.lock())
            .finish_non_exhaustive()
    }
}

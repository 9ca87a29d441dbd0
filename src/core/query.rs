//! Queries as handed to the plugin by the launcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A query the user is typing
///
/// The launcher invalidates a query as soon as the input changes; handlers
/// check [`Query::is_valid`] and drop their work when it turns false.
#[derive(Debug, Clone)]
pub struct Query {
    string: String,
    trigger: String,
    valid: Arc<AtomicBool>,
}

impl Query {
    /// A query without trigger, as seen by global handlers
    pub fn new(string: impl Into<String>) -> Self {
        Self::with_trigger("", string)
    }

    /// A query addressed to a handler through its trigger prefix
    pub fn with_trigger(trigger: impl Into<String>, string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            trigger: trigger.into(),
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Query text without the trigger
    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// A handle that can invalidate this query from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            valid: Arc::clone(&self.valid),
        }
    }
}

/// Invalidates a [`Query`] from outside the handler
#[derive(Debug, Clone)]
pub struct CancelHandle {
    valid: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.valid.load(Ordering::Acquire)
    }
}

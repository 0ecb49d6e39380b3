//! Failure notification for the top-level context.
//!
//! Nested failures propagate as `Err` up to the outermost `run`, which hands
//! them to this channel instead of returning them to the caller.

use serde::Serialize;

use crate::error::{FailureKind, LoadError, ViolationReason};

/// A failed top-level load.
#[derive(Debug)]
pub struct LoadFailure {
    /// Identifier the top-level context was created for.
    pub entry: String,
    pub error: LoadError,
}

impl LoadFailure {
    pub fn new(entry: impl Into<String>, error: LoadError) -> Self {
        Self {
            entry: entry.into(),
            error,
        }
    }

    /// The identifier that failed; falls back to the entry for unit failures.
    pub fn identifier(&self) -> &str {
        self.error.identifier().unwrap_or(&self.entry)
    }

    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    pub fn report(&self) -> FailureReport {
        FailureReport {
            entry: self.entry.clone(),
            identifier: self.identifier().to_string(),
            kind: self.kind(),
            reason: match &self.error {
                LoadError::SecurityViolation { reason, .. } => Some(*reason),
                _ => None,
            },
            message: self.error.to_string(),
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loading '{}' failed: {}", self.entry, self.error)
    }
}

/// Serializable summary of a [`LoadFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub entry: String,
    pub identifier: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ViolationReason>,
    pub message: String,
}

type Listener = Box<dyn FnMut(&LoadFailure)>;

/// Error listeners plus the last delivered failure.
#[derive(Default)]
pub struct FailureChannel {
    listeners: Vec<Listener>,
    last: Option<LoadFailure>,
}

impl FailureChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error<F>(&mut self, listener: F)
    where
        F: FnMut(&LoadFailure) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to every listener in registration order. Without listeners the
    /// failure is logged so it never disappears silently.
    pub fn emit(&mut self, failure: LoadFailure) {
        if self.listeners.is_empty() {
            tracing::error!(
                entry = %failure.entry,
                identifier = %failure.identifier(),
                kind = failure.kind().as_str(),
                "unhandled load failure: {}",
                failure.error
            );
        }
        for listener in self.listeners.iter_mut() {
            listener(&failure);
        }
        self.last = Some(failure);
    }

    pub fn last(&self) -> Option<&LoadFailure> {
        self.last.as_ref()
    }

    pub fn take(&mut self) -> Option<LoadFailure> {
        self.last.take()
    }
}

impl std::fmt::Debug for FailureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureChannel")
            .field("listeners", &self.listeners.len())
            .field("last", &self.last)
            .finish()
    }
}

//! Errors raised while classifying, resolving and loading units.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a request was rejected by policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// The raw identifier is on the blacklist.
    Blacklisted,
    /// The request resolves outside the boundary root.
    OutsideRoot,
    /// `Middleware::is_safe` explicitly returned `false`.
    Middleware,
}

impl std::fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationReason::Blacklisted => write!(f, "blacklisted"),
            ViolationReason::OutsideRoot => write!(f, "outside root"),
            ViolationReason::Middleware => write!(f, "rejected by middleware"),
        }
    }
}

/// Failure kinds, used for reports and security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SecurityViolation,
    ResolutionFailure,
    CircularLoad,
    DepthExceeded,
    Unit,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SecurityViolation => "security_violation",
            FailureKind::ResolutionFailure => "resolution_failure",
            FailureKind::CircularLoad => "circular_load",
            FailureKind::DepthExceeded => "depth_exceeded",
            FailureKind::Unit => "unit",
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("you are not allowed to require the module: '{identifier}' ({reason})")]
    SecurityViolation {
        identifier: String,
        reason: ViolationReason,
    },

    #[error("cannot find module '{identifier}': {detail}")]
    ResolutionFailure { identifier: String, detail: String },

    #[error("circular load of '{}'", file.display())]
    CircularLoad { file: PathBuf },

    #[error("containment depth limit {limit} exceeded while loading '{identifier}'")]
    DepthExceeded { identifier: String, limit: usize },

    #[error("module '{}' failed: {source}", file.display())]
    Unit {
        file: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl LoadError {
    pub fn security(identifier: &str, reason: ViolationReason) -> Self {
        LoadError::SecurityViolation {
            identifier: identifier.to_string(),
            reason,
        }
    }

    pub fn unresolved(identifier: &str, detail: impl Into<String>) -> Self {
        LoadError::ResolutionFailure {
            identifier: identifier.to_string(),
            detail: detail.into(),
        }
    }

    /// Wrap a failure intrinsic to a unit's own code.
    pub fn unit(file: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        LoadError::Unit {
            file: file.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            LoadError::SecurityViolation { .. } => FailureKind::SecurityViolation,
            LoadError::ResolutionFailure { .. } => FailureKind::ResolutionFailure,
            LoadError::CircularLoad { .. } => FailureKind::CircularLoad,
            LoadError::DepthExceeded { .. } => FailureKind::DepthExceeded,
            LoadError::Unit { .. } => FailureKind::Unit,
        }
    }

    /// The requested identifier, for errors that carry one.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            LoadError::SecurityViolation { identifier, .. }
            | LoadError::ResolutionFailure { identifier, .. }
            | LoadError::DepthExceeded { identifier, .. } => Some(identifier),
            LoadError::CircularLoad { .. } | LoadError::Unit { .. } => None,
        }
    }

    pub fn is_security_violation(&self) -> bool {
        matches!(self, LoadError::SecurityViolation { .. })
    }
}

//! Policy evaluation for dependency requests.
//!
//! A request is classified into three facts (path-like, blacklisted, outside
//! root) and then decided: the default verdict is "unsafe when blacklisted or
//! outside root", and a definite answer from `Middleware::is_safe` replaces it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loadfence_core::path_validation::escapes_root;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{LoadError, ViolationReason};
use crate::host::{ModuleHost, ParentLink};
use crate::middleware::Middleware;

/// Facts about one request, as handed to `Middleware::is_safe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RequestInfo {
    pub is_outside_root: bool,
    pub is_blacklisted: bool,
    pub is_path_like: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub info: RequestInfo,
    /// Normalized absolute path for path-like requests.
    pub resolved: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// `overridden` is set when middleware answered instead of the default.
    Allow { overridden: bool },
    Reject { reason: ViolationReason },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// True when `identifier` names a file (relative or absolute) rather than a
/// bare external dependency.
pub fn is_path_like(identifier: &str) -> bool {
    if identifier == "." || identifier == ".." {
        return true;
    }
    if identifier.starts_with("./") || identifier.starts_with("../") || identifier.starts_with('/') {
        return true;
    }
    if cfg!(windows)
        && (identifier.starts_with(".\\") || identifier.starts_with("..\\") || identifier.starts_with('\\'))
    {
        return true;
    }
    Path::new(identifier).is_absolute()
}

/// State shared, unchanged, by every context in one containment tree.
///
/// Created once by the top-level context and handed to descendants behind an
/// `Arc`, so no descendant can widen or narrow the boundary.
pub struct Boundary<H: ModuleHost> {
    id: Uuid,
    entry: String,
    host: H,
    root: PathBuf,
    blacklist: BTreeSet<String>,
    middleware: Option<Arc<dyn Middleware<H>>>,
    max_depth: usize,
    /// Depth of the top-level parent link; nesting is counted from here.
    base_depth: usize,
}

impl<H: ModuleHost> Boundary<H> {
    pub(crate) fn new(
        entry: String,
        host: H,
        root: PathBuf,
        blacklist: BTreeSet<String>,
        middleware: Option<Arc<dyn Middleware<H>>>,
        max_depth: usize,
        base_depth: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry,
            host,
            root,
            blacklist,
            middleware,
            max_depth,
            base_depth,
        }
    }

    /// Correlates log lines and security events from one tree.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identifier the top-level context was created for.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn blacklist(&self) -> &BTreeSet<String> {
        &self.blacklist
    }

    pub fn middleware(&self) -> Option<&Arc<dyn Middleware<H>>> {
        self.middleware.as_ref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Nesting level of `link` below the top-level context's parent.
    pub fn nesting_depth(&self, link: &ParentLink) -> usize {
        link.depth().saturating_sub(self.base_depth)
    }

    /// Classify `identifier` as requested by the unit at `requester`.
    ///
    /// Bare names are opaque: they are never resolved here and never count as
    /// outside the root. Blacklist membership compares the raw string.
    pub fn classify(&self, identifier: &str, requester: &ParentLink) -> Classification {
        let is_path_like = is_path_like(identifier);
        let is_blacklisted = self.blacklist.contains(identifier);
        let resolved = is_path_like
            .then(|| self.host.normalize(&requester.base_dir().join(identifier)));
        let is_outside_root = resolved
            .as_deref()
            .map(|p| escapes_root(p, &self.root))
            .unwrap_or(false);
        Classification {
            info: RequestInfo {
                is_outside_root,
                is_blacklisted,
                is_path_like,
            },
            resolved,
        }
    }

    /// Apply the default verdict, then let `is_safe` override it.
    pub fn decide(&self, identifier: &str, info: &RequestInfo) -> Decision {
        let default = if info.is_blacklisted {
            Some(ViolationReason::Blacklisted)
        } else if info.is_outside_root {
            Some(ViolationReason::OutsideRoot)
        } else {
            None
        };
        let verdict = self
            .middleware
            .as_ref()
            .and_then(|m| m.is_safe(identifier, info));
        match (verdict, default) {
            (Some(true), _) => Decision::Allow {
                overridden: default.is_some(),
            },
            (Some(false), _) => Decision::Reject {
                reason: ViolationReason::Middleware,
            },
            (None, Some(reason)) => Decision::Reject { reason },
            (None, None) => Decision::Allow { overridden: false },
        }
    }

    /// Classify and decide; a rejection becomes `SecurityViolation` and is
    /// recorded as a security event. Nothing is loaded on rejection.
    pub fn enforce(
        &self,
        identifier: &str,
        requester: &ParentLink,
    ) -> Result<Classification, LoadError> {
        let classification = self.classify(identifier, requester);
        match self.decide(identifier, &classification.info) {
            Decision::Allow { overridden } => {
                tracing::debug!(
                    boundary_id = %self.id,
                    identifier = %identifier,
                    info = ?classification.info,
                    overridden,
                    "require allowed"
                );
                Ok(classification)
            }
            Decision::Reject { reason } => Err(self.reject(identifier, requester, reason)),
        }
    }

    /// Check the file a permitted request actually resolved to.
    ///
    /// A symlinked unit file inside the root can point outside it; the real
    /// location is decided as an outside-root request, so `is_safe` still
    /// gets the final word.
    pub fn enforce_resolved(
        &self,
        identifier: &str,
        requester: &ParentLink,
        file: &Path,
    ) -> Result<(), LoadError> {
        if !escapes_root(file, &self.root) {
            return Ok(());
        }
        let info = RequestInfo {
            is_outside_root: true,
            is_blacklisted: self.blacklist.contains(identifier),
            is_path_like: is_path_like(identifier),
        };
        match self.decide(identifier, &info) {
            Decision::Allow { .. } => Ok(()),
            Decision::Reject { reason } => {
                tracing::debug!(
                    identifier = %identifier,
                    file = %file.display(),
                    "resolved unit lies outside root"
                );
                Err(self.reject(identifier, requester, reason))
            }
        }
    }

    fn reject(&self, identifier: &str, requester: &ParentLink, reason: ViolationReason) -> LoadError {
        loadfence_core::observability::security_blocked_require(
            &self.id.to_string(),
            &self.entry,
            identifier,
            requester.file(),
            &reason.to_string(),
        );
        LoadError::security(identifier, reason)
    }
}

impl<H: ModuleHost> std::fmt::Debug for Boundary<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boundary")
            .field("id", &self.id)
            .field("entry", &self.entry)
            .field("host", &self.host.name())
            .field("root", &self.root)
            .field("blacklist", &self.blacklist)
            .field("middleware", &self.middleware.is_some())
            .field("max_depth", &self.max_depth)
            .field("base_depth", &self.base_depth)
            .finish()
    }
}

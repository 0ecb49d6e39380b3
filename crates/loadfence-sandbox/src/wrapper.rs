//! Recursive containment of path-like requests.
//!
//! Every nested context is built from the same `Arc<Boundary>`, so a unit
//! three levels deep is checked against exactly the root and blacklist of the
//! entry unit. This is the only recursion point.

use std::sync::Arc;

use crate::context::ContainmentContext;
use crate::error::LoadError;
use crate::host::{ModuleHost, ParentLink};
use crate::policy::Boundary;

/// Load `identifier` in a child context linked to `requester` and return its
/// produced value. Failures propagate to the caller unchanged.
pub fn wrap<H: ModuleHost>(
    boundary: &Arc<Boundary<H>>,
    identifier: &str,
    requester: &ParentLink,
) -> Result<H::Value, LoadError> {
    let span = tracing::debug_span!(
        "wrap",
        boundary_id = %boundary.id(),
        identifier = %identifier,
        depth = requester.depth()
    );
    let _enter = span.enter();
    let context = ContainmentContext::nested(Arc::clone(boundary), identifier, requester.clone())?;
    context.run_nested()
}

/// Handle given to `Middleware::require_override` for the current request.
pub struct WrapScope<'a, H: ModuleHost> {
    boundary: &'a Arc<Boundary<H>>,
    requester: &'a ParentLink,
}

impl<'a, H: ModuleHost> WrapScope<'a, H> {
    pub(crate) fn new(boundary: &'a Arc<Boundary<H>>, requester: &'a ParentLink) -> Self {
        Self {
            boundary,
            requester,
        }
    }

    /// Contain `identifier` as if the requesting unit had asked for it.
    ///
    /// The identifier itself is not checked by policy; everything it loads is.
    pub fn wrap(&self, identifier: &str) -> Result<H::Value, LoadError> {
        wrap(self.boundary, identifier, self.requester)
    }

    pub fn boundary(&self) -> &Arc<Boundary<H>> {
        self.boundary
    }

    /// Link of the unit that made the request.
    pub fn requester(&self) -> &ParentLink {
        self.requester
    }
}

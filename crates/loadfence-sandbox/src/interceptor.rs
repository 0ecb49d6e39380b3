//! The dependency-request function installed on every contained unit.

use std::sync::Arc;

use crate::error::LoadError;
use crate::host::{ModuleHost, ParentLink, RequireFn};
use crate::policy::Boundary;
use crate::wrapper::{self, WrapScope};

/// Intercepts each request a running unit makes.
///
/// Order per request: policy (reject fails with `SecurityViolation`), then
/// `require_override` short-circuit, then bare names go to the host's
/// uncontained request and path-like ones are re-contained.
pub struct RequireInterceptor<'a, H: ModuleHost> {
    boundary: &'a Arc<Boundary<H>>,
    requester: &'a ParentLink,
}

impl<'a, H: ModuleHost> RequireInterceptor<'a, H> {
    pub fn new(boundary: &'a Arc<Boundary<H>>, requester: &'a ParentLink) -> Self {
        Self {
            boundary,
            requester,
        }
    }
}

impl<H: ModuleHost> RequireFn<H::Value> for RequireInterceptor<'_, H> {
    fn require(&mut self, identifier: &str) -> Result<H::Value, LoadError> {
        let classification = self.boundary.enforce(identifier, self.requester)?;

        if let Some(middleware) = self.boundary.middleware() {
            let scope = WrapScope::new(self.boundary, self.requester);
            if let Some(value) = middleware.require_override(identifier, &scope)? {
                tracing::debug!(identifier = %identifier, "require overridden by middleware");
                return Ok(value);
            }
        }

        if !classification.info.is_path_like {
            tracing::trace!(
                identifier = %identifier,
                host = %self.boundary.host().name(),
                "delegating bare require to host"
            );
            return self
                .boundary
                .host()
                .require_unintercepted(identifier, self.requester);
        }

        wrapper::wrap(self.boundary, identifier, self.requester)
    }
}

//! Caller-supplied hooks evaluated synchronously during interception.
//!
//! Both hooks cross the containment boundary with arbitrary code, so their
//! contracts are typed:
//!
//! - `is_safe` returns `Some(true)` / `Some(false)` to replace the default
//!   verdict entirely, or `None` to keep it.
//! - `require_override` runs only for requests that passed policy. `Some(value)`
//!   short-circuits: no resolution and no recursive containment happen.

use crate::error::LoadError;
use crate::host::ModuleHost;
use crate::policy::RequestInfo;
use crate::wrapper::WrapScope;

pub trait Middleware<H: ModuleHost>: Send + Sync {
    fn is_safe(&self, _identifier: &str, _info: &RequestInfo) -> Option<bool> {
        None
    }

    /// `scope.wrap(..)` loads a substitute inside the same boundary.
    fn require_override(
        &self,
        _identifier: &str,
        _scope: &WrapScope<'_, H>,
    ) -> Result<Option<H::Value>, LoadError> {
        Ok(None)
    }
}

type IsSafeFn = dyn Fn(&str, &RequestInfo) -> Option<bool> + Send + Sync;
type OverrideFn<H> = dyn for<'s> Fn(&str, &WrapScope<'s, H>) -> Result<Option<<H as ModuleHost>::Value>, LoadError>
    + Send
    + Sync;

/// Closure-backed middleware; either hook may be left unset.
pub struct FnMiddleware<H: ModuleHost> {
    is_safe: Option<Box<IsSafeFn>>,
    require_override: Option<Box<OverrideFn<H>>>,
}

impl<H: ModuleHost> FnMiddleware<H> {
    pub fn new() -> Self {
        Self {
            is_safe: None,
            require_override: None,
        }
    }

    pub fn with_is_safe<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &RequestInfo) -> Option<bool> + Send + Sync + 'static,
    {
        self.is_safe = Some(Box::new(f));
        self
    }

    pub fn with_require_override<F>(mut self, f: F) -> Self
    where
        F: for<'s> Fn(&str, &WrapScope<'s, H>) -> Result<Option<H::Value>, LoadError>
            + Send
            + Sync
            + 'static,
    {
        self.require_override = Some(Box::new(f));
        self
    }
}

impl<H: ModuleHost> Default for FnMiddleware<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ModuleHost> Middleware<H> for FnMiddleware<H> {
    fn is_safe(&self, identifier: &str, info: &RequestInfo) -> Option<bool> {
        self.is_safe.as_ref().and_then(|f| f(identifier, info))
    }

    fn require_override(
        &self,
        identifier: &str,
        scope: &WrapScope<'_, H>,
    ) -> Result<Option<H::Value>, LoadError> {
        match &self.require_override {
            Some(f) => f(identifier, scope),
            None => Ok(None),
        }
    }
}

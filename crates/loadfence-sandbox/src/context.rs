//! Per-unit containment state and the load cycle.
//!
//! A top-level context is built with [`ContainmentContext::new`], which
//! resolves the entry and fixes the boundary for the whole tree. Nested
//! contexts only ever come from the recursive wrapper and share that boundary.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loadfence_core::config::schema::DEFAULT_MAX_DEPTH;
use loadfence_core::config::SandboxConfig;
use loadfence_core::path_validation::escapes_root;

use crate::error::LoadError;
use crate::failure::{FailureChannel, LoadFailure};
use crate::host::{LoaderUnit, ModuleHost, ParentLink};
use crate::info_log;
use crate::interceptor::RequireInterceptor;
use crate::middleware::Middleware;
use crate::policy::Boundary;

/// Construction options for a top-level context.
pub struct SandboxOptions<H: ModuleHost> {
    root: Option<PathBuf>,
    blacklist: Vec<String>,
    parent: Option<ParentLink>,
    middleware: Option<Arc<dyn Middleware<H>>>,
    max_depth: usize,
}

impl<H: ModuleHost> Default for SandboxOptions<H> {
    fn default() -> Self {
        Self {
            root: None,
            blacklist: Vec::new(),
            parent: None,
            middleware: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl<H: ModuleHost> SandboxOptions<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from environment-driven settings (`LOADFENCE_ROOT`, ...).
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            root: config.root.as_ref().map(PathBuf::from),
            blacklist: config.blacklist.clone(),
            max_depth: config.max_depth,
            ..Self::default()
        }
    }

    /// Boundary directory. Relative roots resolve against the parent's base
    /// directory. Defaults to the entry file's directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn blacklist<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(identifiers.into_iter().map(Into::into));
        self
    }

    /// Where the entry is resolved from. Defaults to the working directory.
    pub fn parent(mut self, parent: ParentLink) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<H> + 'static,
    {
        self.middleware = Some(Arc::new(middleware));
        self
    }

    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware<H>>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    /// Nesting limit, counted from the top-level parent link rather than the
    /// origin, so a non-origin `parent` does not use up the budget.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Succeeded,
    Failed,
}

/// One contained unit: its resolved file, its loader unit and, after a
/// successful run, its produced value.
pub struct ContainmentContext<H: ModuleHost> {
    boundary: Arc<Boundary<H>>,
    identifier: String,
    parent_link: ParentLink,
    /// Link the unit's own requests are made from.
    unit_link: ParentLink,
    entry_file: PathBuf,
    loader_unit: Option<Box<dyn LoaderUnit<H::Value>>>,
    produced_value: Option<H::Value>,
    failures: FailureChannel,
    state: RunState,
}

impl<H: ModuleHost> ContainmentContext<H> {
    /// Resolve `identifier` and fix the boundary for the whole tree.
    ///
    /// Fails with `ResolutionFailure` when the entry cannot be resolved.
    pub fn new(
        host: H,
        identifier: impl Into<String>,
        options: SandboxOptions<H>,
    ) -> Result<Self, LoadError> {
        let identifier = identifier.into();
        let SandboxOptions {
            root,
            blacklist,
            parent,
            middleware,
            max_depth,
        } = options;
        let parent = parent.unwrap_or_else(ParentLink::current_dir);
        let entry_file = host.normalize(&host.resolve(&identifier, &parent)?);
        let root = match root {
            Some(root) => host.normalize(&parent.base_dir().join(root)),
            None => entry_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| entry_file.clone()),
        };
        if escapes_root(&entry_file, &root) {
            tracing::warn!(
                entry_file = %entry_file.display(),
                root = %root.display(),
                "entry unit lies outside the containment root"
            );
        }
        let blacklist: BTreeSet<String> = blacklist.into_iter().collect();
        let boundary = Boundary::new(
            identifier.clone(),
            host,
            root,
            blacklist,
            middleware,
            max_depth,
            parent.depth(),
        );
        tracing::debug!(boundary = ?boundary, entry_file = %entry_file.display(), "boundary created");
        Self::with_boundary(Arc::new(boundary), identifier, parent, entry_file)
    }

    /// Child context for a path-like request made from `parent`.
    ///
    /// The resolved file is checked against the root as well, since the
    /// host may follow a symlink the requested path did not reveal.
    pub(crate) fn nested(
        boundary: Arc<Boundary<H>>,
        identifier: &str,
        parent: ParentLink,
    ) -> Result<Self, LoadError> {
        if boundary.nesting_depth(&parent) > boundary.max_depth() {
            return Err(LoadError::DepthExceeded {
                identifier: identifier.to_string(),
                limit: boundary.max_depth(),
            });
        }
        let host = boundary.host();
        let entry_file = host.normalize(&host.resolve(identifier, &parent)?);
        boundary.enforce_resolved(identifier, &parent, &entry_file)?;
        Self::with_boundary(boundary, identifier.to_string(), parent, entry_file)
    }

    fn with_boundary(
        boundary: Arc<Boundary<H>>,
        identifier: String,
        parent_link: ParentLink,
        entry_file: PathBuf,
    ) -> Result<Self, LoadError> {
        if parent_link.contains(&entry_file) {
            return Err(LoadError::CircularLoad { file: entry_file });
        }
        let unit_link = parent_link.child(entry_file.clone());
        Ok(Self {
            boundary,
            identifier,
            parent_link,
            unit_link,
            entry_file,
            loader_unit: None,
            produced_value: None,
            failures: FailureChannel::new(),
            state: RunState::Pending,
        })
    }

    /// Obtain the loader unit, install the interceptor and execute.
    fn execute(&mut self) -> Result<H::Value, LoadError> {
        let mut unit = self
            .boundary
            .host()
            .create_unit(&self.entry_file, &self.parent_link)?;
        let value = {
            let mut interceptor = RequireInterceptor::new(&self.boundary, &self.unit_link);
            unit.execute(&mut interceptor)?
        };
        self.loader_unit = Some(unit);
        Ok(value)
    }

    /// Nested load cycle: errors go straight back to the enclosing request.
    pub(crate) fn run_nested(mut self) -> Result<H::Value, LoadError> {
        let value = self.execute()?;
        tracing::debug!(
            identifier = %self.identifier,
            file = %self.entry_file.display(),
            "nested unit loaded"
        );
        Ok(value)
    }

    /// Run the load cycle once.
    ///
    /// This is the outermost boundary: any failure from this unit or anything
    /// it loaded is delivered to the error listeners rather than returned.
    /// Returns the produced value on success.
    pub fn run(&mut self) -> Option<&H::Value> {
        if self.state != RunState::Pending {
            tracing::warn!(entry = %self.identifier, state = ?self.state, "context already ran");
            return self.produced_value.as_ref();
        }
        match self.execute() {
            Ok(value) => {
                self.produced_value = Some(value);
                self.state = RunState::Succeeded;
                info_log!(
                    "loaded {} inside {}",
                    self.entry_file.display(),
                    self.boundary.root().display()
                );
            }
            Err(error) => {
                self.state = RunState::Failed;
                loadfence_core::observability::security_load_failed(
                    &self.boundary.id().to_string(),
                    &self.identifier,
                    error.kind().as_str(),
                    &error.to_string(),
                );
                self.failures.emit(LoadFailure::new(self.identifier.clone(), error));
            }
        }
        self.produced_value.as_ref()
    }

    /// Register an error listener; call before [`run`](Self::run).
    pub fn on_error<F>(&mut self, listener: F)
    where
        F: FnMut(&LoadFailure) + 'static,
    {
        self.failures.on_error(listener);
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failures.last()
    }

    pub fn take_failure(&mut self) -> Option<LoadFailure> {
        self.failures.take()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn entry_file(&self) -> &Path {
        &self.entry_file
    }

    pub fn parent_link(&self) -> &ParentLink {
        &self.parent_link
    }

    pub fn boundary(&self) -> &Arc<Boundary<H>> {
        &self.boundary
    }

    pub fn root(&self) -> &Path {
        self.boundary.root()
    }

    pub fn blacklist(&self) -> &BTreeSet<String> {
        self.boundary.blacklist()
    }

    pub fn loader_unit(&self) -> Option<&dyn LoaderUnit<H::Value>> {
        self.loader_unit.as_deref()
    }

    pub fn exports(&self) -> Option<&H::Value> {
        self.produced_value.as_ref()
    }

    pub fn into_exports(self) -> Option<H::Value> {
        self.produced_value
    }
}

impl<H: ModuleHost> std::fmt::Debug for ContainmentContext<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainmentContext")
            .field("identifier", &self.identifier)
            .field("entry_file", &self.entry_file)
            .field("root", &self.boundary.root())
            .field("state", &self.state)
            .finish()
    }
}

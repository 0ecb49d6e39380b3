//! Host loading capability: the seam between containment logic and whatever
//! actually resolves identifiers, builds units and executes them.
//!
//! Implement [`ModuleHost`] to contain a new loading mechanism. [`FsHost`] is
//! the default adapter, loading declarative manifests from the filesystem.

pub mod fs;

pub use fs::FsHost;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadError;

/// Dependency-request function handed to a unit while it executes.
///
/// The containment layer passes its interceptor here; hosts pass their own
/// uncontained implementation when loading trusted dependencies.
pub trait RequireFn<V> {
    fn require(&mut self, identifier: &str) -> Result<V, LoadError>;
}

/// One loadable unit, exclusively owned by the context that created it.
pub trait LoaderUnit<V> {
    /// Resolved file backing this unit.
    fn file(&self) -> &Path;

    /// Execute the unit, routing every nested request through `require`,
    /// and return its produced value.
    fn execute(&mut self, require: &mut dyn RequireFn<V>) -> Result<V, LoadError>;
}

/// Extension point for host loading facilities.
pub trait ModuleHost: Send + Sync + 'static {
    /// Value a unit produces when executed.
    type Value;

    /// Host name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Canonical form used for root and containment comparisons.
    fn normalize(&self, path: &Path) -> PathBuf {
        loadfence_core::path_validation::lexical_normalize(path)
    }

    /// Resolve `identifier` relative to `parent` to a unit file.
    /// Fails with [`LoadError::ResolutionFailure`] when nothing matches.
    fn resolve(&self, identifier: &str, parent: &ParentLink) -> Result<PathBuf, LoadError>;

    /// Build a unit for `file`, linked into the loading graph at `parent`.
    fn create_unit(
        &self,
        file: &Path,
        parent: &ParentLink,
    ) -> Result<Box<dyn LoaderUnit<Self::Value>>, LoadError>;

    /// The host's own, uncontained dependency request on behalf of `requester`.
    fn require_unintercepted(
        &self,
        identifier: &str,
        requester: &ParentLink,
    ) -> Result<Self::Value, LoadError>;
}

#[derive(Debug)]
enum Link {
    Origin { dir: PathBuf },
    Unit { file: PathBuf, parent: ParentLink },
}

/// Back-reference into the loading graph.
///
/// A chain of requesting unit files ending at an origin directory. Only used
/// to resolve identifiers; it never influences containment decisions.
#[derive(Debug, Clone)]
pub struct ParentLink {
    inner: Arc<Link>,
}

impl ParentLink {
    /// Origin anchored at `dir`; relative requests resolve against it.
    pub fn origin(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Link::Origin { dir: dir.into() }),
        }
    }

    /// Origin anchored at the process working directory.
    pub fn current_dir() -> Self {
        Self::origin(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Link for a unit loaded from `file` on behalf of `self`.
    pub fn child(&self, file: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Link::Unit {
                file: file.into(),
                parent: self.clone(),
            }),
        }
    }

    /// File of the unit this link points at; `None` for an origin.
    pub fn file(&self) -> Option<&Path> {
        match &*self.inner {
            Link::Origin { .. } => None,
            Link::Unit { file, .. } => Some(file),
        }
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        match &*self.inner {
            Link::Origin { .. } => None,
            Link::Unit { parent, .. } => Some(parent),
        }
    }

    /// Directory relative requests resolve against.
    pub fn base_dir(&self) -> &Path {
        match &*self.inner {
            Link::Origin { dir } => dir,
            Link::Unit { file, parent } => file.parent().unwrap_or_else(|| parent.base_dir()),
        }
    }

    /// Number of unit links above the origin.
    pub fn depth(&self) -> usize {
        self.files().count()
    }

    /// True when `file` already appears in this chain.
    pub fn contains(&self, file: &Path) -> bool {
        self.files().any(|f| f == file)
    }

    /// Unit files from this link up to the origin.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        let mut cursor = Some(self);
        std::iter::from_fn(move || {
            while let Some(link) = cursor {
                cursor = link.parent();
                if let Some(file) = link.file() {
                    return Some(file);
                }
            }
            None
        })
    }

    pub fn ptr_eq(&self, other: &ParentLink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_link_chain() {
        let origin = ParentLink::origin("/work");
        assert_eq!(origin.base_dir(), Path::new("/work"));
        assert_eq!(origin.depth(), 0);
        assert!(origin.file().is_none());

        let entry = origin.child("/app/index.json");
        let nested = entry.child("/app/lib/util.json");
        assert_eq!(nested.base_dir(), Path::new("/app/lib"));
        assert_eq!(nested.depth(), 2);
        assert!(nested.contains(Path::new("/app/index.json")));
        assert!(!nested.contains(Path::new("/app/other.json")));
        assert!(nested.parent().unwrap().ptr_eq(&entry));
        let files: Vec<&Path> = nested.files().collect();
        assert_eq!(files, vec![Path::new("/app/lib/util.json"), Path::new("/app/index.json")]);
    }
}

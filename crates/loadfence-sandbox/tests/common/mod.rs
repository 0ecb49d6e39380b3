//! In-memory host for driving containment trees without touching disk.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use loadfence_core::path_validation::lexical_normalize;
use loadfence_sandbox::{is_path_like, LoadError, LoaderUnit, ModuleHost, ParentLink, RequireFn};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default)]
pub struct MemModule {
    pub requires: Vec<String>,
    pub fail: Option<String>,
}

/// Everything the host was asked to do, in call order.
#[derive(Debug, Default)]
pub struct Calls {
    pub resolved: Vec<String>,
    /// `(unit file, file of the parent link it was created with)`
    pub created: Vec<(PathBuf, Option<PathBuf>)>,
    /// `(identifier, file of the requesting unit)`
    pub unintercepted: Vec<(String, Option<PathBuf>)>,
}

#[derive(Clone, Default)]
pub struct MemHost {
    modules: Arc<BTreeMap<PathBuf, MemModule>>,
    externals: Arc<BTreeMap<String, Value>>,
    calls: Arc<Mutex<Calls>>,
}

impl MemHost {
    pub fn builder() -> MemHostBuilder {
        MemHostBuilder::default()
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }

    pub fn created_files(&self) -> Vec<PathBuf> {
        self.calls().created.iter().map(|(f, _)| f.clone()).collect()
    }
}

#[derive(Default)]
pub struct MemHostBuilder {
    modules: BTreeMap<PathBuf, MemModule>,
    externals: BTreeMap<String, Value>,
}

impl MemHostBuilder {
    pub fn module(mut self, file: &str, requires: &[&str]) -> Self {
        self.modules.insert(
            PathBuf::from(file),
            MemModule {
                requires: requires.iter().map(|r| r.to_string()).collect(),
                fail: None,
            },
        );
        self
    }

    pub fn failing(mut self, file: &str, message: &str) -> Self {
        self.modules.insert(
            PathBuf::from(file),
            MemModule {
                requires: Vec::new(),
                fail: Some(message.to_string()),
            },
        );
        self
    }

    pub fn external(mut self, name: &str, value: Value) -> Self {
        self.externals.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> MemHost {
        MemHost {
            modules: Arc::new(self.modules),
            externals: Arc::new(self.externals),
            calls: Arc::default(),
        }
    }
}

impl ModuleHost for MemHost {
    type Value = Value;

    fn name(&self) -> &str {
        "memory"
    }

    fn resolve(&self, identifier: &str, parent: &ParentLink) -> Result<PathBuf, LoadError> {
        self.calls().resolved.push(identifier.to_string());
        if !is_path_like(identifier) {
            return Err(LoadError::unresolved(identifier, "external names have no file"));
        }
        let base = lexical_normalize(&parent.base_dir().join(identifier));
        let mut with_ext = base.clone().into_os_string();
        with_ext.push(".js");
        [base, PathBuf::from(with_ext)]
            .into_iter()
            .find(|candidate| self.modules.contains_key(candidate))
            .ok_or_else(|| LoadError::unresolved(identifier, "no such module"))
    }

    fn create_unit(
        &self,
        file: &Path,
        parent: &ParentLink,
    ) -> Result<Box<dyn LoaderUnit<Value>>, LoadError> {
        self.calls()
            .created
            .push((file.to_path_buf(), parent.file().map(Path::to_path_buf)));
        let module = self
            .modules
            .get(file)
            .cloned()
            .ok_or_else(|| LoadError::unresolved(&file.display().to_string(), "vanished"))?;
        Ok(Box::new(MemUnit {
            file: file.to_path_buf(),
            module,
        }))
    }

    fn require_unintercepted(
        &self,
        identifier: &str,
        requester: &ParentLink,
    ) -> Result<Value, LoadError> {
        self.calls().unintercepted.push((
            identifier.to_string(),
            requester.file().map(Path::to_path_buf),
        ));
        self.externals
            .get(identifier)
            .cloned()
            .ok_or_else(|| LoadError::unresolved(identifier, "unknown external"))
    }
}

/// Produces `{ "file": <path>, "deps": { <identifier>: <value>, .. } }`.
struct MemUnit {
    file: PathBuf,
    module: MemModule,
}

impl LoaderUnit<Value> for MemUnit {
    fn file(&self) -> &Path {
        &self.file
    }

    fn execute(&mut self, require: &mut dyn RequireFn<Value>) -> Result<Value, LoadError> {
        if let Some(message) = &self.module.fail {
            return Err(LoadError::unit(&self.file, anyhow::anyhow!(message.clone())));
        }
        let mut deps = Map::new();
        for identifier in &self.module.requires {
            deps.insert(identifier.clone(), require.require(identifier)?);
        }
        Ok(json!({ "file": self.file.display().to_string(), "deps": deps }))
    }
}

/// Origin at `/` so `./app/index` resolves to `/app/index.js`.
pub fn origin() -> ParentLink {
    ParentLink::origin("/")
}

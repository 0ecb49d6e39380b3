//! Default filesystem host.
//!
//! Units are declarative manifests (`.json`, `.yaml`, `.yml`):
//!
//! ```json
//! { "requires": ["./util", { "name": "db", "module": "store" }], "exports": { "name": "app" } }
//! ```
//!
//! Executing a unit requests each requirement in order and produces `exports`
//! with every binding name mapped to the value it received.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use loadfence_core::config::HostConfig;
use loadfence_core::path_validation::canonicalize_existing_prefix;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{LoaderUnit, ModuleHost, ParentLink, RequireFn};
use crate::error::LoadError;
use crate::policy::is_path_like;

/// A single requirement: either a bare identifier (bound under its own name)
/// or `{ name, module }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    Module(String),
    Named { name: String, module: String },
}

impl Requirement {
    pub fn binding(&self) -> &str {
        match self {
            Requirement::Module(module) => module,
            Requirement::Named { name, .. } => name,
        }
    }

    pub fn module(&self) -> &str {
        match self {
            Requirement::Module(module) | Requirement::Named { module, .. } => module,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
    #[serde(default)]
    pub requires: Vec<Requirement>,
    #[serde(default)]
    pub exports: Value,
}

impl UnitManifest {
    pub fn load(file: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(file).map_err(|e| LoadError::unit(file, e))?;
        let is_yaml = matches!(
            file.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| LoadError::unit(file, e))
        } else {
            serde_json::from_str(&content).map_err(|e| LoadError::unit(file, e))
        }
    }
}

/// A manifest loaded from disk.
#[derive(Debug)]
pub struct ManifestUnit {
    file: PathBuf,
    manifest: UnitManifest,
}

impl ManifestUnit {
    pub fn manifest(&self) -> &UnitManifest {
        &self.manifest
    }
}

impl LoaderUnit<Value> for ManifestUnit {
    fn file(&self) -> &Path {
        &self.file
    }

    fn execute(&mut self, require: &mut dyn RequireFn<Value>) -> Result<Value, LoadError> {
        let mut exports = self.manifest.exports.clone();
        if self.manifest.requires.is_empty() {
            return Ok(exports);
        }
        if exports.is_null() {
            exports = Value::Object(Map::new());
        }
        let Value::Object(ref mut bindings) = exports else {
            return Err(LoadError::unit(
                &self.file,
                anyhow::anyhow!("exports must be an object when requires are declared"),
            ));
        };
        for requirement in &self.manifest.requires {
            let value = require.require(requirement.module())?;
            bindings.insert(requirement.binding().to_string(), value);
        }
        Ok(exports)
    }
}

/// Filesystem-backed host with Node-style resolution.
///
/// Path-like identifiers resolve against the requester's directory; bare
/// names resolve to builtins first, then to each module path in order. Every
/// candidate is tried as-is, with each extension, then as `index` + extension.
#[derive(Debug, Clone)]
pub struct FsHost {
    extensions: Vec<String>,
    module_paths: Vec<PathBuf>,
    builtins: BTreeMap<String, Value>,
}

impl Default for FsHost {
    fn default() -> Self {
        Self::from_config(&HostConfig::default())
    }
}

impl FsHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            module_paths: config.module_paths.clone(),
            builtins: BTreeMap::new(),
        }
    }

    pub fn with_module_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.module_paths.push(dir.into());
        self
    }

    /// A bare name served from memory; it has no file and is never contained.
    pub fn with_builtin(mut self, name: impl Into<String>, value: Value) -> Self {
        self.builtins.insert(name.into(), value);
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn module_paths(&self) -> &[PathBuf] {
        &self.module_paths
    }

    pub fn builtins(&self) -> &BTreeMap<String, Value> {
        &self.builtins
    }

    fn probe(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        for ext in &self.extensions {
            let mut with_ext = candidate.as_os_str().to_owned();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        if candidate.is_dir() {
            for ext in &self.extensions {
                let index = candidate.join(format!("index{}", ext));
                if index.is_file() {
                    return Some(index);
                }
            }
        }
        None
    }
}

impl ModuleHost for FsHost {
    type Value = Value;

    fn name(&self) -> &str {
        "fs"
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        canonicalize_existing_prefix(path)
    }

    fn resolve(&self, identifier: &str, parent: &ParentLink) -> Result<PathBuf, LoadError> {
        if is_path_like(identifier) {
            let candidate = parent.base_dir().join(identifier);
            return self.probe(&candidate).ok_or_else(|| {
                LoadError::unresolved(identifier, format!("no unit at {}", candidate.display()))
            });
        }
        if self.builtins.contains_key(identifier) {
            return Err(LoadError::unresolved(identifier, "builtin has no backing file"));
        }
        for dir in &self.module_paths {
            if let Some(file) = self.probe(&dir.join(identifier)) {
                tracing::trace!(identifier = %identifier, file = %file.display(), "resolved from module path");
                return Ok(file);
            }
        }
        Err(LoadError::unresolved(
            identifier,
            format!("not found in {} module path(s)", self.module_paths.len()),
        ))
    }

    fn create_unit(
        &self,
        file: &Path,
        _parent: &ParentLink,
    ) -> Result<Box<dyn LoaderUnit<Value>>, LoadError> {
        let manifest = UnitManifest::load(file)?;
        Ok(Box::new(ManifestUnit {
            file: file.to_path_buf(),
            manifest,
        }))
    }

    fn require_unintercepted(
        &self,
        identifier: &str,
        requester: &ParentLink,
    ) -> Result<Value, LoadError> {
        if let Some(value) = self.builtins.get(identifier) {
            return Ok(value.clone());
        }
        let file = self.normalize(&self.resolve(identifier, requester)?);
        if requester.contains(&file) {
            return Err(LoadError::CircularLoad { file });
        }
        let link = requester.child(file.clone());
        let mut unit = self.create_unit(&file, requester)?;
        unit.execute(&mut DirectRequire {
            host: self,
            link: &link,
        })
    }
}

/// Uncontained request function used for trusted dependencies.
struct DirectRequire<'a> {
    host: &'a FsHost,
    link: &'a ParentLink,
}

impl RequireFn<Value> for DirectRequire<'_> {
    fn require(&mut self, identifier: &str) -> Result<Value, LoadError> {
        self.host.require_unintercepted(identifier, self.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContainmentContext, SandboxOptions};
    use crate::error::ViolationReason;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn app() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let app = tmp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        let app = app.canonicalize().unwrap();
        (tmp, app)
    }

    #[test]
    fn test_resolve_tries_extensions_then_index() {
        let (_tmp, app) = app();
        let util = write(&app, "util.json", "{}");
        let lib_index = write(&app, "lib/index.yaml", "exports: 1\n");
        let host = FsHost::new();
        let parent = ParentLink::origin(&app);
        assert_eq!(host.resolve("./util", &parent).unwrap(), util);
        assert_eq!(host.resolve("./util.json", &parent).unwrap(), util);
        assert_eq!(host.resolve("./lib", &parent).unwrap(), lib_index);
        assert!(matches!(
            host.resolve("./missing", &parent),
            Err(LoadError::ResolutionFailure { .. })
        ));
    }

    #[test]
    fn test_resolve_bare_name_from_module_paths() {
        let (tmp, _app) = app();
        let modules = tmp.path().join("modules");
        let store = write(&modules, "store/index.json", "{}");
        let host = FsHost::new().with_module_path(&modules);
        assert_eq!(
            host.resolve("store", &ParentLink::origin(tmp.path())).unwrap(),
            store
        );
        assert!(FsHost::new()
            .resolve("store", &ParentLink::origin(tmp.path()))
            .is_err());
    }

    #[test]
    fn test_manifest_accepts_both_requirement_forms() {
        let manifest: UnitManifest = serde_json::from_str(
            r#"{"requires": ["./a", {"name": "db", "module": "store"}], "exports": {"k": 1}}"#,
        )
        .unwrap();
        assert_eq!(manifest.requires[0].binding(), "./a");
        assert_eq!(manifest.requires[1].binding(), "db");
        assert_eq!(manifest.requires[1].module(), "store");
        assert!(serde_json::from_str::<UnitManifest>(r#"{"require": []}"#).is_err());
    }

    #[test]
    fn test_contained_tree_loads_from_disk() {
        let (_tmp, app) = app();
        write(
            &app,
            "index.json",
            r#"{"requires": [{"name": "util", "module": "./lib/util"}, "config"], "exports": {"name": "app"}}"#,
        );
        write(&app, "lib/util.yaml", "requires:\n  - name: helper\n    module: ./helper\nexports:\n  kind: util\n");
        write(&app, "lib/helper.json", r#"{"exports": "help"}"#);

        let host = FsHost::new().with_builtin("config", json!({"debug": false}));
        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(host, "./index", options).unwrap();
        assert_eq!(ctx.root(), app.as_path());
        let exports = ctx.run().cloned().unwrap();
        assert_eq!(
            exports,
            json!({
                "name": "app",
                "util": {"kind": "util", "helper": "help"},
                "config": {"debug": false}
            })
        );
    }

    #[test]
    fn test_nested_escape_is_rejected() {
        let (tmp, app) = app();
        write(tmp.path(), "secret.json", r#"{"exports": "token"}"#);
        write(&app, "index.json", r#"{"requires": ["./lib/leak"]}"#);
        write(&app, "lib/leak.json", r#"{"requires": ["../../secret"]}"#);

        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert!(ctx.run().is_none());
        let failure = ctx.failure().unwrap();
        assert!(matches!(
            failure.error,
            LoadError::SecurityViolation {
                reason: ViolationReason::OutsideRoot,
                ..
            }
        ));
        assert_eq!(failure.identifier(), "../../secret");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_cannot_escape_root() {
        let (tmp, app) = app();
        let outside = tmp.path().join("outside");
        write(&outside, "payload.json", r#"{"exports": "pwned"}"#);
        std::os::unix::fs::symlink(&outside, app.join("link")).unwrap();
        write(&app, "index.json", r#"{"requires": ["./link/payload"]}"#);

        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert!(ctx.run().is_none());
        assert!(ctx.failure().unwrap().error.is_security_violation());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_unit_file_cannot_escape_root() {
        let (tmp, app) = app();
        let outside = tmp.path().join("outside");
        let secret = write(&outside, "secret.json", r#"{"exports": "token"}"#);
        std::os::unix::fs::symlink(&secret, app.join("leak.json")).unwrap();
        write(&app, "index.json", r#"{"requires": ["./leak"]}"#);

        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert!(ctx.run().is_none());
        let failure = ctx.failure().unwrap();
        assert!(matches!(
            failure.error,
            LoadError::SecurityViolation {
                reason: ViolationReason::OutsideRoot,
                ..
            }
        ));
        assert_eq!(failure.identifier(), "./leak");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_index_file_cannot_escape_root() {
        let (tmp, app) = app();
        let outside = tmp.path().join("outside");
        let secret = write(&outside, "secret.json", r#"{"exports": "token"}"#);
        fs::create_dir_all(app.join("pkg")).unwrap();
        std::os::unix::fs::symlink(&secret, app.join("pkg/index.json")).unwrap();
        write(&app, "index.json", r#"{"requires": ["./pkg"]}"#);

        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert!(ctx.run().is_none());
        assert!(ctx.failure().unwrap().error.is_security_violation());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_unit_file_inside_root_loads() {
        let (_tmp, app) = app();
        let real = write(&app, "lib/real.json", r#"{"exports": "ok"}"#);
        std::os::unix::fs::symlink(&real, app.join("alias.json")).unwrap();
        write(&app, "index.json", r#"{"requires": ["./alias"]}"#);

        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert_eq!(ctx.run().cloned(), Some(json!({"./alias": "ok"})));
    }

    #[test]
    fn test_trusted_external_is_not_contained() {
        let (tmp, app) = app();
        let modules = tmp.path().join("modules");
        write(&modules, "vendor/shared.json", r#"{"exports": "shared"}"#);
        write(&modules, "vendor/index.json", r#"{"requires": [{"name": "s", "module": "./shared"}]}"#);
        write(&app, "index.json", r#"{"requires": ["vendor"]}"#);

        let host = FsHost::new().with_module_path(&modules);
        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(host, "./index", options).unwrap();
        assert_eq!(ctx.run().cloned(), Some(json!({"vendor": {"s": "shared"}})));
    }

    #[test]
    fn test_non_object_exports_with_requires_is_unit_failure() {
        let (_tmp, app) = app();
        write(&app, "index.json", r#"{"requires": ["./a"], "exports": 3}"#);
        write(&app, "a.json", "{}");
        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        assert!(ctx.run().is_none());
        assert!(matches!(ctx.failure().unwrap().error, LoadError::Unit { .. }));
    }

    #[test]
    fn test_malformed_manifest_is_unit_failure() {
        let (_tmp, app) = app();
        write(&app, "index.json", r#"{"requires": ["./broken"]}"#);
        write(&app, "broken.json", "{ not json");
        let options = SandboxOptions::new().parent(ParentLink::origin(&app));
        let mut ctx = ContainmentContext::new(FsHost::new(), "./index", options).unwrap();
        ctx.run();
        match &ctx.failure().unwrap().error {
            LoadError::Unit { file, .. } => assert!(file.ends_with("broken.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

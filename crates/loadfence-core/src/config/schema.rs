//! Configuration structs grouped by concern, loaded from the environment.

use super::env_keys::{host as host_keys, observability as obv_keys, sandbox as sandbox_keys};
use super::loader::{env_bool, env_list, env_optional, env_or};
use std::path::PathBuf;

/// Nesting limit applied when `LOADFENCE_MAX_DEPTH` is unset or invalid.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Manifest extensions tried by the filesystem host, in order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml"];

/// Containment boundary settings
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Boundary directory; `None` means the entry file's directory.
    pub root: Option<String>,
    pub blacklist: Vec<String>,
    pub max_depth: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: None,
            blacklist: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SandboxConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let max_depth = env_optional(sandbox_keys::LOADFENCE_MAX_DEPTH, &[])
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_MAX_DEPTH);
        Self {
            root: env_optional(sandbox_keys::LOADFENCE_ROOT, &[]),
            blacklist: env_list(sandbox_keys::LOADFENCE_BLACKLIST, &[], ','),
            max_depth,
        }
    }
}

/// Filesystem host settings
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub extensions: Vec<String>,
    pub module_paths: Vec<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            module_paths: Vec::new(),
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let mut extensions: Vec<String> = env_list(host_keys::LOADFENCE_EXTENSIONS, &[], ',')
            .into_iter()
            .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
            .collect();
        if extensions.is_empty() {
            extensions = Self::default().extensions;
        }
        let module_paths = env_optional(
            host_keys::LOADFENCE_MODULE_PATHS,
            host_keys::MODULE_PATHS_ALIASES,
        )
        .map(|raw| std::env::split_paths(&raw).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default();
        Self {
            extensions,
            module_paths,
        }
    }
}

/// Observability: quiet, log_level, log_json, security_events_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub security_events_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::LOADFENCE_QUIET, &[], false),
                log_level: env_or(
                    obv_keys::LOADFENCE_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "loadfence=info".to_string(),
                ),
                log_json: env_bool(obv_keys::LOADFENCE_LOG_JSON, &[], false),
                security_events_log: env_optional(obv_keys::LOADFENCE_SECURITY_EVENTS_LOG, &[]),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_config_defaults() {
        let cfg = SandboxConfig::default();
        assert!(cfg.root.is_none());
        assert!(cfg.blacklist.is_empty());
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_host_config_default_extensions() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.extensions, vec![".json", ".yaml", ".yml"]);
        assert!(cfg.module_paths.is_empty());
    }
}

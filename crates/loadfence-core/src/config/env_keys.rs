//! Environment variable keys and aliases.
//!
//! Primary variables use the `LOADFENCE_*` prefix.

/// Containment boundary
pub mod sandbox {
    pub const LOADFENCE_ROOT: &str = "LOADFENCE_ROOT";

    /// Comma separated identifiers, compared as raw strings.
    pub const LOADFENCE_BLACKLIST: &str = "LOADFENCE_BLACKLIST";

    pub const LOADFENCE_MAX_DEPTH: &str = "LOADFENCE_MAX_DEPTH";
}

/// Default filesystem host
pub mod host {
    /// Comma separated, e.g. ".json,.yaml"
    pub const LOADFENCE_EXTENSIONS: &str = "LOADFENCE_EXTENSIONS";

    /// Search directories for bare module names (platform path-list separator).
    pub const LOADFENCE_MODULE_PATHS: &str = "LOADFENCE_MODULE_PATHS";
    pub const MODULE_PATHS_ALIASES: &[&str] = &["NODE_PATH"];
}

/// Observability and logging
pub mod observability {
    pub const LOADFENCE_QUIET: &str = "LOADFENCE_QUIET";

    pub const LOADFENCE_LOG_LEVEL: &str = "LOADFENCE_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["RUST_LOG"];

    pub const LOADFENCE_LOG_JSON: &str = "LOADFENCE_LOG_JSON";

    pub const LOADFENCE_SECURITY_EVENTS_LOG: &str = "LOADFENCE_SECURITY_EVENTS_LOG";
}

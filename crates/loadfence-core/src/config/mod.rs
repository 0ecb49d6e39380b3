//! Unified configuration layer.
//!
//! Every environment variable read goes through this module; the rest of the
//! workspace consumes structured config instead of calling `std::env::var`.
//!
//! - `loader`: env_or, env_optional, env_bool, env_list helpers
//! - `schema`: SandboxConfig, HostConfig, ObservabilityConfig
//! - `env_keys`: key constants (with aliases)

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_list, env_optional, env_or, load_dotenv, load_dotenv_from_dir};
pub use schema::{HostConfig, ObservabilityConfig, SandboxConfig};

//! CLI command implementations.
//!
//!   run   - load an entry inside the boundary and print its exports
//!   check - classify and decide a single identifier, loading nothing

pub mod check;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use loadfence_core::config::SandboxConfig;
use loadfence_core::path_validation::canonical_root;
use loadfence_sandbox::{FsHost, ParentLink, SandboxOptions};

use crate::middleware::CliMiddleware;

/// Environment settings with command-line overrides applied on top.
pub(crate) fn sandbox_options(
    root: Option<String>,
    blacklist: Vec<String>,
    max_depth: Option<usize>,
    middleware: CliMiddleware,
) -> Result<(SandboxOptions<FsHost>, PathBuf)> {
    let config = SandboxConfig::from_env();
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let mut options = SandboxOptions::from_config(&config)
        .parent(ParentLink::origin(&cwd))
        .blacklist(blacklist);
    if let Some(root) = root {
        let root = canonical_root(&cwd.join(&root))
            .with_context(|| format!("--root {}", root))?;
        options = options.root(root);
    }
    if let Some(max_depth) = max_depth {
        options = options.max_depth(max_depth);
    }
    if !middleware.is_empty() {
        options = options.middleware(middleware);
    }
    Ok((options, cwd))
}

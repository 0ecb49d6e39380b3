//! `loadfence run`: contained load of an entry manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use loadfence_core::config::HostConfig;
use loadfence_sandbox::{ContainmentContext, FsHost};
use serde_json::json;

use crate::middleware::{parse_builtin, CliMiddleware};

pub struct RunRequest {
    pub entry: String,
    pub root: Option<String>,
    pub blacklist: Vec<String>,
    pub allow: Vec<String>,
    pub deny_prefix: Vec<String>,
    pub alias: Vec<String>,
    pub module_path: Vec<PathBuf>,
    pub builtin: Vec<String>,
    pub max_depth: Option<usize>,
    pub json: bool,
}

/// Returns the process exit code: 0 on success, 1 when the load failed.
pub fn run_entry(req: RunRequest) -> Result<i32> {
    let mut host = FsHost::from_config(&HostConfig::from_env());
    for dir in req.module_path {
        host = host.with_module_path(dir);
    }
    for raw in &req.builtin {
        let (name, value) = parse_builtin(raw)?;
        host = host.with_builtin(name, value);
    }

    let middleware = CliMiddleware::new(req.allow, req.deny_prefix, &req.alias)?;
    let (options, _cwd) =
        super::sandbox_options(req.root, req.blacklist, req.max_depth, middleware)?;

    let mut ctx = ContainmentContext::new(host, req.entry.as_str(), options)
        .with_context(|| format!("Failed to load entry '{}'", req.entry))?;
    ctx.on_error(|failure| {
        tracing::debug!(kind = failure.kind().as_str(), "load failure delivered to cli");
    });

    if let Some(exports) = ctx.run().cloned() {
        if req.json {
            let out = json!({
                "ok": true,
                "entry": req.entry,
                "entry_file": ctx.entry_file().display().to_string(),
                "root": ctx.root().display().to_string(),
                "exports": exports,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&exports)?);
        }
        return Ok(0);
    }

    let Some(failure) = ctx.take_failure() else {
        anyhow::bail!("load of '{}' produced neither a value nor a failure", req.entry);
    };
    if req.json {
        let out = json!({ "ok": false, "failure": failure.report() });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        eprintln!("{}", failure);
    }
    Ok(1)
}

//! `loadfence check`: policy verdict for one identifier.

use std::path::PathBuf;

use anyhow::{Context, Result};
use loadfence_sandbox::{ContainmentContext, Decision, FsHost, ModuleHost};
use serde_json::json;

use crate::middleware::CliMiddleware;

pub struct CheckRequest {
    pub entry: String,
    pub identifier: String,
    pub from: Option<PathBuf>,
    pub root: Option<String>,
    pub blacklist: Vec<String>,
    pub allow: Vec<String>,
    pub deny_prefix: Vec<String>,
    pub json: bool,
}

/// Returns the process exit code: 0 when allowed, 1 when rejected.
pub fn check_identifier(req: CheckRequest) -> Result<i32> {
    let middleware = CliMiddleware::new(req.allow, req.deny_prefix, &[])?;
    let (options, cwd) = super::sandbox_options(req.root, req.blacklist, None, middleware)?;
    let ctx = ContainmentContext::new(FsHost::new(), req.entry.as_str(), options)
        .with_context(|| format!("Failed to resolve entry '{}'", req.entry))?;

    let boundary = ctx.boundary();
    let requester_file = match &req.from {
        Some(from) => boundary.host().normalize(&cwd.join(from)),
        None => ctx.entry_file().to_path_buf(),
    };
    let requester = ctx.parent_link().child(requester_file.clone());
    let classification = boundary.classify(&req.identifier, &requester);
    let decision = boundary.decide(&req.identifier, &classification.info);

    if req.json {
        let out = json!({
            "identifier": req.identifier,
            "requester": requester_file.display().to_string(),
            "root": boundary.root().display().to_string(),
            "info": classification.info,
            "resolved": classification.resolved.as_ref().map(|p| p.display().to_string()),
            "decision": decision,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let info = &classification.info;
        println!("identifier:  {}", req.identifier);
        println!("requester:   {}", requester_file.display());
        println!("root:        {}", boundary.root().display());
        if let Some(resolved) = &classification.resolved {
            println!("resolved:    {}", resolved.display());
        }
        println!(
            "path-like: {}  blacklisted: {}  outside root: {}",
            info.is_path_like, info.is_blacklisted, info.is_outside_root
        );
        match decision {
            Decision::Allow { overridden: true } => println!("verdict:     allowed (override)"),
            Decision::Allow { overridden: false } => println!("verdict:     allowed"),
            Decision::Reject { reason } => println!("verdict:     rejected ({})", reason),
        }
    }

    Ok(if decision.is_allowed() { 0 } else { 1 })
}

//! Policy middleware assembled from command-line flags.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use loadfence_sandbox::{FsHost, LoadError, Middleware, RequestInfo, WrapScope};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct CliMiddleware {
    allow: BTreeSet<String>,
    deny_prefixes: Vec<String>,
    aliases: BTreeMap<String, String>,
}

impl CliMiddleware {
    pub fn new(allow: Vec<String>, deny_prefixes: Vec<String>, aliases: &[String]) -> Result<Self> {
        let aliases = aliases
            .iter()
            .map(|raw| parse_pair(raw, "--alias"))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            allow: allow.into_iter().collect(),
            deny_prefixes: deny_prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
            aliases,
        })
    }

    /// True when no flag was given and the middleware can be skipped.
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny_prefixes.is_empty() && self.aliases.is_empty()
    }
}

impl Middleware<FsHost> for CliMiddleware {
    fn is_safe(&self, identifier: &str, _info: &RequestInfo) -> Option<bool> {
        if self.allow.contains(identifier) {
            return Some(true);
        }
        if self.deny_prefixes.iter().any(|p| identifier.starts_with(p.as_str())) {
            return Some(false);
        }
        None
    }

    fn require_override(
        &self,
        identifier: &str,
        scope: &WrapScope<'_, FsHost>,
    ) -> Result<Option<Value>, LoadError> {
        match self.aliases.get(identifier) {
            Some(target) => {
                tracing::debug!(identifier = %identifier, target = %target, "alias substituted");
                scope.wrap(target).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Split `NAME=VALUE`; both sides must be non-empty.
pub fn parse_pair(raw: &str, flag: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("{} expects NAME=VALUE, got '{}'", flag, raw);
    };
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        bail!("{} expects NAME=VALUE, got '{}'", flag, raw);
    }
    Ok((name.to_string(), value.to_string()))
}

/// Parse `--builtin NAME=JSON` into a name and value.
pub fn parse_builtin(raw: &str) -> Result<(String, Value)> {
    let (name, json) = parse_pair(raw, "--builtin")?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("--builtin {}: value is not valid JSON", name))?;
    Ok((name, value))
}

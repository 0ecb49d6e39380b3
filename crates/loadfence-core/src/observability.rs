//! Observability: tracing init and security events.
//!
//! Uses config::ObservabilityConfig for LOADFENCE_QUIET, LOG_LEVEL, LOG_JSON
//! and SECURITY_EVENTS_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

static SECURITY_EVENTS_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call once at process startup.
/// When LOADFENCE_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "loadfence=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("loadfence=info"));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn get_security_events_path() -> Option<String> {
    {
        let guard = SECURITY_EVENTS_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env()
        .security_events_log
        .clone()?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = SECURITY_EVENTS_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Security event: a dependency request was rejected by policy
pub fn security_blocked_require(
    boundary_id: &str,
    entry: &str,
    identifier: &str,
    requester: Option<&Path>,
    reason: &str,
) {
    tracing::warn!(
        boundary_id = %boundary_id,
        entry = %entry,
        identifier = %identifier,
        requester = ?requester,
        reason = %reason,
        "Security: blocked require"
    );
    if let Some(path) = get_security_events_path() {
        let record = json!({
            "ts": timestamp(),
            "type": "require_blocked",
            "category": "containment",
            "boundary_id": boundary_id,
            "entry": entry,
            "details": {
                "identifier": identifier,
                "requester": requester.map(|p| p.display().to_string()),
                "reason": reason
            }
        });
        append_jsonl(&path, &record);
    }
}

/// Security event: the outermost load of a containment tree failed
pub fn security_load_failed(boundary_id: &str, entry: &str, kind: &str, message: &str) {
    if let Some(path) = get_security_events_path() {
        let record = json!({
            "ts": timestamp(),
            "type": "load_failed",
            "category": "containment",
            "boundary_id": boundary_id,
            "entry": entry,
            "details": {
                "kind": kind,
                "message": message
            }
        });
        append_jsonl(&path, &record);
    }
}

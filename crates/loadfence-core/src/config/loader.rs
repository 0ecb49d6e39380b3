//! Environment loading helpers.
//!
//! Fallback chains live here so call sites never repeat `or_else` ladders.

use std::env;
use std::path::Path;

/// Load `.env` from the current directory into the process environment.
/// Variables that are already set are never overridden. Runs at most once.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// Load `<dir>/.env` (non-overriding). Missing or unreadable files are ignored.
pub fn load_dotenv_from_dir(dir: &Path) {
    let path = dir.join(".env");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return;
    };
    let mut loaded = 0usize;
    for line in content.lines() {
        if let Some((key, value)) = parse_dotenv_line(line) {
            if env::var(key).is_err() {
                env::set_var(key, value);
                loaded += 1;
            }
        }
    }
    tracing::debug!(path = %path.display(), loaded, "loaded .env");
}

/// Parse one `.env` line into `(key, value)`.
///
/// Blank lines and `#` comments yield `None`. Inline comments are stripped
/// unless the value is quoted.
pub(crate) fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let mut value = line[eq_pos + 1..].trim();
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

/// Read the primary variable or the first set alias, else `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary variable or an alias; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: 0/false/no/off are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Split a variable on `separator`, trimming entries and dropping empty ones.
pub fn env_list(primary: &str, aliases: &[&str], separator: char) -> Vec<String> {
    env_optional(primary, aliases)
        .map(|raw| split_list(&raw, separator))
        .unwrap_or_default()
}

pub(crate) fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_line() {
        assert_eq!(parse_dotenv_line("A=1"), Some(("A", "1")));
        assert_eq!(parse_dotenv_line("  B = two  "), Some(("B", "two")));
        assert_eq!(parse_dotenv_line("C=\"quoted # kept\""), Some(("C", "quoted # kept")));
        assert_eq!(parse_dotenv_line("D=value # comment"), Some(("D", "value")));
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line(""), None);
        assert_eq!(parse_dotenv_line("=orphan"), None);
        assert_eq!(parse_dotenv_line("no_equals"), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("fs, net ,,child_process", ','), vec!["fs", "net", "child_process"]);
        assert!(split_list("  ", ',').is_empty());
    }

    #[test]
    fn test_env_helpers_fallback_to_alias() {
        env::set_var("LOADFENCE_TEST_ALIAS_ONLY", "from-alias");
        assert_eq!(
            env_optional("LOADFENCE_TEST_PRIMARY_UNSET", &["LOADFENCE_TEST_ALIAS_ONLY"]),
            Some("from-alias".to_string())
        );
        assert_eq!(
            env_or("LOADFENCE_TEST_PRIMARY_UNSET", &[], || "dflt".to_string()),
            "dflt"
        );
        env::remove_var("LOADFENCE_TEST_ALIAS_ONLY");
    }

    #[test]
    fn test_env_bool_and_list() {
        env::set_var("LOADFENCE_TEST_BOOL_OFF", "off");
        env::set_var("LOADFENCE_TEST_LIST", "fs,net");
        assert!(!env_bool("LOADFENCE_TEST_BOOL_OFF", &[], true));
        assert!(env_bool("LOADFENCE_TEST_BOOL_UNSET", &[], true));
        assert_eq!(env_list("LOADFENCE_TEST_LIST", &[], ','), vec!["fs", "net"]);
        env::remove_var("LOADFENCE_TEST_BOOL_OFF");
        env::remove_var("LOADFENCE_TEST_LIST");
    }

    #[test]
    fn test_load_dotenv_from_dir_does_not_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "LOADFENCE_TEST_DOTENV_NEW=loaded\nLOADFENCE_TEST_DOTENV_SET=from-file\n",
        )
        .unwrap();
        env::set_var("LOADFENCE_TEST_DOTENV_SET", "from-env");
        load_dotenv_from_dir(dir.path());
        assert_eq!(env::var("LOADFENCE_TEST_DOTENV_NEW").unwrap(), "loaded");
        assert_eq!(env::var("LOADFENCE_TEST_DOTENV_SET").unwrap(), "from-env");
        env::remove_var("LOADFENCE_TEST_DOTENV_NEW");
        env::remove_var("LOADFENCE_TEST_DOTENV_SET");
    }
}

//! Environment resolution across the four layered sources.
//!
//! Sources are gathered here (this is where the I/O lives) and merged by
//! `EnvironmentVariables::from_sources` left-to-right with first-writer-wins
//! semantics: CLI flags, then the shell environment allow-list, then the
//! `[config]` section of the user config file, then the library defaults.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::ports::Reporter;
use crate::domain::{EnvironmentVariables, OS_ENV_ALLOWLIST, RESERVED_PORT_PREFIX};
use crate::infra::library::Library;

/// Environment variable overriding the user config file location.
pub const CONFIG_PATH_ENV: &str = "QUARRY_CONFIG";

/// Default user config file: `~/.quarry/quarry.cfg`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quarry")
        .join("quarry.cfg")
}

/// Build the invocation's environment mapping.
///
/// `user_env` is already parsed (it is the highest-precedence source and
/// its parse errors must surface before anything else is touched). The
/// config file degrades to a warning on any malformation; the library
/// defaults are the one fatal condition in the chain.
///
/// # Errors
///
/// Returns a user error when the library defaults file is missing.
pub fn resolve_environment(
    user_env: Vec<(String, String)>,
    config_path: &Path,
    library: &Library,
    reporter: &dyn Reporter,
) -> Result<EnvironmentVariables> {
    let sources = vec![
        user_env,
        os_env(),
        config_file(config_path, reporter),
        library.defaults()?,
    ];
    Ok(EnvironmentVariables::from_sources(sources))
}

/// Copy the fixed allow-list plus any reserved-prefix port variable from
/// the shell environment.
fn os_env() -> Vec<(String, String)> {
    os_env_from(std::env::vars())
}

fn os_env_from(vars: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let mut allowed = Vec::new();
    let mut ports = Vec::new();
    for (key, value) in vars {
        if OS_ENV_ALLOWLIST.contains(&key.as_str()) {
            allowed.push((key, value));
        } else if key.starts_with(RESERVED_PORT_PREFIX) {
            ports.push((key, value));
        }
    }
    allowed.sort();
    ports.sort();
    allowed.extend(ports);
    allowed
}

/// Read the `[config]` section of the INI-style user config file. Missing
/// file means no source; a malformed file degrades to a warning and is
/// skipped — it never raises.
fn config_file(path: &Path, reporter: &dyn Reporter) -> Vec<(String, String)> {
    if !path.is_file() {
        return Vec::new();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            reporter.warn(&format!("cannot read {}: {e}; skipping", path.display()));
            return Vec::new();
        }
    };
    match parse_config_section(&content) {
        Ok(pairs) => pairs,
        Err(e) => {
            reporter.warn(&format!("malformed config {}: {e}; skipping", path.display()));
            Vec::new()
        }
    }
}

/// Parse the `[config]` section out of INI-style text. Other sections are
/// ignored; keys are uppercased; values may contain `=`.
fn parse_config_section(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    let mut in_config = false;
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[') {
            let Some(name) = section.strip_suffix(']') else {
                return Err(format!("line {}: unterminated section header", lineno + 1));
            };
            in_config = name.trim() == "config";
            continue;
        }
        if !in_config {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(format!("line {}: expected KEY=VALUE", lineno + 1));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("line {}: empty key", lineno + 1));
        }
        pairs.push((key.to_uppercase(), value.trim().to_string()));
    }
    Ok(pairs)
}

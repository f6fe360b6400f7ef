//! Path and settings resolution.
//!
//! Uses env vars when set, otherwise XDG defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Resolved location of the deployments registry.
#[derive(Debug, Clone)]
pub struct Paths {
    pub registry: PathBuf,
}

impl Paths {
    /// Resolve paths from environment, falling back to XDG/defaults.
    pub fn resolve() -> Self {
        let registry = resolve_path(
            "NEXUS_DEPLOYMENTS_PATH",
            dirs::config_dir().map(|p| p.join("nexus/deployments.json")),
            "~/.config/nexus/deployments.json",
        );

        Self { registry }
    }

    /// Registry file path.
    pub fn registry_path(&self) -> &Path {
        &self.registry
    }
}

/// Settings for outbound requests to deployments.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub access_token: Option<String>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            access_token: None,
        }
    }
}

impl ProbeSettings {
    pub fn from_env() -> Self {
        let access_token = std::env::var("NEXUS_ACCESS_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            timeout: resolve_secs("NEXUS_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            connect_timeout: resolve_secs(
                "NEXUS_HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
            access_token,
        }
    }
}

fn resolve_path(env_var: &str, xdg_default: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Ok(val) = std::env::var(env_var) {
        let trimmed = val.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }
    xdg_default.unwrap_or_else(|| expand_tilde(fallback))
}

fn resolve_secs(env_var: &str, default: u64) -> Duration {
    let secs = match std::env::var(env_var) {
        Ok(val) => parse_secs(&val).unwrap_or_else(|| {
            tracing::warn!("ignoring invalid {}={:?}, using {}s", env_var, val, default);
            default
        }),
        Err(_) => default,
    };
    Duration::from_secs(secs)
}

fn parse_secs(val: &str) -> Option<u64> {
    val.trim().parse::<u64>().ok().filter(|s| *s > 0)
}

fn expand_tilde(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secs_rejects_zero_and_garbage() {
        assert_eq!(parse_secs(" 7 "), Some(7));
        assert_eq!(parse_secs("0"), None);
        assert_eq!(parse_secs("soon"), None);
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(
            expand_tilde("/tmp/deployments.json"),
            PathBuf::from("/tmp/deployments.json")
        );
    }

    #[test]
    fn default_settings_have_finite_timeouts() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
        assert!(settings.access_token.is_none());
    }
}

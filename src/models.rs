//! Data structures for the deployments registry file.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid deployment name pattern"));

/// Returns true if `name` may be used as a deployment name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Strip trailing slashes from a base URL.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// One registered deployment, keyed by name in [`Registry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deployment {
    pub url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
}

impl Deployment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selected: false,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Registry file contents: deployment name to attributes, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    pub deployments: BTreeMap<String, Deployment>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Deployment> {
        self.deployments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deployments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Deployment)> {
        self.deployments.iter()
    }

    /// The selected deployment, if any.
    pub fn selected(&self) -> Option<(&str, &Deployment)> {
        self.deployments
            .iter()
            .find(|(_, d)| d.selected)
            .map(|(name, d)| (name.as_str(), d))
    }

    /// Check the registry invariants, reporting the first violation.
    pub fn check(&self) -> Result<(), InvalidRegistry> {
        let mut selected: Option<&str> = None;
        for (name, deployment) in &self.deployments {
            if !is_valid_name(name) {
                return Err(InvalidRegistry::BadName(name.clone()));
            }
            if deployment.url.is_empty() {
                return Err(InvalidRegistry::EmptyUrl(name.clone()));
            }
            if deployment.url.ends_with('/') {
                return Err(InvalidRegistry::TrailingSlash(name.clone()));
            }
            if deployment.selected {
                if let Some(other) = selected {
                    return Err(InvalidRegistry::SeveralSelected {
                        first: other.to_string(),
                        second: name.clone(),
                    });
                }
                selected = Some(name);
            }
        }
        Ok(())
    }
}

/// A registry invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRegistry {
    #[error("invalid deployment name '{0}'")]
    BadName(String),
    #[error("deployment '{0}' has an empty url")]
    EmptyUrl(String),
    #[error("deployment '{0}' url has a trailing slash")]
    TrailingSlash(String),
    #[error("deployments '{first}' and '{second}' are both selected")]
    SeveralSelected { first: String, second: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_pattern() {
        for ok in ["prod", "prod-eu.1", "a_b", "X", "..."] {
            assert!(is_valid_name(ok), "{ok} should be valid");
        }
        for bad in ["", "has space", "slash/name", "ünïcode", "semi;colon"] {
            assert!(!is_valid_name(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn normalize_strips_every_trailing_slash() {
        assert_eq!(normalize_url("http://x/"), "http://x");
        assert_eq!(normalize_url("http://x//"), "http://x");
        assert_eq!(normalize_url("http://x/api"), "http://x/api");
    }

    #[test]
    fn unselected_deployment_omits_flag() {
        let json = serde_json::to_string(&Deployment::new("http://x")).unwrap();
        assert_eq!(json, r#"{"url":"http://x"}"#);
    }

    #[test]
    fn check_rejects_two_selected() {
        let mut registry = Registry::new();
        for name in ["a", "b"] {
            registry.deployments.insert(
                name.to_string(),
                Deployment {
                    url: "http://x".to_string(),
                    selected: true,
                },
            );
        }
        assert_eq!(
            registry.check(),
            Err(InvalidRegistry::SeveralSelected {
                first: "a".to_string(),
                second: "b".to_string(),
            })
        );
    }

    #[test]
    fn check_rejects_bad_entries() {
        let mut registry = Registry::new();
        registry
            .deployments
            .insert("bad name".to_string(), Deployment::new("http://x"));
        assert_eq!(
            registry.check(),
            Err(InvalidRegistry::BadName("bad name".to_string()))
        );

        let mut registry = Registry::new();
        registry
            .deployments
            .insert("ok".to_string(), Deployment::new("http://x/"));
        assert_eq!(
            registry.check(),
            Err(InvalidRegistry::TrailingSlash("ok".to_string()))
        );

        let mut registry = Registry::new();
        registry
            .deployments
            .insert("ok".to_string(), Deployment::new(""));
        assert_eq!(
            registry.check(),
            Err(InvalidRegistry::EmptyUrl("ok".to_string()))
        );
    }
}

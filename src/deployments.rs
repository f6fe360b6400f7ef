//! Registry commands: add, remove, select, list.
//!
//! Each command loads the registry, applies one change, and saves it back in
//! full. Listing never writes.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigStore, StoreError};
use crate::models::{is_valid_name, normalize_url, Deployment, Registry};
use crate::probe::{EndpointProbe, ProbeError};

/// Register a new deployment after checking its data endpoint answers.
pub fn add(
    registry: &mut Registry,
    probe: &impl EndpointProbe,
    name: &str,
    url: &str,
) -> Result<(), RegistryError> {
    if !is_valid_name(name) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    let url = normalize_url(url);
    if url.is_empty() {
        return Err(RegistryError::MissingUrl);
    }
    if let Some(existing) = registry.get(name) {
        return Err(RegistryError::AlreadyExists {
            name: name.to_string(),
            url: existing.url.clone(),
        });
    }

    probe
        .validate(&url)
        .map_err(|source| RegistryError::Unreachable {
            url: url.clone(),
            source,
        })?;

    registry
        .deployments
        .insert(name.to_string(), Deployment::new(url));
    Ok(())
}

/// Remove a deployment. Removing the selected one leaves nothing selected.
pub fn remove(registry: &mut Registry, name: &str) -> Result<Deployment, RegistryError> {
    registry
        .deployments
        .remove(name)
        .ok_or_else(|| RegistryError::NotFound(name.to_string()))
}

/// Select a deployment, unselecting every other one.
/// Returns the names that were unselected.
pub fn select(registry: &mut Registry, name: &str) -> Result<Vec<String>, RegistryError> {
    if !registry.contains(name) {
        return Err(RegistryError::NotFound(name.to_string()));
    }

    let mut unselected = Vec::new();
    for (key, deployment) in registry.deployments.iter_mut() {
        if key == name {
            deployment.selected = true;
        } else if deployment.selected {
            deployment.selected = false;
            unselected.push(key.clone());
        }
    }
    Ok(unselected)
}

/// Which entities a count covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountScope {
    Public,
    Authenticated,
}

impl CountScope {
    pub fn label(self) -> &'static str {
        match self {
            CountScope::Public => "public",
            CountScope::Authenticated => "authenticated",
        }
    }
}

/// Entity count cell of a listing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCount {
    Total(u64),
    /// The probe failed; the failure is in [`Listing::errors`].
    Unavailable,
}

impl std::fmt::Display for EntityCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityCount::Total(n) => f.write_str(&format_count(*n)),
            EntityCount::Unavailable => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub name: String,
    pub selected: bool,
    pub url: String,
    pub count: Option<EntityCount>,
}

/// Rows for display plus the probe failures hit while counting.
#[derive(Debug, Default)]
pub struct Listing {
    pub count_scope: Option<CountScope>,
    pub rows: Vec<ListRow>,
    pub errors: Vec<(String, ProbeError)>,
}

impl Listing {
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            "Deployment".to_string(),
            "Selected".to_string(),
            "URL".to_string(),
        ];
        if let Some(scope) = self.count_scope {
            headers.push(format!("#entities ({})", scope.label()));
        }
        headers
    }
}

/// List deployments in name order, optionally with entity counts.
/// A failed count shows as `-` and is recorded in [`Listing::errors`].
pub fn list(
    registry: &Registry,
    probe: &impl EndpointProbe,
    count: bool,
    public_only: bool,
) -> Listing {
    let count_scope = count.then_some(if public_only {
        CountScope::Public
    } else {
        CountScope::Authenticated
    });
    let mut listing = Listing {
        count_scope,
        ..Listing::default()
    };

    for (name, deployment) in registry.iter() {
        let count = count_scope.map(|scope| {
            let authenticate = scope == CountScope::Authenticated;
            match probe.count_entities(&deployment.url, true, authenticate) {
                Ok(total) => EntityCount::Total(total),
                Err(e) => {
                    warn!("Counting entities of '{}' failed: {}", name, e);
                    listing.errors.push((name.clone(), e));
                    EntityCount::Unavailable
                }
            }
        });
        listing.rows.push(ListRow {
            name: name.clone(),
            selected: deployment.selected,
            url: deployment.url.clone(),
            count,
        });
    }

    listing
}

/// Format a count with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Operations requested by one invocation.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub add: Option<String>,
    pub remove: Option<String>,
    pub select: Option<String>,
    pub url: Option<String>,
    pub list: bool,
    pub count: bool,
    pub public_only: bool,
}

impl Request {
    /// Reject option combinations that cannot run, before anything is touched.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.add.is_some() && self.remove.is_some() {
            return Err(RegistryError::AddAndRemove);
        }
        if self.add.is_some() && self.url.is_none() {
            return Err(RegistryError::MissingUrl);
        }
        if self.remove.is_some() && self.url.is_some() {
            return Err(RegistryError::UrlWithRemove);
        }
        Ok(())
    }

    /// True when no operation was asked for (`--count` alone does nothing).
    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_none() && self.select.is_none() && !self.list
    }
}

/// What an invocation did, for the caller to print.
#[derive(Debug, Default)]
pub struct Outcome {
    pub added: Option<String>,
    pub removed: Option<String>,
    pub selected: Option<String>,
    pub unselected: Vec<String>,
    pub listing: Option<Listing>,
}

/// Run every requested operation in the order add, remove, select, list.
/// Each one loads and saves the registry on its own; the first error stops the
/// rest, and the error carries what had already been done.
pub fn run(
    request: &Request,
    store: &ConfigStore,
    probe: &impl EndpointProbe,
) -> Result<Outcome, RunError> {
    let mut outcome = Outcome::default();
    match run_steps(request, store, probe, &mut outcome) {
        Ok(()) => Ok(outcome),
        Err(error) => Err(RunError {
            completed: outcome,
            error,
        }),
    }
}

fn run_steps(
    request: &Request,
    store: &ConfigStore,
    probe: &impl EndpointProbe,
    outcome: &mut Outcome,
) -> Result<(), RegistryError> {
    request.validate()?;

    if let Some(name) = &request.add {
        let url = request.url.as_deref().unwrap_or_default();
        let mut registry = store.load()?;
        add(&mut registry, probe, name, url)?;
        store.save(&registry)?;
        info!("Added deployment '{}'", name);
        outcome.added = Some(name.clone());
    }

    if let Some(name) = &request.remove {
        let mut registry = store.load()?;
        remove(&mut registry, name)?;
        store.save(&registry)?;
        info!("Removed deployment '{}'", name);
        outcome.removed = Some(name.clone());
    }

    if let Some(name) = &request.select {
        let mut registry = store.load()?;
        outcome.unselected = select(&mut registry, name)?;
        store.save(&registry)?;
        info!("Selected deployment '{}'", name);
        outcome.selected = Some(name.clone());
    }

    if request.list {
        let registry = store.load()?;
        outcome.listing = Some(list(&registry, probe, request.count, request.public_only));
    }

    Ok(())
}

/// A failed [`run`], with the steps that completed before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
    pub completed: Outcome,
    #[source]
    pub error: RegistryError,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid deployment name '{0}' (allowed: letters, digits, '.', '-', '_')")]
    InvalidName(String),
    #[error("You must have a URL (--url) in order to add a deployment")]
    MissingUrl,
    #[error("You cannot add and remove on the same command line")]
    AddAndRemove,
    #[error("--remove doesn't take a URL")]
    UrlWithRemove,
    #[error("Deployment '{url}' did not validate: {source}")]
    Unreachable { url: String, source: ProbeError },
    #[error("This deployment already exists ({name}) with url: {url}")]
    AlreadyExists { name: String, url: String },
    #[error("Unknown deployment: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RegistryError {
    /// Broad class of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidName(_)
            | RegistryError::MissingUrl
            | RegistryError::AddAndRemove
            | RegistryError::UrlWithRemove
            | RegistryError::Unreachable { .. } => ErrorKind::Validation,
            RegistryError::AlreadyExists { .. } => ErrorKind::Conflict,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Storage,
}

//! nexus-deployments - local registry of Nexus deployments
//!
//! Adds, removes, selects, and lists named Nexus endpoints, probing their
//! data endpoint to validate them and to count entities.

pub mod config;
pub mod deployments;
pub mod logging;
pub mod models;
pub mod paths;
pub mod probe;

pub use config::{ConfigStore, StoreError};
pub use deployments::{
    add, format_count, list, remove, run, select, CountScope, EntityCount, ErrorKind, ListRow,
    Listing, Outcome, RegistryError, Request, RunError,
};
pub use models::{is_valid_name, normalize_url, Deployment, InvalidRegistry, Registry};
pub use paths::{Paths, ProbeSettings};
pub use probe::{data_url, DataPage, EndpointProbe, HttpProbe, ProbeError};

//! Error types for site discovery.
//!
//! Only [`DiscoveryError`] ever reaches callers. [`RegistryError`],
//! [`ProbeError`] and [`SkipReason`] describe per-registry and per-endpoint
//! failures that discovery logs and absorbs.

use grid_location::LocationError;
use std::time::Duration;
use url::Url;

/// Discovery of a federation failed as a whole.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiscoveryError {
    /// The federation has no registries to ask.
    #[error("Federation {federation} has no registries configured")]
    NoRegistries {
        /// The federation's grid location
        federation: String,
    },

    /// Every registry of the federation failed.
    #[error("None of the {} registries of {federation} could be reached", .failures.len())]
    Unreachable {
        /// The federation's grid location
        federation: String,
        /// Why each registry failed
        failures: Vec<RegistryFailure>,
    },
}

/// A registry that could not be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFailure {
    /// The registry that failed
    pub registry: Url,
    /// Why it failed
    pub reason: String,
}

/// A single registry query failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The registry could not be contacted.
    #[error("Registry unreachable: {0}")]
    Unreachable(String),

    /// The registry rejected the query (e.g. authentication).
    #[error("Registry refused the query: {0}")]
    Refused(String),

    /// The registry answered with something that is not an endpoint list.
    #[error("Malformed registry response: {0}")]
    MalformedResponse(String),
}

/// A liveness probe failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The endpoint rejected our identity.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The endpoint could not be contacted.
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with something unexpected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Why a candidate endpoint did not become a site.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SkipReason {
    /// The liveness probe failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The liveness probe did not finish in time.
    #[error("Liveness probe timed out after {0:?}")]
    Timeout(Duration),

    /// No site location could be derived for the endpoint.
    #[error("No site location for endpoint: {0}")]
    Location(#[from] LocationError),
}

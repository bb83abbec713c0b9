//! Discovery of live grid sites behind federation registries.
//!
//! A [`Federation`] is a grid root plus the set of registries that advertise
//! its sites. [`SiteRegistry`] turns a federation into a list of [`Site`]s:
//!
//! 1. every registry is asked for endpoints of the configured service type;
//!    unreachable registries are skipped unless all of them fail
//! 2. every distinct endpoint is probed for liveness, concurrently, each
//!    with its own clone of the querying identity
//! 3. endpoints that answer become sites carrying the identity used in their
//!    own probe; everything else is logged and dropped
//!
//! Results are kept in a [`SiteCache`] keyed by the registry set. Entries
//! expire after a fixed TTL and are rebuilt on the next access, with at most
//! one rebuild per key in flight. A rebuild that fails outright leaves the
//! previous entry in place and callers get that last-known-good list.
//!
//! The network side is abstracted by [`RegistryClient`] and
//! [`LivenessProbe`]; both are bounded by the timeouts in
//! [`DiscoveryConfig`]. Dropping a discovery future cancels any outstanding
//! queries and probes.

mod cache;
mod client;
mod config;
mod endpoint;
mod error;
mod federation;
mod registry;
mod site;

pub use cache::{CacheEntry, SiteCache};
pub use client::{LivenessProbe, RegistryClient};
pub use config::{
    DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_PROBE_TIMEOUT, DEFAULT_QUERY_TIMEOUT,
    DEFAULT_SERVICE_TYPE, DEFAULT_TTL, DiscoveryConfig,
};
pub use endpoint::EndpointReference;
pub use error::{DiscoveryError, ProbeError, RegistryError, RegistryFailure, SkipReason};
pub use federation::{Federation, RegistrySet};
pub use registry::{ProbeOutcome, SiteRegistry};
pub use site::Site;

pub use url::Url;

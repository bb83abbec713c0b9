use std::time::Duration;

/// Service type advertised by site entry points.
pub const DEFAULT_SERVICE_TYPE: &str = "SiteFactory";

/// How long a discovered site list stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Upper bound on a single registry query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// How many liveness probes may be in flight at once.
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 16;

/// Configuration for [`SiteRegistry`](crate::SiteRegistry).
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    service_type: String,
    ttl: Duration,
    query_timeout: Duration,
    probe_timeout: Duration,
    max_concurrent_probes: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            ttl: DEFAULT_TTL,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }
}

impl DiscoveryConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service type to ask registries for
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    /// Set how long discovered sites stay fresh
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the registry query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the liveness probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set how many probes may run concurrently (at least one)
    pub fn with_max_concurrent_probes(mut self, limit: usize) -> Self {
        self.max_concurrent_probes = limit.max(1);
        self
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn max_concurrent_probes(&self) -> usize {
        self.max_concurrent_probes
    }
}

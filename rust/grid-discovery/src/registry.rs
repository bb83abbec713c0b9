use crate::{
    DiscoveryConfig, DiscoveryError, EndpointReference, Federation, LivenessProbe, RegistryClient,
    RegistryError, RegistryFailure, Site, SiteCache, SkipReason,
};
use futures::{StreamExt, future::join_all, stream};
use grid_credentials::Identity;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

/// What became of a single candidate endpoint.
#[derive(Clone, Debug)]
pub enum ProbeOutcome {
    /// The endpoint answered its probe.
    Live(Site),
    /// The endpoint was dropped.
    Skipped {
        endpoint: EndpointReference,
        reason: SkipReason,
    },
}

/// Turns federation registries into live sites.
///
/// Every candidate endpoint advertised by a registry is probed with its own
/// clone of the registry identity, and only endpoints that answer become
/// [`Site`]s. Results are cached per [`RegistrySet`](crate::RegistrySet)
/// for the configured TTL.
pub struct SiteRegistry<C, P> {
    client: C,
    probe: P,
    identity: Identity,
    config: DiscoveryConfig,
    cache: SiteCache,
}

impl<C, P> SiteRegistry<C, P>
where
    C: RegistryClient,
    P: LivenessProbe,
{
    pub fn new(client: C, probe: P, identity: Identity, config: DiscoveryConfig) -> Self {
        let cache = SiteCache::new(config.ttl());
        Self {
            client,
            probe,
            identity,
            config,
            cache,
        }
    }

    /// The identity registries are queried with.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn cache(&self) -> &SiteCache {
        &self.cache
    }

    /// Live sites of `federation`, served from cache while fresh.
    ///
    /// The cache is keyed by registry set alone, so federations with
    /// different grids but the same registries share one scan. Sites are
    /// always returned under the grid of `federation`.
    pub async fn sites(&self, federation: &Arc<Federation>) -> Result<Vec<Site>, DiscoveryError> {
        let sites = self
            .cache
            .get_or_rebuild(federation.registries(), || self.scan(federation))
            .await?;
        Ok(rooted_at(federation, sites))
    }

    /// Rescan `federation` regardless of cache age.
    ///
    /// If the rescan fails and sites were cached before, those are returned.
    pub async fn refresh(&self, federation: &Arc<Federation>) -> Result<Vec<Site>, DiscoveryError> {
        let sites = self
            .cache
            .rebuild(federation.registries(), || self.scan(federation))
            .await?;
        Ok(rooted_at(federation, sites))
    }

    /// Query and probe `federation` without touching the cache.
    pub async fn scan(&self, federation: &Arc<Federation>) -> Result<Vec<Site>, DiscoveryError> {
        let candidates = self.query_registries(federation).await?;
        let candidate_count = candidates.len();

        let outcomes: Vec<ProbeOutcome> = stream::iter(candidates)
            .map(|endpoint| self.probe_candidate(federation, endpoint))
            .buffer_unordered(self.config.max_concurrent_probes())
            .collect()
            .await;

        let mut sites = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Live(site) => sites.push(site),
                ProbeOutcome::Skipped { endpoint, reason } => {
                    debug!(endpoint = %endpoint.address(), %reason, "Skipping endpoint");
                }
            }
        }

        // Probes finish in any order
        sites.sort_by(|a, b| {
            (a.location(), a.endpoint().address()).cmp(&(b.location(), b.endpoint().address()))
        });
        sites.dedup_by(|a, b| a.location() == b.location());

        info!(
            federation = %federation,
            candidates = candidate_count,
            live = sites.len(),
            "Discovered sites"
        );

        Ok(sites)
    }

    /// Ask every registry for candidates, de-duplicated by address.
    async fn query_registries(
        &self,
        federation: &Federation,
    ) -> Result<Vec<EndpointReference>, DiscoveryError> {
        let registries = federation.registries();
        if registries.is_empty() {
            return Err(DiscoveryError::NoRegistries {
                federation: federation.to_string(),
            });
        }

        let timeout = self.config.query_timeout();
        let service_type = self.config.service_type();
        let queries = registries.iter().map(move |registry| async move {
            let query = self.client.query(registry, service_type, &self.identity);
            let answer = tokio::time::timeout(timeout, query)
                .await
                .unwrap_or_else(|_| {
                    Err(RegistryError::Unreachable(format!(
                        "no answer within {timeout:?}"
                    )))
                });
            (registry, answer)
        });

        let mut answered = 0;
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for (registry, answer) in join_all(queries).await {
            match answer {
                Ok(endpoints) => {
                    answered += 1;
                    debug!(registry = %registry, endpoints = endpoints.len(), "Registry answered");
                    for endpoint in endpoints {
                        if seen.insert(endpoint.address().clone()) {
                            candidates.push(endpoint);
                        }
                    }
                }
                Err(error) => {
                    warn!(registry = %registry, %error, "Registry query failed");
                    failures.push(RegistryFailure {
                        registry: registry.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        if answered == 0 {
            return Err(DiscoveryError::Unreachable {
                federation: federation.to_string(),
                failures,
            });
        }

        Ok(candidates)
    }

    async fn probe_candidate(
        &self,
        federation: &Arc<Federation>,
        endpoint: EndpointReference,
    ) -> ProbeOutcome {
        let location = match endpoint.site_location(federation.grid()) {
            Ok(location) => location,
            Err(error) => {
                return ProbeOutcome::Skipped {
                    endpoint,
                    reason: error.into(),
                };
            }
        };

        let mut identity = self.identity.clone();
        let timeout = self.config.probe_timeout();
        let probed = tokio::time::timeout(timeout, self.probe.probe(&endpoint, &mut identity)).await;

        match probed {
            Ok(Ok(())) => ProbeOutcome::Live(Site::new(
                location,
                federation.clone(),
                endpoint,
                identity,
            )),
            Ok(Err(error)) => ProbeOutcome::Skipped {
                endpoint,
                reason: error.into(),
            },
            Err(_) => ProbeOutcome::Skipped {
                endpoint,
                reason: SkipReason::Timeout(timeout),
            },
        }
    }
}

/// Place sites scanned for another federation with the same registries
/// under the grid of `federation`.
fn rooted_at(federation: &Arc<Federation>, sites: Vec<Site>) -> Vec<Site> {
    sites
        .into_iter()
        .filter_map(|site| {
            if site.federation().grid() == federation.grid() {
                return Some(site);
            }
            match site.endpoint().site_location(federation.grid()) {
                Ok(location) => Some(Site::new(
                    location,
                    federation.clone(),
                    site.endpoint().clone(),
                    site.into_identity(),
                )),
                Err(error) => {
                    debug!(endpoint = %site.endpoint().address(), %error, "Skipping endpoint");
                    None
                }
            }
        })
        .collect()
}

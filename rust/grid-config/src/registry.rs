use crate::{ConfigError, IdentityStore};
use async_trait::async_trait;
use grid_credentials::Identity;
use grid_discovery::{Federation, LivenessProbe, RegistryClient, Site, SiteRegistry};
use grid_location::Location;
use parking_lot::RwLock;
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tracing::info;

/// An identity store backed by site discovery.
///
/// The store starts out empty. Each [`refresh`](IdentityStore::refresh)
/// asks the [`SiteRegistry`] for the live sites of the federation and
/// replaces the known mapping with the result, so every identity handed out
/// is the one its site was last successfully probed with.
pub struct RegistryIdentityStore<C, P> {
    registry: Arc<SiteRegistry<C, P>>,
    federation: Arc<Federation>,
    sites: RwLock<HashMap<Location, Site>>,
}

impl<C, P> RegistryIdentityStore<C, P>
where
    C: RegistryClient,
    P: LivenessProbe,
{
    /// An empty store that discovers the sites of `federation` on refresh.
    pub fn new(registry: Arc<SiteRegistry<C, P>>, federation: Arc<Federation>) -> Self {
        Self {
            registry,
            federation,
            sites: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store and run an initial discovery.
    pub async fn discover(
        registry: Arc<SiteRegistry<C, P>>,
        federation: Arc<Federation>,
    ) -> Result<Self, ConfigError> {
        let store = Self::new(registry, federation);
        store.refresh().await?;
        Ok(store)
    }

    pub fn federation(&self) -> &Arc<Federation> {
        &self.federation
    }

    pub fn registry(&self) -> &Arc<SiteRegistry<C, P>> {
        &self.registry
    }

    /// Snapshot of the known sites, ordered by location.
    pub fn sites(&self) -> Vec<Site> {
        let mut sites: Vec<Site> = self.sites.read().values().cloned().collect();
        sites.sort_by(|a, b| a.location().cmp(b.location()));
        sites
    }
}

#[async_trait]
impl<C, P> IdentityStore for RegistryIdentityStore<C, P>
where
    C: RegistryClient,
    P: LivenessProbe,
{
    fn find_identity(&self, location: &Location) -> Option<Identity> {
        let site = location.site_location().ok()?;
        self.sites
            .read()
            .get(&site)
            .map(|site| site.identity().clone())
    }

    fn all_site_locations(&self) -> BTreeSet<Location> {
        self.sites.read().keys().cloned().collect()
    }

    async fn refresh(&self) -> Result<(), ConfigError> {
        let discovered = self.registry.sites(&self.federation).await?;
        let sites: HashMap<Location, Site> = discovered
            .into_iter()
            .map(|site| (site.location().clone(), site))
            .collect();

        info!(federation = %self.federation, sites = sites.len(), "Refreshed site identities");
        *self.sites.write() = sites;
        Ok(())
    }
}

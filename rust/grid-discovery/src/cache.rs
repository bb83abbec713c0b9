use crate::{DiscoveryError, RegistrySet, Site};
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, warn};

/// A discovered site list and when it was built.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    refreshed_at: Instant,
    sites: Vec<Site>,
}

impl CacheEntry {
    /// When the list was built.
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    /// The cached sites.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Returns `true` while the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.elapsed() < ttl
    }
}

#[derive(Default)]
struct SlotState {
    entry: Option<CacheEntry>,
    attempts: u64,
    last_error: Option<DiscoveryError>,
}

impl SlotState {
    /// What a caller that waited on someone else's rebuild should see.
    fn settled(&self) -> Option<Result<Vec<Site>, DiscoveryError>> {
        match (&self.entry, &self.last_error) {
            (Some(entry), _) => Some(Ok(entry.sites.clone())),
            (None, Some(error)) => Some(Err(error.clone())),
            (None, None) => None,
        }
    }
}

/// Per-key state plus the lock that admits a single rebuild at a time.
#[derive(Default)]
struct Slot {
    state: RwLock<SlotState>,
    rebuild: tokio::sync::Mutex<()>,
}

/// Time-bounded cache of discovered sites, keyed by registry set.
///
/// Fresh entries are served without coordination. When an entry is missing
/// or stale, callers for the same key queue on a per-key lock: the first one
/// rebuilds and the rest receive its outcome instead of scanning again.
///
/// A failed rebuild never removes an entry. Callers get the previous
/// (possibly stale) sites, and the entry stays stale so the next access
/// tries again.
pub struct SiteCache {
    ttl: Duration,
    slots: Mutex<HashMap<RegistrySet, Arc<Slot>>>,
}

impl SiteCache {
    /// Create a cache whose entries stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// How long entries stay fresh.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current entry for `key`, fresh or not.
    pub fn snapshot(&self, key: &RegistrySet) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(key).cloned()?;
        let state = slot.state.read();
        state.entry.clone()
    }

    /// Drop the entry for `key`, forcing the next access to rebuild.
    ///
    /// A rebuild already in flight is unaffected and its callers still share
    /// its outcome.
    pub fn invalidate(&self, key: &RegistrySet) {
        let Some(slot) = self.slots.lock().get(key).cloned() else {
            return;
        };
        slot.state.write().entry = None;
    }

    /// Serve the entry for `key` if it is fresh, otherwise rebuild it.
    pub async fn get_or_rebuild<F, Fut>(
        &self,
        key: &RegistrySet,
        rebuild: F,
    ) -> Result<Vec<Site>, DiscoveryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Site>, DiscoveryError>>,
    {
        self.single_flight(key, rebuild, true).await
    }

    /// Rebuild the entry for `key` regardless of its age.
    ///
    /// Concurrent callers still share a single rebuild.
    pub async fn rebuild<F, Fut>(
        &self,
        key: &RegistrySet,
        rebuild: F,
    ) -> Result<Vec<Site>, DiscoveryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Site>, DiscoveryError>>,
    {
        self.single_flight(key, rebuild, false).await
    }

    fn slot(&self, key: &RegistrySet) -> Arc<Slot> {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }

    async fn single_flight<F, Fut>(
        &self,
        key: &RegistrySet,
        rebuild: F,
        reuse_fresh: bool,
    ) -> Result<Vec<Site>, DiscoveryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Site>, DiscoveryError>>,
    {
        let slot = self.slot(key);

        let seen = {
            let state = slot.state.read();
            if reuse_fresh {
                if let Some(entry) = state.entry.as_ref().filter(|e| e.is_fresh(self.ttl)) {
                    return Ok(entry.sites.clone());
                }
            }
            state.attempts
        };

        let _rebuilding = slot.rebuild.lock().await;

        {
            let state = slot.state.read();
            if state.attempts != seen {
                if let Some(outcome) = state.settled() {
                    debug!("Joined an in-flight site rebuild");
                    return outcome;
                }
            }
        }

        let outcome = rebuild().await;

        let mut state = slot.state.write();
        state.attempts += 1;
        match outcome {
            Ok(sites) => {
                state.entry = Some(CacheEntry {
                    refreshed_at: Instant::now(),
                    sites: sites.clone(),
                });
                state.last_error = None;
                Ok(sites)
            }
            Err(error) => {
                state.last_error = Some(error.clone());
                match &state.entry {
                    Some(previous) => {
                        warn!(
                            %error,
                            age = ?previous.refreshed_at.elapsed(),
                            "Site rebuild failed, serving last known sites"
                        );
                        Ok(previous.sites.clone())
                    }
                    None => Err(error),
                }
            }
        }
    }
}

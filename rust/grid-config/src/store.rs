use crate::ConfigError;
use async_trait::async_trait;
use grid_credentials::Identity;
use grid_location::Location;
use std::{collections::BTreeSet, sync::Arc};

/// Maps locations to the identity of the site hosting them.
///
/// Every lookup goes through [`Location::site_location`], so any address
/// below a site resolves to that site's identity. A location that has no
/// site ancestor is simply not found.
///
/// Lookups never refresh implicitly; call [`IdentityStore::refresh`] (or
/// [`IdentityStore::resolve`]) to pick up new sites.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// The identity known for the site enclosing `location`.
    fn find_identity(&self, location: &Location) -> Option<Identity>;

    /// Snapshot of the site locations currently known.
    fn all_site_locations(&self) -> BTreeSet<Location>;

    /// Reload the known sites from the store's source.
    async fn refresh(&self) -> Result<(), ConfigError>;

    /// Returns `true` if an identity is known for the site enclosing
    /// `location`.
    fn exists(&self, location: &Location) -> bool {
        self.find_identity(location).is_some()
    }

    /// Look `location` up, refreshing once if it is not known yet.
    async fn resolve(&self, location: &Location) -> Result<Option<Identity>, ConfigError> {
        if let Some(identity) = self.find_identity(location) {
            return Ok(Some(identity));
        }
        if location.site_location().is_err() {
            return Ok(None);
        }

        self.refresh().await?;
        Ok(self.find_identity(location))
    }
}

#[async_trait]
impl<T> IdentityStore for Arc<T>
where
    T: IdentityStore + ?Sized,
{
    fn find_identity(&self, location: &Location) -> Option<Identity> {
        (**self).find_identity(location)
    }

    fn all_site_locations(&self) -> BTreeSet<Location> {
        (**self).all_site_locations()
    }

    async fn refresh(&self) -> Result<(), ConfigError> {
        (**self).refresh().await
    }

    fn exists(&self, location: &Location) -> bool {
        (**self).exists(location)
    }

    async fn resolve(&self, location: &Location) -> Result<Option<Identity>, ConfigError> {
        (**self).resolve(location).await
    }
}

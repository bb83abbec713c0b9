use crate::{ConfigError, IdentityStore};
use async_trait::async_trait;
use grid_credentials::{Identity, KeystoreSpec, Properties};
use grid_location::Location;
use parking_lot::RwLock;
use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const SITE_PREFIX: &str = "site.";

const LOCATION_KEY: &str = "location";
const KEYSTORE_KEY: &str = "keystore";
const PASSWORD_KEY: &str = "password";
const ALIAS_KEY: &str = "alias";

/// An identity store built from a fixed set of sites.
///
/// The store is usually read from a property file with one block per site:
///
/// ```text
/// site.juelich.location = grid:/europe/juelich
/// site.juelich.keystore = juelich.jks
/// site.juelich.password = changeit
/// site.juelich.alias    = juelich
/// ```
///
/// Relative keystore paths resolve against the file's directory. Refreshing
/// a file-backed store re-reads the file and replaces every entry at once;
/// a store built from identities has nothing to refresh from.
#[derive(Debug)]
pub struct StaticIdentityStore {
    source: Option<PathBuf>,
    identities: RwLock<HashMap<Location, Identity>>,
}

impl StaticIdentityStore {
    /// Build a store from `(location, identity)` pairs.
    ///
    /// Each location is reduced to its site location; a later pair for the
    /// same site replaces an earlier one.
    pub fn from_identities(
        identities: impl IntoIterator<Item = (Location, Identity)>,
    ) -> Result<Self, ConfigError> {
        let identities = identities
            .into_iter()
            .map(|(location, identity)| -> Result<_, ConfigError> {
                Ok((location.site_location()?, identity))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            source: None,
            identities: RwLock::new(identities),
        })
    }

    /// Read a store from the property file at `path`.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let identities = read_sites(&path).await?;

        Ok(Self {
            source: Some(path),
            identities: RwLock::new(identities),
        })
    }

    /// The file this store was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[async_trait]
impl IdentityStore for StaticIdentityStore {
    fn find_identity(&self, location: &Location) -> Option<Identity> {
        let site = location.site_location().ok()?;
        self.identities.read().get(&site).cloned()
    }

    fn all_site_locations(&self) -> BTreeSet<Location> {
        self.identities.read().keys().cloned().collect()
    }

    async fn refresh(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.source else {
            return Ok(());
        };

        let identities = read_sites(path).await?;
        *self.identities.write() = identities;
        Ok(())
    }
}

async fn read_sites(path: &Path) -> Result<HashMap<Location, Identity>, ConfigError> {
    let properties = Properties::load(path).await?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let names: BTreeSet<&str> = properties
        .with_prefix(SITE_PREFIX)
        .filter_map(|(rest, _)| rest.rsplit_once('.').map(|(name, _)| name))
        .collect();

    let mut identities = HashMap::with_capacity(names.len());
    for name in names {
        let require = |key: &str| {
            properties
                .get(&format!("{SITE_PREFIX}{name}.{key}"))
                .ok_or_else(|| ConfigError::Incomplete {
                    source_file: path.to_path_buf(),
                    site: name.to_string(),
                    key: key.to_string(),
                })
        };

        let location = Location::parse(require(LOCATION_KEY)?)?.site_location()?;
        let keystore = KeystoreSpec::new(
            base_dir.join(require(KEYSTORE_KEY)?),
            require(PASSWORD_KEY)?,
            require(ALIAS_KEY)?,
        );

        debug!(
            site = name,
            %location,
            keystore = %keystore.path().display(),
            "Loading site identity"
        );
        identities.insert(location, keystore.load_identity().await?);
    }

    info!(path = %path.display(), sites = identities.len(), "Loaded site identities");
    Ok(identities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_credentials::{DistinguishedName, PrivateKey};
    use testresult::TestResult;

    fn identity(name: &str, seed: u8) -> TestResult<Identity> {
        Ok(Identity::self_issued(
            DistinguishedName::parse(&format!("CN={name},O=Grid"))?,
            PrivateKey::from_seed(&[seed; 32]),
        ))
    }

    #[tokio::test]
    async fn it_resolves_any_location_below_a_site() -> TestResult {
        let juelich = identity("juelich", 1)?;
        let store = StaticIdentityStore::from_identities([(
            Location::parse("grid:/europe/juelich/storage")?,
            juelich.clone(),
        )])?;

        let home = Location::parse("grid:/europe/juelich/storage/home?user=alice")?;
        assert!(store.exists(&home));
        assert_eq!(store.find_identity(&home), Some(juelich));
        assert_eq!(
            store.all_site_locations(),
            BTreeSet::from([Location::parse("grid:/europe/juelich")?])
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_does_not_find_unknown_sites_or_grid_roots() -> TestResult {
        let store = StaticIdentityStore::from_identities([(
            Location::parse("grid:/europe/juelich")?,
            identity("juelich", 1)?,
        )])?;

        assert!(!store.exists(&Location::parse("grid:/europe/hlrs")?));
        assert!(store.find_identity(&Location::parse("grid:/europe")?).is_none());
        assert_eq!(store.resolve(&Location::parse("grid:/europe")?).await?, None);
        Ok(())
    }

    #[test]
    fn it_rejects_identities_bound_to_a_grid_root() -> TestResult {
        let result = StaticIdentityStore::from_identities([(
            Location::parse("grid:/europe")?,
            identity("europe", 1)?,
        )]);

        assert!(matches!(result, Err(ConfigError::Location(_))));
        Ok(())
    }

    #[tokio::test]
    async fn it_has_nothing_to_refresh_without_a_file() -> TestResult {
        let store = StaticIdentityStore::from_identities(Vec::new())?;

        store.refresh().await?;
        assert!(store.all_site_locations().is_empty());
        assert!(store.source().is_none());
        Ok(())
    }
}

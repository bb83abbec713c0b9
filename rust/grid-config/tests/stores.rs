use async_trait::async_trait;
use grid_config::{ConfigError, IdentityStore, RegistryIdentityStore, StaticIdentityStore};
use grid_credentials::{CredentialError, DistinguishedName, Identity, Keystore, PrivateKey, Session};
use grid_discovery::{
    DiscoveryConfig, EndpointReference, Federation, LivenessProbe, ProbeError, RegistryClient,
    RegistryError, RegistrySet, SiteRegistry, Url,
};
use grid_location::Location;
use pretty_assertions::assert_eq;
use std::{
    collections::BTreeSet,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

fn identity(name: &str, seed: u8) -> anyhow::Result<Identity> {
    Ok(Identity::self_issued(
        DistinguishedName::parse(&format!("CN={name},O=Grid"))?,
        PrivateKey::from_seed(&[seed; 32]),
    ))
}

async fn write_keystore(path: &Path, entries: &[(&str, &Identity)]) -> anyhow::Result<()> {
    let mut keystore = Keystore::new();
    for (alias, identity) in entries {
        keystore.insert(*alias, identity);
    }
    keystore.store(path, "changeit").await?;
    Ok(())
}

#[tokio::test]
async fn it_loads_sites_from_a_property_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let juelich = identity("juelich", 1)?;
    let hlrs = identity("hlrs", 2)?;
    write_keystore(
        &dir.path().join("sites.jks"),
        &[("juelich", &juelich), ("hlrs", &hlrs)],
    )
    .await?;

    let config = dir.path().join("sites.properties");
    tokio::fs::write(
        &config,
        "# sites of the european grid\n\
         site.juelich.location = grid:/europe/juelich\n\
         site.juelich.keystore = sites.jks\n\
         site.juelich.password = changeit\n\
         site.juelich.alias = juelich\n\
         \n\
         site.hlrs.location = grid:/europe/hlrs/storage\n\
         site.hlrs.keystore = sites.jks\n\
         site.hlrs.password = changeit\n\
         site.hlrs.alias = hlrs\n",
    )
    .await?;

    let store = StaticIdentityStore::load(&config).await?;

    assert_eq!(
        store.all_site_locations(),
        BTreeSet::from([
            Location::parse("grid:/europe/hlrs")?,
            Location::parse("grid:/europe/juelich")?,
        ])
    );
    let found = store.find_identity(&Location::parse("grid:/europe/hlrs/storage/home")?);
    assert_eq!(found.as_ref().map(Identity::subject), Some(hlrs.subject()));
    Ok(())
}

#[tokio::test]
async fn it_rereads_the_file_on_refresh() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let juelich = identity("juelich", 1)?;
    let hlrs = identity("hlrs", 2)?;
    write_keystore(
        &dir.path().join("sites.jks"),
        &[("juelich", &juelich), ("hlrs", &hlrs)],
    )
    .await?;

    let block = |name: &str| {
        format!(
            "site.{name}.location = grid:/europe/{name}\n\
             site.{name}.keystore = sites.jks\n\
             site.{name}.password = changeit\n\
             site.{name}.alias = {name}\n"
        )
    };
    let config = dir.path().join("sites.properties");
    tokio::fs::write(&config, block("juelich")).await?;

    let store = StaticIdentityStore::load(&config).await?;
    let hlrs_location = Location::parse("grid:/europe/hlrs")?;
    assert!(!store.exists(&hlrs_location));

    tokio::fs::write(&config, block("hlrs")).await?;
    assert!(!store.exists(&hlrs_location));

    store.refresh().await?;
    assert!(store.exists(&hlrs_location));
    assert!(!store.exists(&Location::parse("grid:/europe/juelich")?));
    Ok(())
}

#[tokio::test]
async fn it_names_the_missing_key_of_an_incomplete_site() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("sites.properties");
    tokio::fs::write(
        &config,
        "site.juelich.location = grid:/europe/juelich\nsite.juelich.keystore = sites.jks\n",
    )
    .await?;

    match StaticIdentityStore::load(&config).await {
        Err(ConfigError::Incomplete { site, key, .. }) => {
            assert_eq!(site, "juelich");
            assert_eq!(key, "password");
        }
        other => panic!("expected an incomplete site, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn it_reports_keystores_that_fail_to_open() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_keystore(&dir.path().join("sites.jks"), &[("juelich", &identity("juelich", 1)?)]).await?;
    let config = dir.path().join("sites.properties");
    tokio::fs::write(
        &config,
        "site.juelich.location = grid:/europe/juelich\n\
         site.juelich.keystore = sites.jks\n\
         site.juelich.password = wrong\n\
         site.juelich.alias = juelich\n",
    )
    .await?;

    let result = StaticIdentityStore::load(&config).await;

    assert!(matches!(
        result,
        Err(ConfigError::Credentials(CredentialError::IntegrityCheckFailed))
    ));
    Ok(())
}

struct FakeRegistry {
    endpoints: Vec<EndpointReference>,
    reachable: AtomicBool,
    queries: AtomicUsize,
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn query(
        &self,
        _registry: &Url,
        _service_type: &str,
        _identity: &Identity,
    ) -> Result<Vec<EndpointReference>, RegistryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(self.endpoints.clone())
        } else {
            Err(RegistryError::Unreachable("connection refused".into()))
        }
    }
}

/// Accepts every endpoint except `dead`.
struct FakeProbe {
    dead: Url,
}

#[async_trait]
impl LivenessProbe for FakeProbe {
    async fn probe(
        &self,
        endpoint: &EndpointReference,
        identity: &mut Identity,
    ) -> Result<(), ProbeError> {
        if endpoint.address() == &self.dead {
            return Err(ProbeError::Unreachable("connection reset".into()));
        }
        identity.establish_session(Session::new(endpoint.address().as_str(), "granted"));
        Ok(())
    }
}

type Discovery = SiteRegistry<Arc<FakeRegistry>, FakeProbe>;

fn discovery(
    reachable: bool,
) -> anyhow::Result<(Arc<FakeRegistry>, Arc<Discovery>, Arc<Federation>)> {
    let dead = Url::parse("https://hlrs.example/site")?;
    let client = Arc::new(FakeRegistry {
        endpoints: vec![
            EndpointReference::new(Url::parse("https://juelich.example/site")?)
                .with_site_name("juelich"),
            EndpointReference::new(dead.clone()).with_site_name("hlrs"),
        ],
        reachable: AtomicBool::new(reachable),
        queries: AtomicUsize::new(0),
    });
    let registry = Arc::new(SiteRegistry::new(
        client.clone(),
        FakeProbe { dead },
        identity("prober", 9)?,
        DiscoveryConfig::default(),
    ));
    let federation = Arc::new(Federation::new(
        &Location::parse("grid:/europe")?,
        RegistrySet::new([Url::parse("https://registry.example/")?]),
    ));
    Ok((client, registry, federation))
}

#[tokio::test]
async fn it_maps_discovered_sites_to_their_probe_identities() -> anyhow::Result<()> {
    let (_, registry, federation) = discovery(true)?;
    let store = RegistryIdentityStore::discover(registry, federation).await?;

    let juelich = Location::parse("grid:/europe/juelich")?;
    assert_eq!(store.all_site_locations(), BTreeSet::from([juelich.clone()]));
    assert!(!store.exists(&Location::parse("grid:/europe/hlrs")?));

    let identity = store
        .find_identity(&juelich.child("storage")?)
        .ok_or_else(|| anyhow::anyhow!("juelich should be known"))?;
    assert_eq!(identity.session().map(Session::token), Some("granted"));
    assert_eq!(store.sites().len(), 1);
    Ok(())
}

#[tokio::test]
async fn it_only_discovers_on_refresh_or_resolve() -> anyhow::Result<()> {
    let (client, registry, federation) = discovery(true)?;
    let store = RegistryIdentityStore::new(registry, federation);
    let juelich = Location::parse("grid:/europe/juelich")?;

    assert!(store.find_identity(&juelich).is_none());
    assert_eq!(client.queries.load(Ordering::SeqCst), 0);

    assert!(store.resolve(&juelich).await?.is_some());
    assert_eq!(client.queries.load(Ordering::SeqCst), 1);

    assert!(store.resolve(&juelich).await?.is_some());
    assert_eq!(client.queries.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn it_surfaces_total_discovery_failure_on_refresh() -> anyhow::Result<()> {
    let (_, registry, federation) = discovery(false)?;
    let store = RegistryIdentityStore::new(registry, federation);

    let result = store.refresh().await;

    assert!(matches!(result, Err(ConfigError::Discovery(_))));
    assert!(store.all_site_locations().is_empty());
    Ok(())
}

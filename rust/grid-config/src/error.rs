use grid_credentials::CredentialError;
use grid_discovery::DiscoveryError;
use grid_location::LocationError;
use std::path::PathBuf;

/// Errors raised while building or refreshing an identity store.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Site discovery failed as a whole.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Credentials for a site could not be loaded.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A configured location is not a valid site address.
    #[error(transparent)]
    Location(#[from] LocationError),

    /// A site block in a configuration file lacks a required key.
    #[error("Site {site:?} in {} is missing {key:?}", source_file.display())]
    Incomplete {
        /// The file being read
        source_file: PathBuf,
        /// The site block name
        site: String,
        /// The missing key
        key: String,
    },
}

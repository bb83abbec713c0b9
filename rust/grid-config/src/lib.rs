//! Identity stores: which identity to use for a grid location.
//!
//! An [`IdentityStore`] resolves any [`Location`] to the [`Identity`] bound
//! to its enclosing site. Two stores are provided:
//!
//! - [`StaticIdentityStore`]: a fixed set of sites, typically read from a
//!   property file at startup
//! - [`RegistryIdentityStore`]: sites discovered through a
//!   [`SiteRegistry`](grid_discovery::SiteRegistry), each carrying the
//!   identity it was probed with
//!
//! ```no_run
//! # async fn example() -> Result<(), grid_config::ConfigError> {
//! use grid_config::{IdentityStore, StaticIdentityStore};
//! use grid_location::Location;
//!
//! let store = StaticIdentityStore::load("/etc/grid/sites.properties").await?;
//! let storage = Location::parse("grid:/europe/juelich/storage")?;
//!
//! if let Some(identity) = store.resolve(&storage).await? {
//!     println!("{}", identity.subject());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Location`]: grid_location::Location
//! [`Identity`]: grid_credentials::Identity

mod error;
mod file;
mod registry;
mod store;

pub use error::ConfigError;
pub use file::StaticIdentityStore;
pub use registry::RegistryIdentityStore;
pub use store::IdentityStore;

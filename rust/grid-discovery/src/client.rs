//! The network collaborators discovery relies on.

use crate::{EndpointReference, ProbeError, RegistryError};
use async_trait::async_trait;
use grid_credentials::Identity;
use std::sync::Arc;
use url::Url;

/// Queries a federation registry for advertised endpoints.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Ask `registry` for every endpoint advertised under `service_type`,
    /// authenticating as `identity`.
    async fn query(
        &self,
        registry: &Url,
        service_type: &str,
        identity: &Identity,
    ) -> Result<Vec<EndpointReference>, RegistryError>;
}

/// Checks that an endpoint is alive and accepts an identity.
///
/// The probe may record security state (such as a session) on the identity
/// it is given; discovery hands every probe its own clone.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Perform a lightweight call against `endpoint` as `identity`.
    async fn probe(
        &self,
        endpoint: &EndpointReference,
        identity: &mut Identity,
    ) -> Result<(), ProbeError>;
}

#[async_trait]
impl<T> RegistryClient for Arc<T>
where
    T: RegistryClient + ?Sized,
{
    async fn query(
        &self,
        registry: &Url,
        service_type: &str,
        identity: &Identity,
    ) -> Result<Vec<EndpointReference>, RegistryError> {
        (**self).query(registry, service_type, identity).await
    }
}

#[async_trait]
impl<T> LivenessProbe for Arc<T>
where
    T: LivenessProbe + ?Sized,
{
    async fn probe(
        &self,
        endpoint: &EndpointReference,
        identity: &mut Identity,
    ) -> Result<(), ProbeError> {
        (**self).probe(endpoint, identity).await
    }
}

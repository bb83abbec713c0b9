use crate::{EndpointReference, Federation};
use grid_credentials::Identity;
use grid_location::Location;
use std::sync::Arc;

/// A site that answered a liveness probe.
///
/// Sites are only ever created from a successful probe. The identity is the
/// one used (and possibly updated) by that probe, not the identity that
/// queried the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    location: Location,
    federation: Arc<Federation>,
    endpoint: EndpointReference,
    identity: Identity,
}

impl Site {
    pub(crate) fn new(
        location: Location,
        federation: Arc<Federation>,
        endpoint: EndpointReference,
        identity: Identity,
    ) -> Self {
        Self {
            location,
            federation,
            endpoint,
            identity,
        }
    }

    /// The canonical site location.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The federation the site was discovered in.
    pub fn federation(&self) -> &Arc<Federation> {
        &self.federation
    }

    /// The endpoint that was probed.
    pub fn endpoint(&self) -> &EndpointReference {
        &self.endpoint
    }

    /// The identity the site was successfully probed with.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Consume the site, keeping only its identity.
    pub fn into_identity(self) -> Identity {
        self.identity
    }
}

use crate::{Certificate, CredentialError, DistinguishedName, PrivateKey};

/// Security material used to talk to a grid site.
///
/// An identity is a certificate chain (leaf first), an optional private key
/// for the leaf, and an optional [`Session`] that a peer handed out after a
/// successful exchange.
///
/// Identities own all of their state. `clone()` produces a fully independent
/// copy, so a clone handed to a client that establishes a session never
/// affects the identity it was cloned from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    leaf: Certificate,
    intermediates: Vec<Certificate>,
    private_key: Option<PrivateKey>,
    session: Option<Session>,
}

/// Session state established with a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    peer: String,
    token: String,
}

impl Session {
    /// Record a session token handed out by `peer`.
    pub fn new(peer: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            token: token.into(),
        }
    }

    /// The peer that established the session.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// The opaque session token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Identity {
    /// Build an identity from a certificate chain (leaf first) and an
    /// optional private key belonging to the leaf.
    pub fn new(
        chain: Vec<Certificate>,
        private_key: Option<PrivateKey>,
    ) -> Result<Self, CredentialError> {
        let mut chain = chain.into_iter();
        let leaf = chain.next().ok_or(CredentialError::EmptyChain)?;

        if let Some(key) = &private_key {
            if &key.public_key() != leaf.public_key() {
                return Err(CredentialError::KeyMismatch {
                    subject: leaf.subject().clone(),
                });
            }
        }

        Ok(Self {
            leaf,
            intermediates: chain.collect(),
            private_key,
            session: None,
        })
    }

    /// Convenience constructor for a self-issued identity holding its key.
    pub fn self_issued(subject: DistinguishedName, key: PrivateKey) -> Self {
        Self {
            leaf: Certificate::self_issued(subject, &key),
            intermediates: Vec::new(),
            private_key: Some(key),
            session: None,
        }
    }

    /// The leaf certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.leaf
    }

    /// The full chain, leaf first.
    pub fn certificate_chain(&self) -> Vec<Certificate> {
        std::iter::once(&self.leaf)
            .chain(&self.intermediates)
            .cloned()
            .collect()
    }

    /// The subject of the leaf certificate.
    pub fn subject(&self) -> &DistinguishedName {
        self.leaf.subject()
    }

    /// The private key, if this identity holds one.
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// The session established with a peer, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Record a session established with a peer, replacing any previous one.
    pub fn establish_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Forget the current session.
    pub fn end_session(&mut self) -> Option<Session> {
        self.session.take()
    }
}

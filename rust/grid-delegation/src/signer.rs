//! The signing capability that turns delegation requests into assertions.

use crate::{Assertion, SigningError, ValidityWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grid_credentials::{Certificate, DistinguishedName, Identity, PrivateKey};
use std::sync::Arc;

/// Limits placed on a delegation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Restrictions {
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
    pub max_hops: u32,
}

impl Restrictions {
    pub fn window(&self) -> ValidityWindow {
        ValidityWindow::new(self.not_before, self.not_on_or_after)
    }
}

/// A request to delegate trust from `issuer` to `subject`.
///
/// The subject's key proves that the request is made on the subject's
/// behalf; it never leaves the signer.
#[derive(Clone, Debug)]
pub struct DelegationRequest {
    pub subject: DistinguishedName,
    pub subject_chain: Vec<Certificate>,
    pub subject_key: PrivateKey,
    pub issuer: DistinguishedName,
    pub restrictions: Restrictions,
}

/// Produces signed delegation assertions.
#[async_trait]
pub trait DelegationSigner: Send + Sync {
    async fn delegate(&self, request: DelegationRequest) -> Result<Assertion, SigningError>;
}

#[async_trait]
impl<T> DelegationSigner for Arc<T>
where
    T: DelegationSigner + ?Sized,
{
    async fn delegate(&self, request: DelegationRequest) -> Result<Assertion, SigningError> {
        (**self).delegate(request).await
    }
}

/// Signs assertions in-process with the agent's Ed25519 key.
#[derive(Clone, Debug)]
pub struct LocalSigner {
    agent: DistinguishedName,
    key: PrivateKey,
}

impl LocalSigner {
    /// A signer acting for `agent`, which must hold its private key.
    pub fn new(agent: &Identity) -> Result<Self, SigningError> {
        let key = agent
            .private_key()
            .cloned()
            .ok_or_else(|| SigningError::MissingKey(agent.subject().clone()))?;

        Ok(Self {
            agent: agent.subject().clone(),
            key,
        })
    }

    /// The agent this signer issues assertions for.
    pub fn agent(&self) -> &DistinguishedName {
        &self.agent
    }
}

#[async_trait]
impl DelegationSigner for LocalSigner {
    async fn delegate(&self, request: DelegationRequest) -> Result<Assertion, SigningError> {
        if request.issuer != self.agent {
            return Err(SigningError::IssuerMismatch {
                expected: request.issuer,
                actual: self.agent.clone(),
            });
        }

        let owns_leaf = request.subject_chain.first().is_some_and(|leaf| {
            leaf.subject() == &request.subject
                && leaf.public_key() == &request.subject_key.public_key()
        });
        if !owns_leaf {
            return Err(SigningError::SubjectKeyMismatch {
                subject: request.subject,
            });
        }

        let window = request.restrictions.window();
        if window.is_empty() {
            return Err(SigningError::InvalidRestrictions(format!(
                "empty validity window {} .. {}",
                window.not_before(),
                window.not_on_or_after()
            )));
        }

        Ok(Assertion::sign(
            &self.key,
            request.issuer,
            request.subject,
            window,
            request.restrictions.max_hops,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use testresult::TestResult;

    fn identity(dn: &str, seed: u8) -> TestResult<Identity> {
        Ok(Identity::self_issued(
            DistinguishedName::parse(dn)?,
            PrivateKey::from_seed(&[seed; 32]),
        ))
    }

    fn request(agent: &Identity, user: &Identity) -> TestResult<DelegationRequest> {
        let now: DateTime<Utc> = "2026-10-19T12:00:00Z".parse()?;
        Ok(DelegationRequest {
            subject: user.subject().clone(),
            subject_chain: user.certificate_chain(),
            subject_key: user.private_key().cloned().ok_or("user key")?,
            issuer: agent.subject().clone(),
            restrictions: Restrictions {
                not_before: now,
                not_on_or_after: now + TimeDelta::days(14),
                max_hops: 10,
            },
        })
    }

    #[tokio::test]
    async fn it_issues_verifiable_assertions() -> TestResult {
        let agent = identity("CN=Agent,O=Grid", 1)?;
        let user = identity("CN=alice,O=Grid", 2)?;
        let signer = LocalSigner::new(&agent)?;

        let assertion = signer.delegate(request(&agent, &user)?).await?;

        assert_eq!(assertion.subject(), user.subject());
        assert_eq!(assertion.issuer(), agent.subject());
        assert_eq!(assertion.max_hops(), 10);
        assertion.verify(agent.certificate())?;
        Ok(())
    }

    #[tokio::test]
    async fn it_only_signs_for_its_own_agent() -> TestResult {
        let agent = identity("CN=Agent,O=Grid", 1)?;
        let other = identity("CN=Other Agent,O=Grid", 3)?;
        let user = identity("CN=alice,O=Grid", 2)?;
        let signer = LocalSigner::new(&agent)?;

        let result = signer.delegate(request(&other, &user)?).await;

        assert!(matches!(result, Err(SigningError::IssuerMismatch { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn it_requires_the_subject_key() -> TestResult {
        let agent = identity("CN=Agent,O=Grid", 1)?;
        let user = identity("CN=alice,O=Grid", 2)?;
        let signer = LocalSigner::new(&agent)?;

        let mut forged = request(&agent, &user)?;
        forged.subject_key = PrivateKey::from_seed(&[9; 32]);

        assert!(matches!(
            signer.delegate(forged).await,
            Err(SigningError::SubjectKeyMismatch { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_empty_windows() -> TestResult {
        let agent = identity("CN=Agent,O=Grid", 1)?;
        let user = identity("CN=alice,O=Grid", 2)?;
        let signer = LocalSigner::new(&agent)?;

        let mut request = request(&agent, &user)?;
        request.restrictions.not_on_or_after = request.restrictions.not_before;

        assert!(matches!(
            signer.delegate(request).await,
            Err(SigningError::InvalidRestrictions(_))
        ));
        Ok(())
    }

    #[test]
    fn it_needs_an_agent_key() -> TestResult {
        let agent = identity("CN=Agent,O=Grid", 1)?;
        let public_only = Identity::new(agent.certificate_chain(), None)?;

        assert!(matches!(
            LocalSigner::new(&public_only),
            Err(SigningError::MissingKey(_))
        ));
        Ok(())
    }
}

use crate::AssertionError;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use grid_credentials::{Certificate, DistinguishedName, PrivateKey};
use serde::{Deserialize, Serialize};

/// The period during which an assertion may be used.
///
/// The window is half open: valid from `not_before` (inclusive) until
/// `not_on_or_after` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    not_before: DateTime<Utc>,
    not_on_or_after: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn new(not_before: DateTime<Utc>, not_on_or_after: DateTime<Utc>) -> Self {
        Self {
            not_before,
            not_on_or_after,
        }
    }

    /// A window of `length` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, length: TimeDelta) -> Self {
        Self::new(start, start + length)
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_on_or_after(&self) -> DateTime<Utc> {
        self.not_on_or_after
    }

    /// Returns `true` if `now` falls inside the window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now < self.not_on_or_after
    }

    /// Returns `true` if no instant falls inside the window.
    pub fn is_empty(&self) -> bool {
        self.not_before >= self.not_on_or_after
    }
}

/// A signed statement that an issuer delegates trust to a subject.
///
/// Assertions are immutable. An assertion that has fallen out of its
/// validity window is replaced, never extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    id: String,
    issuer: DistinguishedName,
    subject: DistinguishedName,
    window: ValidityWindow,
    max_hops: u32,
    signature: Vec<u8>,
}

impl Assertion {
    /// Create an assertion and sign it with the issuer's key.
    pub fn sign(
        issuer_key: &PrivateKey,
        issuer: DistinguishedName,
        subject: DistinguishedName,
        window: ValidityWindow,
        max_hops: u32,
    ) -> Self {
        let mut assertion = Self {
            id: format!("_{}", ulid::Ulid::new()),
            issuer,
            subject,
            window,
            max_hops,
            signature: Vec::new(),
        };
        assertion.signature = issuer_key.sign(&assertion.signing_payload());
        assertion
    }

    /// Unique assertion id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The agent delegating trust.
    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// The user trust is delegated to.
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn window(&self) -> &ValidityWindow {
        &self.window
    }

    /// Maximum length of a delegation chain built on this assertion.
    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Returns `true` if the assertion may be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
    }

    /// The bytes covered by the signature.
    pub fn signing_payload(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.id,
            self.issuer,
            self.subject,
            self.window.not_before.timestamp(),
            self.window.not_on_or_after.timestamp(),
            self.max_hops
        )
        .into_bytes()
    }

    /// Check the signature against the issuer's certificate.
    pub fn verify(&self, issuer: &Certificate) -> Result<(), AssertionError> {
        if issuer.subject() != &self.issuer {
            return Err(AssertionError::WrongIssuer {
                expected: self.issuer.clone(),
                actual: issuer.subject().clone(),
            });
        }
        issuer.verify(&self.signing_payload(), &self.signature)?;
        Ok(())
    }

    /// Serialize to the persisted XML form.
    pub fn to_xml(&self) -> Result<String, AssertionError> {
        let document = AssertionDocument {
            id: self.id.clone(),
            version: ASSERTION_VERSION.to_string(),
            issuer: self.issuer.to_string(),
            subject: self.subject.to_string(),
            conditions: Conditions {
                not_before: self.window.not_before,
                not_on_or_after: self.window.not_on_or_after,
                proxy_restriction: ProxyRestriction {
                    count: self.max_hops,
                },
            },
            signature: STANDARD.encode(&self.signature),
        };

        quick_xml::se::to_string(&document).map_err(|e| AssertionError::Malformed(e.to_string()))
    }

    /// Parse the persisted XML form.
    pub fn from_xml(xml: &str) -> Result<Self, AssertionError> {
        let document: AssertionDocument =
            quick_xml::de::from_str(xml).map_err(|e| AssertionError::Malformed(e.to_string()))?;

        if document.version != ASSERTION_VERSION {
            return Err(AssertionError::Malformed(format!(
                "unsupported version {:?}",
                document.version
            )));
        }

        let distinguished_name = |raw: &str| {
            DistinguishedName::parse(raw).map_err(|e| AssertionError::Malformed(e.to_string()))
        };

        Ok(Self {
            id: document.id,
            issuer: distinguished_name(&document.issuer)?,
            subject: distinguished_name(&document.subject)?,
            window: ValidityWindow::new(
                document.conditions.not_before,
                document.conditions.not_on_or_after,
            ),
            max_hops: document.conditions.proxy_restriction.count,
            signature: STANDARD
                .decode(document.signature.trim())
                .map_err(|e| AssertionError::Malformed(e.to_string()))?,
        })
    }
}

const ASSERTION_VERSION: &str = "2.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Assertion")]
struct AssertionDocument {
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "@Version")]
    version: String,
    #[serde(rename = "Issuer")]
    issuer: String,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Conditions")]
    conditions: Conditions,
    #[serde(rename = "Signature")]
    signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Conditions {
    #[serde(rename = "@NotBefore")]
    not_before: DateTime<Utc>,
    #[serde(rename = "@NotOnOrAfter")]
    not_on_or_after: DateTime<Utc>,
    #[serde(rename = "ProxyRestriction")]
    proxy_restriction: ProxyRestriction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProxyRestriction {
    #[serde(rename = "@Count")]
    count: u32,
}

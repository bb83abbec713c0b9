//! Error types for trust delegation.

use grid_credentials::{CredentialError, DistinguishedName};
use std::path::PathBuf;

/// The signing capability refused or failed to produce an assertion.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The request names an issuer the signer does not hold keys for.
    #[error("Signer acts for {actual}, not for {expected}")]
    IssuerMismatch {
        /// The issuer named in the request
        expected: DistinguishedName,
        /// The issuer the signer holds keys for
        actual: DistinguishedName,
    },

    /// The subject key does not belong to the subject certificate.
    #[error("Private key of {subject} does not match its certificate")]
    SubjectKeyMismatch {
        /// The subject of the request
        subject: DistinguishedName,
    },

    /// The signer's identity has no private key.
    #[error("Signer identity {0} holds no private key")]
    MissingKey(DistinguishedName),

    /// The requested restrictions cannot be honoured.
    #[error("Invalid restrictions: {0}")]
    InvalidRestrictions(String),

    /// A remote signing service rejected the request.
    #[error("Signing rejected: {0}")]
    Rejected(String),
}

/// A persisted assertion could not be encoded, decoded or verified.
#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    /// The assertion document is not well formed.
    #[error("Malformed assertion: {0}")]
    Malformed(String),

    /// The signature does not verify against the issuer certificate.
    #[error(transparent)]
    Verification(#[from] CredentialError),

    /// The certificate offered for verification is not the issuer's.
    #[error("Assertion was issued by {expected}, not by {actual}")]
    WrongIssuer {
        /// The issuer named in the assertion
        expected: DistinguishedName,
        /// The subject of the certificate offered
        actual: DistinguishedName,
    },
}

/// Obtaining a delegation assertion for a user failed.
#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    /// The user id could not be used to address per-user files.
    #[error("Invalid user id {0:?}")]
    InvalidUser(String),

    /// The user's security profile or keystore could not be loaded.
    #[error("Credentials of user {user} could not be loaded: {source}")]
    Credentials {
        /// The user being served
        user: String,
        /// The underlying error
        source: CredentialError,
    },

    /// The user's keystore entry has no private key.
    #[error("Keystore entry of user {user} holds no private key")]
    MissingPrivateKey {
        /// The user being served
        user: String,
    },

    /// The issuing agent's keystore could not be loaded.
    #[error("Agent credentials could not be loaded: {0}")]
    Agent(#[source] CredentialError),

    /// The signing capability failed.
    #[error("Signing an assertion for user {user} failed: {source}")]
    Signing {
        /// The user being served
        user: String,
        /// The underlying error
        source: SigningError,
    },

    /// The assertion could not be serialized.
    #[error("Assertion for user {user} could not be encoded: {source}")]
    Encoding {
        /// The user being served
        user: String,
        /// The underlying error
        source: AssertionError,
    },

    /// Reading or writing per-user state failed.
    #[error("I/O error on {} for user {user}: {source}", path.display())]
    Io {
        /// The user being served
        user: String,
        /// The file or directory being accessed
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// The token root could not be listed.
    #[error("Cannot list users under {}: {source}", path.display())]
    Root {
        /// The token root
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },
}

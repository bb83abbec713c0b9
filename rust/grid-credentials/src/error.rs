//! Error types for credential handling.

use crate::DistinguishedName;
use std::path::PathBuf;

/// Errors that can occur while loading, parsing or using credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Reading or writing a credential file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file being accessed
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// A distinguished name could not be parsed.
    #[error("Invalid distinguished name {0:?}")]
    InvalidDistinguishedName(String),

    /// Key bytes were malformed or the key could not be generated.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// A signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The private key does not belong to the leaf certificate.
    #[error("Private key does not match the certificate of {subject}")]
    KeyMismatch {
        /// Subject of the leaf certificate
        subject: DistinguishedName,
    },

    /// An identity was built without any certificate.
    #[error("An identity needs at least one certificate")]
    EmptyChain,

    /// The keystore file could not be decoded.
    #[error("Malformed keystore: {0}")]
    MalformedKeystore(String),

    /// The keystore digest does not match its content.
    #[error("Keystore integrity check failed (wrong password or modified file)")]
    IntegrityCheckFailed,

    /// The keystore has no entry under the requested alias.
    #[error("Keystore has no entry for alias {0:?}")]
    UnknownAlias(String),

    /// A required property is absent.
    #[error("Missing property {key:?}")]
    MissingProperty {
        /// The property key
        key: String,
    },
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

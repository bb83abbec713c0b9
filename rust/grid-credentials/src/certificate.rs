use crate::{CredentialError, DistinguishedName, PrivateKey};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Binds a subject name to an Ed25519 public key.
///
/// Certificates here carry no signature of their own: trust in the binding
/// comes from the keystore that holds them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    subject: DistinguishedName,
    issuer: DistinguishedName,
    #[serde(with = "public_key")]
    public_key: VerifyingKey,
}

impl Certificate {
    /// Create a certificate for `subject` issued by `issuer`.
    pub fn new(
        subject: DistinguishedName,
        issuer: DistinguishedName,
        public_key: VerifyingKey,
    ) -> Self {
        Self {
            subject,
            issuer,
            public_key,
        }
    }

    /// Create a certificate whose subject is also its issuer.
    pub fn self_issued(subject: DistinguishedName, key: &PrivateKey) -> Self {
        Self::new(subject.clone(), subject, key.public_key())
    }

    /// The subject this certificate names.
    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    /// The issuer of this certificate.
    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// The certified public key.
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// SHA-256 over subject, issuer and key, URL-safe base64 encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.subject.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.issuer.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.public_key.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Verify `signature` over `message` against the certified key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CredentialError> {
        let signature = Signature::from_slice(signature)
            .map_err(|e| CredentialError::InvalidSignature(e.to_string()))?;
        self.public_key
            .verify_strict(message, &signature)
            .map_err(|e| CredentialError::InvalidSignature(e.to_string()))
    }
}

mod public_key {
    use super::STANDARD;
    use base64::Engine;
    use ed25519_dalek::VerifyingKey;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(key: &VerifyingKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(key.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VerifyingKey, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(encoded).map_err(de::Error::custom)?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            de::Error::custom(format!("expected 32 public key bytes, got {}", bytes.len()))
        })?;
        VerifyingKey::from_bytes(&bytes).map_err(de::Error::custom)
    }
}

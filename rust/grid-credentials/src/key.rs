//! Ed25519 private keys.

use crate::CredentialError;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use std::fmt;

/// An Ed25519 private key.
///
/// `Debug` output never includes key material.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generate a new key from the operating system's RNG.
    pub fn generate() -> Result<Self, CredentialError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Build a key from a 32 byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Build a key from seed bytes of unchecked length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            CredentialError::InvalidKey(format!("expected 32 seed bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The seed this key was derived from.
    pub fn to_seed(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// The matching public key.
    pub fn public_key(&self) -> VerifyingKey {
        self.0.verifying_key()
    }

    /// Sign `message`, returning the 64 byte signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.0.sign(message).to_bytes().to_vec()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"<redacted>").finish()
    }
}

impl From<SigningKey> for PrivateKey {
    fn from(key: SigningKey) -> Self {
        Self(key)
    }
}

//! Password protected keystores.
//!
//! A keystore maps aliases to identities. On disk it is a JSON document whose
//! entries are guarded by an HMAC-SHA256 digest keyed with the keystore
//! password:
//!
//! ```json
//! {
//!   "entries": {
//!     "alice": { "certificate_chain": [...], "private_key": "<base64 seed>" }
//!   },
//!   "digest": "<base64 hmac>"
//! }
//! ```
//!
//! Opening a keystore with the wrong password fails the integrity check, as
//! does any modification of the entries.

use crate::{Certificate, CredentialError, Identity, PrivateKey, write_atomic};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{collections::BTreeMap, path::Path};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    certificate_chain: Vec<Certificate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Document {
    entries: BTreeMap<String, Entry>,
    digest: String,
}

/// An in-memory keystore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keystore {
    entries: BTreeMap<String, Entry>,
}

impl Keystore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `identity` under `alias`, replacing any existing entry.
    ///
    /// Session state is not persisted.
    pub fn insert(&mut self, alias: impl Into<String>, identity: &Identity) {
        let entry = Entry {
            certificate_chain: identity.certificate_chain(),
            private_key: identity
                .private_key()
                .map(|key| STANDARD.encode(key.to_seed())),
        };
        self.entries.insert(alias.into(), entry);
    }

    /// The aliases present in this keystore.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Reconstruct the identity stored under `alias`.
    pub fn identity(&self, alias: &str) -> Result<Identity, CredentialError> {
        let entry = self
            .entries
            .get(alias)
            .ok_or_else(|| CredentialError::UnknownAlias(alias.to_string()))?;

        let private_key = entry
            .private_key
            .as_deref()
            .map(|encoded| {
                let seed = STANDARD
                    .decode(encoded)
                    .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
                PrivateKey::from_bytes(&seed)
            })
            .transpose()?;

        Identity::new(entry.certificate_chain.clone(), private_key)
    }

    /// Decode a keystore, checking its digest against `password`.
    pub fn decode(bytes: &[u8], password: &str) -> Result<Self, CredentialError> {
        let document: Document = serde_json::from_slice(bytes)
            .map_err(|e| CredentialError::MalformedKeystore(e.to_string()))?;

        let expected = STANDARD
            .decode(&document.digest)
            .map_err(|e| CredentialError::MalformedKeystore(e.to_string()))?;

        mac(password, &document.entries)?
            .verify_slice(&expected)
            .map_err(|_| CredentialError::IntegrityCheckFailed)?;

        Ok(Self {
            entries: document.entries,
        })
    }

    /// Encode this keystore, sealing it with `password`.
    pub fn encode(&self, password: &str) -> Result<Vec<u8>, CredentialError> {
        let digest = mac(password, &self.entries)?.finalize().into_bytes();
        let document = Document {
            entries: self.entries.clone(),
            digest: STANDARD.encode(digest),
        };
        serde_json::to_vec_pretty(&document)
            .map_err(|e| CredentialError::MalformedKeystore(e.to_string()))
    }

    /// Read and open the keystore at `path`.
    pub async fn load(path: &Path, password: &str) -> Result<Self, CredentialError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CredentialError::io(path, e))?;
        let keystore = Self::decode(&bytes, password)?;
        debug!(path = %path.display(), entries = keystore.entries.len(), "Opened keystore");
        Ok(keystore)
    }

    /// Atomically write this keystore to `path`.
    pub async fn store(&self, path: &Path, password: &str) -> Result<(), CredentialError> {
        let bytes = self.encode(password)?;
        write_atomic(path, &bytes)
            .await
            .map_err(|e| CredentialError::io(path, e))?;
        debug!(path = %path.display(), entries = self.entries.len(), "Stored keystore");
        Ok(())
    }
}

fn mac(password: &str, entries: &BTreeMap<String, Entry>) -> Result<HmacSha256, CredentialError> {
    let payload = serde_json::to_vec(entries)
        .map_err(|e| CredentialError::MalformedKeystore(e.to_string()))?;
    let mut mac = <HmacSha256 as Mac>::new_from_slice(password.as_bytes())
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
    mac.update(&payload);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DistinguishedName, Session};
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn identity(name: &str, seed: u8) -> TestResult<Identity> {
        Ok(Identity::self_issued(
            DistinguishedName::parse(&format!("CN={name},O=Grid"))?,
            PrivateKey::from_seed(&[seed; 32]),
        ))
    }

    #[test]
    fn it_reopens_with_the_same_password() -> TestResult {
        let alice = identity("alice", 1)?;
        let mut keystore = Keystore::new();
        keystore.insert("alice", &alice);

        let reopened = Keystore::decode(&keystore.encode("changeit")?, "changeit")?;

        assert_eq!(reopened, keystore);
        assert_eq!(reopened.identity("alice")?, alice);
        assert_eq!(reopened.aliases().collect::<Vec<_>>(), vec!["alice"]);
        Ok(())
    }

    #[test]
    fn it_fails_the_integrity_check_with_a_wrong_password() -> TestResult {
        let mut keystore = Keystore::new();
        keystore.insert("alice", &identity("alice", 1)?);
        let bytes = keystore.encode("changeit")?;

        assert!(matches!(
            Keystore::decode(&bytes, "guess"),
            Err(CredentialError::IntegrityCheckFailed)
        ));
        Ok(())
    }

    #[test]
    fn it_detects_swapped_entries() -> TestResult {
        let mut keystore = Keystore::new();
        keystore.insert("alice", &identity("alice", 1)?);
        let original = String::from_utf8(keystore.encode("changeit")?)?;

        let mut forged = Keystore::new();
        forged.insert("alice", &identity("mallory", 9)?);
        let forged = String::from_utf8(forged.encode("other")?)?;

        let original: serde_json::Value = serde_json::from_str(&original)?;
        let mut forged: serde_json::Value = serde_json::from_str(&forged)?;
        forged["digest"] = original["digest"].clone();

        assert!(matches!(
            Keystore::decode(&serde_json::to_vec(&forged)?, "changeit"),
            Err(CredentialError::IntegrityCheckFailed)
        ));
        Ok(())
    }

    #[test]
    fn it_reports_unknown_aliases_and_garbage() -> TestResult {
        let keystore = Keystore::new();
        assert!(matches!(
            keystore.identity("nobody"),
            Err(CredentialError::UnknownAlias(_))
        ));
        assert!(matches!(
            Keystore::decode(b"not json", "changeit"),
            Err(CredentialError::MalformedKeystore(_))
        ));
        Ok(())
    }

    #[test]
    fn it_does_not_persist_sessions() -> TestResult {
        let mut alice = identity("alice", 1)?;
        alice.establish_session(Session::new("peer", "token"));

        let mut keystore = Keystore::new();
        keystore.insert("alice", &alice);

        assert!(keystore.identity("alice")?.session().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn it_stores_and_loads_from_disk() -> TestResult {
        let tempdir = tempfile::tempdir()?;
        let path = tempdir.path().join("alice.jks");

        let mut keystore = Keystore::new();
        keystore.insert("alice", &identity("alice", 1)?);
        keystore.store(&path, "changeit").await?;

        assert_eq!(Keystore::load(&path, "changeit").await?, keystore);
        assert!(matches!(
            Keystore::load(&tempdir.path().join("missing.jks"), "changeit").await,
            Err(CredentialError::Io { .. })
        ));

        let leftovers = std::fs::read_dir(tempdir.path())?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }
}

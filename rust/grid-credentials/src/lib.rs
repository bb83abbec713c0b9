//! Security material for grid sites and users.
//!
//! This crate provides the credential types shared by discovery, the
//! identity stores and the trust delegation store:
//!
//! - [`Identity`]: a certificate chain, an optional private key and any
//!   session state established while talking to a peer
//! - [`Keystore`]: alias-addressed identities persisted as a password
//!   protected file
//! - [`KeystoreSpec`]: where a keystore lives and how to open it, usually
//!   read from a [`Properties`] file
//!
//! Keys are Ed25519 throughout.

mod certificate;
mod dn;
mod error;
mod identity;
mod key;
mod keystore;
mod properties;
mod spec;

pub use certificate::Certificate;
pub use dn::DistinguishedName;
pub use error::CredentialError;
pub use identity::{Identity, Session};
pub use key::PrivateKey;
pub use keystore::Keystore;
pub use properties::Properties;
pub use spec::{
    KEYSTORE_ALIAS_PROPERTY, KEYSTORE_PASSWORD_PROPERTY, KEYSTORE_PATH_PROPERTY, KeystoreSpec,
};

pub use ed25519_dalek::VerifyingKey as PublicKey;

use std::path::Path;

/// Writes `content` to `path` so that readers never observe a partial file.
///
/// The content is written to a uniquely named sibling first and then renamed
/// over the destination.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{}.{}.tmp", file_name, ulid::Ulid::new()));

    let written = match tokio::fs::write(&tmp_path, content).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(error) => Err(error),
    };

    if let Err(error) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[tokio::test]
    async fn it_replaces_files_in_one_step() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token.saml");

        write_atomic(&path, b"first").await?;
        write_atomic(&path, b"second").await?;

        assert_eq!(tokio::fs::read(&path).await?, b"second");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_leaves_no_temporary_file_behind_on_failure() -> TestResult {
        let dir = tempfile::tempdir()?;
        let occupied = dir.path().join("occupied");
        tokio::fs::create_dir(&occupied).await?;
        tokio::fs::write(occupied.join("inside"), b"x").await?;

        assert!(write_atomic(&occupied, b"content").await.is_err());
        assert!(write_atomic(&dir.path().join("missing").join("file"), b"content").await.is_err());

        let names: Vec<_> = std::fs::read_dir(dir.path())?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<Result<_, _>>()?;
        assert_eq!(names, vec![std::ffi::OsString::from("occupied")]);
        Ok(())
    }
}

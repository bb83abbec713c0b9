use crate::{CredentialError, Identity, Keystore, Properties};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Property naming the keystore file.
pub const KEYSTORE_PATH_PROPERTY: &str = "credential.path";
/// Property holding the keystore password.
pub const KEYSTORE_PASSWORD_PROPERTY: &str = "credential.password";
/// Property naming the alias of the key entry to use.
pub const KEYSTORE_ALIAS_PROPERTY: &str = "credential.keyAlias";

/// Where a keystore lives, how to open it, and which entry to use.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystoreSpec {
    path: PathBuf,
    password: String,
    alias: String,
}

impl KeystoreSpec {
    /// Describe the entry `alias` of the keystore at `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        password: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            password: password.into(),
            alias: alias.into(),
        }
    }

    /// Read a spec from properties.
    ///
    /// A missing [`KEYSTORE_PATH_PROPERTY`] falls back to `default_path`.
    /// Relative keystore paths are resolved against `base_dir`.
    pub fn from_properties(
        properties: &Properties,
        base_dir: &Path,
        default_path: &Path,
    ) -> Result<Self, CredentialError> {
        let path = properties
            .get(KEYSTORE_PATH_PROPERTY)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_path.to_path_buf());

        Ok(Self {
            path: base_dir.join(path),
            password: properties.require(KEYSTORE_PASSWORD_PROPERTY)?.to_string(),
            alias: properties.require(KEYSTORE_ALIAS_PROPERTY)?.to_string(),
        })
    }

    /// Read a spec from the property file at `path`.
    ///
    /// Relative keystore paths are resolved against the property file's
    /// directory.
    pub async fn load(path: &Path, default_keystore: &Path) -> Result<Self, CredentialError> {
        let properties = Properties::load(path).await?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_properties(&properties, base_dir, default_keystore)
    }

    /// The keystore file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The keystore password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The alias of the entry to use.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Open the keystore and reconstruct the identity it describes.
    pub async fn load_identity(&self) -> Result<Identity, CredentialError> {
        Keystore::load(&self.path, &self.password)
            .await?
            .identity(&self.alias)
    }
}

impl fmt::Debug for KeystoreSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoreSpec")
            .field("path", &self.path)
            .field("password", &"<redacted>")
            .field("alias", &self.alias)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_resolves_relative_paths_against_the_base_dir() -> TestResult {
        let properties = Properties::parse(
            "credential.path = keys/alice.jks\n\
             credential.password = changeit\n\
             credential.keyAlias = alice",
        );
        let spec = KeystoreSpec::from_properties(
            &properties,
            Path::new("/srv/users/alice"),
            Path::new("unused.jks"),
        )?;

        assert_eq!(spec.path(), Path::new("/srv/users/alice/keys/alice.jks"));
        assert_eq!(spec.password(), "changeit");
        assert_eq!(spec.alias(), "alice");
        Ok(())
    }

    #[test]
    fn it_falls_back_to_the_default_keystore() -> TestResult {
        let properties =
            Properties::parse("credential.password = changeit\ncredential.keyAlias = alice");
        let spec = KeystoreSpec::from_properties(
            &properties,
            Path::new("/srv/users/alice"),
            Path::new("alice.jks"),
        )?;

        assert_eq!(spec.path(), Path::new("/srv/users/alice/alice.jks"));
        Ok(())
    }

    #[test]
    fn it_requires_password_and_alias() {
        let properties = Properties::parse("credential.path = alice.jks");
        assert!(matches!(
            KeystoreSpec::from_properties(&properties, Path::new("/"), Path::new("x.jks")),
            Err(CredentialError::MissingProperty { .. })
        ));
    }

    #[test]
    fn it_redacts_the_password() {
        let spec = KeystoreSpec::new("a.jks", "hunter2", "a");
        assert!(!format!("{spec:?}").contains("hunter2"));
    }
}

use crate::{
    Assertion, Clock, DelegationError, DelegationPolicy, DelegationRequest, DelegationSigner,
    Restrictions, SystemClock, UserId,
};
use chrono::{DateTime, SubsecRound, Utc};
use grid_credentials::{KeystoreSpec, write_atomic};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, warn};

const TOKEN_EXTENSION: &str = "saml";
const KEYSTORE_EXTENSION: &str = "jks";
const PROFILE_EXTENSION: &str = "security";

/// Outcome of [`TrustDelegationStore::ensure_all_current`].
#[derive(Debug, Default)]
pub struct EnsureReport {
    /// Users that received a new assertion.
    pub issued: Vec<UserId>,
    /// Users that already had one.
    pub skipped: Vec<UserId>,
    /// Users for which issuing failed.
    pub failed: Vec<(UserId, DelegationError)>,
}

/// Persists one delegation assertion per user and replaces it when needed.
///
/// Everything about a user lives in one directory below the root:
///
/// ```text
/// <root>/<user>/<user>.saml       the current assertion
/// <root>/<user>/<user>.jks        the user's keystore
/// <root>/<user>/<user>.security   how to open it (see KeystoreSpec)
/// ```
///
/// Assertions are issued by the agent described by `agent` through the
/// [`DelegationSigner`]. Issuing for a user is serialized per user, and
/// assertions are written atomically, so concurrent callers never sign
/// twice for the same user and readers never see a partial file.
pub struct TrustDelegationStore<S, C = SystemClock> {
    root: PathBuf,
    agent: KeystoreSpec,
    signer: S,
    clock: C,
    policy: DelegationPolicy,
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S> TrustDelegationStore<S, SystemClock>
where
    S: DelegationSigner,
{
    pub fn new(root: impl Into<PathBuf>, agent: KeystoreSpec, signer: S) -> Self {
        Self {
            root: root.into(),
            agent,
            signer,
            clock: SystemClock,
            policy: DelegationPolicy::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<S, C> TrustDelegationStore<S, C>
where
    S: DelegationSigner,
    C: Clock,
{
    /// Use `clock` instead of the system clock.
    pub fn with_clock<T: Clock>(self, clock: T) -> TrustDelegationStore<S, T> {
        TrustDelegationStore {
            root: self.root,
            agent: self.agent,
            signer: self.signer,
            clock,
            policy: self.policy,
            locks: self.locks,
        }
    }

    pub fn with_policy(mut self, policy: DelegationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &DelegationPolicy {
        &self.policy
    }

    /// Where the assertion of `user` is persisted.
    pub fn token_path(&self, user: &UserId) -> PathBuf {
        self.user_file(user, TOKEN_EXTENSION)
    }

    /// The default keystore of `user`.
    pub fn keystore_path(&self, user: &UserId) -> PathBuf {
        self.user_file(user, KEYSTORE_EXTENSION)
    }

    /// The security profile naming the keystore of `user`.
    pub fn profile_path(&self, user: &UserId) -> PathBuf {
        self.user_file(user, PROFILE_EXTENSION)
    }

    /// The assertion for `user`, issuing a new one if there is none or the
    /// current one is not valid right now.
    ///
    /// A persisted assertion that cannot be parsed is treated as absent.
    /// When issuing fails the persisted state is left as it was.
    pub async fn get_assertion(&self, user: &UserId) -> Result<Assertion, DelegationError> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let now = self.now();
        match self.read_token(user).await? {
            Some(assertion) if assertion.is_valid_at(now) => {
                debug!(%user, id = assertion.id(), "Reusing assertion");
                return Ok(assertion);
            }
            Some(assertion) => {
                info!(
                    %user,
                    id = assertion.id(),
                    not_before = %assertion.window().not_before(),
                    not_on_or_after = %assertion.window().not_on_or_after(),
                    "Assertion is outside its validity window, reissuing"
                );
            }
            None => debug!(%user, "No assertion on record"),
        }

        self.issue(user, now).await
    }

    /// Issue assertions for every known user that has none on record.
    ///
    /// Unlike [`get_assertion`](Self::get_assertion) this does not look at
    /// validity windows: a user whose assertion exists, expired or not, is
    /// skipped. Failures are collected per user.
    pub async fn ensure_all_current(&self) -> Result<EnsureReport, DelegationError> {
        let mut report = EnsureReport::default();

        for user in self.users().await? {
            let lock = self.lock_for(&user);
            let _guard = lock.lock().await;

            let outcome = match self.read_token(&user).await {
                Ok(Some(_)) => {
                    report.skipped.push(user);
                    continue;
                }
                Ok(None) => self.issue(&user, self.now()).await.map(|_| ()),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(()) => report.issued.push(user),
                Err(error) => {
                    warn!(%user, %error, "Could not issue assertion");
                    report.failed.push((user, error));
                }
            }
        }

        info!(
            issued = report.issued.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Ensured assertions for all users"
        );
        Ok(report)
    }

    /// Every user with a security profile below the root, in order.
    pub async fn users(&self) -> Result<Vec<UserId>, DelegationError> {
        let root_error = |source| DelegationError::Root {
            path: self.root.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(root_error(error)),
        };

        let mut users = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(root_error)? {
            let Some(user) = entry
                .file_name()
                .to_str()
                .and_then(|name| UserId::parse(name).ok())
            else {
                continue;
            };

            if tokio::fs::try_exists(self.profile_path(&user))
                .await
                .unwrap_or(false)
            {
                users.push(user);
            }
        }

        users.sort();
        Ok(users)
    }

    /// Remove the persisted assertion of `user`.
    ///
    /// Returns `false` if there was none.
    pub async fn discard(&self, user: &UserId) -> Result<bool, DelegationError> {
        let lock = self.lock_for(user);
        let _guard = lock.lock().await;

        let path = self.token_path(user);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(%user, "Discarded assertion");
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DelegationError::Io {
                user: user.to_string(),
                path,
                source,
            }),
        }
    }

    fn user_file(&self, user: &UserId, extension: &str) -> PathBuf {
        self.root
            .join(user.as_str())
            .join(format!("{user}.{extension}"))
    }

    fn lock_for(&self, user: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(user.clone()).or_default().clone()
    }

    /// Persisted timestamps have second precision.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(0)
    }

    async fn read_token(&self, user: &UserId) -> Result<Option<Assertion>, DelegationError> {
        let path = self.token_path(user);
        let xml = match tokio::fs::read_to_string(&path).await {
            Ok(xml) => xml,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) if error.kind() == ErrorKind::InvalidData => {
                warn!(%user, %error, "Persisted assertion is not text, replacing it");
                return Ok(None);
            }
            Err(source) => {
                return Err(DelegationError::Io {
                    user: user.to_string(),
                    path,
                    source,
                });
            }
        };

        match Assertion::from_xml(&xml) {
            Ok(assertion) => Ok(Some(assertion)),
            Err(error) => {
                warn!(%user, %error, "Persisted assertion is corrupt, replacing it");
                Ok(None)
            }
        }
    }

    async fn issue(&self, user: &UserId, now: DateTime<Utc>) -> Result<Assertion, DelegationError> {
        let credentials = |source| DelegationError::Credentials {
            user: user.to_string(),
            source,
        };

        let profile = KeystoreSpec::load(&self.profile_path(user), &self.keystore_path(user))
            .await
            .map_err(credentials)?;
        let identity = profile.load_identity().await.map_err(credentials)?;
        let subject_key = identity
            .private_key()
            .cloned()
            .ok_or_else(|| DelegationError::MissingPrivateKey {
                user: user.to_string(),
            })?;

        let agent = self
            .agent
            .load_identity()
            .await
            .map_err(DelegationError::Agent)?;

        let request = DelegationRequest {
            subject: identity.subject().clone(),
            subject_chain: identity.certificate_chain(),
            subject_key,
            issuer: agent.subject().clone(),
            restrictions: Restrictions {
                not_before: now,
                not_on_or_after: now + self.policy.validity(),
                max_hops: self.policy.max_hops(),
            },
        };

        let assertion = self
            .signer
            .delegate(request)
            .await
            .map_err(|source| DelegationError::Signing {
                user: user.to_string(),
                source,
            })?;

        let xml = assertion
            .to_xml()
            .map_err(|source| DelegationError::Encoding {
                user: user.to_string(),
                source,
            })?;

        let path = self.token_path(user);
        write_atomic(&path, xml.as_bytes())
            .await
            .map_err(|source| DelegationError::Io {
                user: user.to_string(),
                path: path.clone(),
                source,
            })?;

        info!(
            %user,
            id = assertion.id(),
            not_on_or_after = %assertion.window().not_on_or_after(),
            "Issued assertion"
        );
        Ok(assertion)
    }
}

use crate::DelegationError;
use std::{fmt, str::FromStr};

/// A user whose assertion and key material live under the token root.
///
/// User ids name a directory and files inside it, so they may not be empty,
/// contain path separators or control characters, or be a dot segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, DelegationError> {
        let valid = !raw.is_empty()
            && raw != "."
            && raw != ".."
            && !raw.contains(['/', '\\'])
            && !raw.chars().any(char::is_control);

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(DelegationError::InvalidUser(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = DelegationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for UserId {
    type Error = DelegationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_ordinary_user_names() {
        for raw in ["alice", "bob.smith", "user-42", "Ünal"] {
            assert!(UserId::parse(raw).is_ok(), "{raw:?}");
        }
    }

    #[test]
    fn it_rejects_names_that_would_escape_the_root() {
        for raw in ["", ".", "..", "../alice", "alice/keys", "a\\b", "tab\there"] {
            assert!(
                matches!(UserId::parse(raw), Err(DelegationError::InvalidUser(_))),
                "{raw:?}"
            );
        }
    }
}

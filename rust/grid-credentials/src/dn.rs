use crate::CredentialError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// An X.500-style distinguished name such as `CN=Alice,O=Grid`.
///
/// Attribute types are upper-cased and whitespace around separators is
/// dropped, so differently spaced spellings compare equal. Escaped commas
/// inside values are not supported.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName(String);

impl DistinguishedName {
    /// Parses and normalizes a comma separated list of `TYPE=value` pairs.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let invalid = || CredentialError::InvalidDistinguishedName(raw.to_string());

        let mut rdns = Vec::new();
        for rdn in raw.split(',') {
            let (kind, value) = rdn.split_once('=').ok_or_else(invalid)?;
            let (kind, value) = (kind.trim(), value.trim());

            let valid_kind = !kind.is_empty()
                && kind
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.');
            if !valid_kind || value.is_empty() {
                return Err(invalid());
            }

            rdns.push(format!("{}={}", kind.to_ascii_uppercase(), value));
        }

        Ok(Self(rdns.join(",")))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value of the first `CN` attribute, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.0.split(',').find_map(|rdn| rdn.strip_prefix("CN="))
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DistinguishedName {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = CredentialError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = CredentialError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(dn: DistinguishedName) -> Self {
        dn.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_normalizes_spacing_and_attribute_case() -> TestResult {
        let dn = DistinguishedName::parse(" cn = Alice Smith , o=Grid,  C=DE")?;
        assert_eq!(dn.as_str(), "CN=Alice Smith,O=Grid,C=DE");
        assert_eq!(dn, "CN=Alice Smith,O=Grid,C=DE".parse()?);
        Ok(())
    }

    #[test]
    fn it_finds_the_common_name() -> TestResult {
        let dn = DistinguishedName::parse("O=Grid,CN=agent")?;
        assert_eq!(dn.common_name(), Some("agent"));
        assert_eq!(DistinguishedName::parse("O=Grid")?.common_name(), None);
        Ok(())
    }

    #[test]
    fn it_rejects_malformed_names() {
        for raw in ["", "Alice", "CN=", "=Alice", "CN=Alice,", "C N=Alice"] {
            assert!(DistinguishedName::parse(raw).is_err(), "{raw:?}");
        }
    }
}

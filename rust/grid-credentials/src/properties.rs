//! Java-style property files.
//!
//! Supported syntax:
//!
//! - `key = value`, `key: value` or `key value`
//! - `#` and `!` comment lines, blank lines
//! - a trailing `\` continues the value on the next line
//!
//! Unicode and character escapes are not interpreted.

use crate::CredentialError;
use std::{collections::BTreeMap, path::Path};

/// An ordered set of string properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Parse property file content.
    pub fn parse(source: &str) -> Self {
        let mut properties = BTreeMap::new();
        let mut logical = String::new();

        for line in source.lines() {
            let line = if logical.is_empty() {
                line.trim_start()
            } else {
                line.trim()
            };

            if logical.is_empty() && (line.is_empty() || line.starts_with(['#', '!'])) {
                continue;
            }

            if let Some(continued) = line.strip_suffix('\\') {
                logical.push_str(continued);
                continue;
            }

            logical.push_str(line);
            if let Some((key, value)) = split_entry(&logical) {
                properties.insert(key, value);
            }
            logical.clear();
        }

        if let Some((key, value)) = split_entry(&logical) {
            properties.insert(key, value);
        }

        Self(properties)
    }

    /// Read and parse the property file at `path`.
    pub async fn load(path: &Path) -> Result<Self, CredentialError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CredentialError::io(path, e))?;
        Ok(Self::parse(&source))
    }

    /// The value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The value of `key`, or [`CredentialError::MissingProperty`].
    pub fn require(&self, key: &str) -> Result<&str, CredentialError> {
        self.get(key).ok_or_else(|| CredentialError::MissingProperty {
            key: key.to_string(),
        })
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// All properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Properties whose key starts with `prefix`, with the prefix removed.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter()
            .filter_map(move |(key, value)| key.strip_prefix(prefix).map(|rest| (rest, value)))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // The key ends at the first `=`, `:` or whitespace; one `=` or `:` may
    // follow after optional whitespace
    let end = line
        .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
        .unwrap_or(line.len());
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let value = rest.strip_prefix(['=', ':']).unwrap_or(rest);

    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_separators_and_comments() {
        let properties = Properties::parse(
            "# keystore settings\n\
             ! legacy comment\n\
             \n\
             credential.path = alice.jks\n\
             credential.password:  s3cr=t \n\
             credential.keyAlias alice\n\
             flag\n",
        );

        assert_eq!(properties.get("credential.path"), Some("alice.jks"));
        assert_eq!(properties.get("credential.password"), Some("s3cr=t"));
        assert_eq!(properties.get("credential.keyAlias"), Some("alice"));
        assert_eq!(properties.get("flag"), Some(""));
        assert_eq!(properties.len(), 4);
    }

    #[test]
    fn it_ends_keys_at_the_first_separator_or_whitespace() {
        let properties = Properties::parse(
            "key value=x
             spaced   :   colon: in value
             site.a.alias    = a
",
        );

        assert_eq!(properties.get("key"), Some("value=x"));
        assert_eq!(properties.get("spaced"), Some("colon: in value"));
        assert_eq!(properties.get("site.a.alias"), Some("a"));
        assert_eq!(properties.len(), 3);
    }

    #[test]
    fn it_joins_continuation_lines() {
        let properties = Properties::parse("sites = juelich, \\\n    hlrs, \\\n    lrz\nnext = 1");

        assert_eq!(properties.get("sites"), Some("juelich, hlrs, lrz"));
        assert_eq!(properties.get("next"), Some("1"));
    }

    #[test]
    fn it_filters_by_prefix() {
        let properties = Properties::parse("site.a.location = x\nsite.b.location = y\nother = z");
        let sites: Vec<_> = properties.with_prefix("site.").collect();

        assert_eq!(sites, vec![("a.location", "x"), ("b.location", "y")]);
    }

    #[test]
    fn it_reports_missing_required_keys() {
        let properties = Properties::default();
        assert!(matches!(
            properties.require("credential.path"),
            Err(CredentialError::MissingProperty { key }) if key == "credential.path"
        ));
    }
}

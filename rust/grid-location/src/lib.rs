//! Hierarchical addresses for grid resources.
//!
//! A [`Location`] names a grid, a site within a grid, or a resource hosted
//! by a site:
//!
//! ```text
//! grid:/europe                    grid root (depth 1)
//! grid:/europe/juelich            site (depth 2)
//! grid:/europe/juelich/storage    service hosted by the site
//! ```
//!
//! A location may carry a user scope as its only query parameter
//! (`grid:/europe/juelich?user=alice`).
//!
//! Locations are parsed with URL path semantics, which resolves dot segments.
//! After parsing, every segment is percent-decoded and re-encoded with one
//! fixed rule and the scheme is lower-cased, so equality and hashing are
//! structural: two spellings of the same address compare equal and hash
//! identically.
//!
//! # Example
//!
//! ```
//! use grid_location::Location;
//!
//! let service = Location::parse("grid:/europe/juelich/storage")?;
//! let site = service.site_location()?;
//!
//! assert_eq!(site.to_string(), "grid:/europe/juelich");
//! assert_eq!(site.site_location()?, site);
//! # Ok::<(), grid_location::LocationError>(())
//! ```

mod error;

pub use error::LocationError;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};
use url::{Url, form_urlencoded};

/// The query parameter carrying the optional user scope.
const USER_PARAMETER: &str = "user";

/// Number of segments in a site location (grid, site).
const SITE_DEPTH: usize = 2;

/// Non-special scheme the path is parsed under.
const PARSE_SCHEME: &str = "location";

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Bytes a canonical segment carries literally: unreserved characters,
/// sub-delimiters, `:` and `@`. Everything else is percent-encoded.
fn is_literal(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b':'
                | b'@'
        )
}

/// Decodes every escape in `segment` and re-encodes with a single rule, so
/// `%6A`, `%6a` and `j` all become `j` and `%2f` becomes `%2F`. A `%` that
/// does not start a valid escape is taken literally.
fn canonical_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let escaped = match bytes.get(index..index + 3) {
            Some([b'%', high, low]) => hex_value(*high).zip(hex_value(*low)),
            _ => None,
        };
        match escaped {
            Some((high, low)) => {
                decoded.push((high << 4) | low);
                index += 3;
            }
            None => {
                decoded.push(bytes[index]);
                index += 1;
            }
        }
    }

    let mut canonical = String::with_capacity(decoded.len());
    for byte in decoded {
        if is_literal(byte) {
            canonical.push(char::from(byte));
        } else {
            canonical.push_str(&format!("%{byte:02X}"));
        }
    }
    canonical
}

fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).and_then(|value| u8::try_from(value).ok())
}

/// A normalized, immutable hierarchical address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    scheme: String,
    segments: Vec<String>,
    user: Option<String>,
}

impl Location {
    /// Parses a raw address of the form `scheme:/segment(/segment)*`,
    /// optionally followed by `?user=<name>`.
    ///
    /// Any scheme is accepted, including ones that are URL schemes with an
    /// authority elsewhere (`https:/europe/juelich` is a valid location).
    /// Authorities (`scheme://host/...`) are always rejected.
    pub fn parse(raw: &str) -> Result<Self, LocationError> {
        let trimmed = raw.trim();
        let (scheme, rest) = trimmed
            .split_once(':')
            .ok_or_else(|| LocationError::malformed(raw, "missing scheme"))?;
        if !is_scheme(scheme) {
            return Err(LocationError::malformed(raw, "invalid scheme"));
        }

        // Parsed under a fixed scheme so that URL special-scheme rules
        // never apply to the path
        let url = Url::parse(&format!("{PARSE_SCHEME}:{rest}"))
            .map_err(|e| LocationError::malformed(raw, e.to_string()))?;

        if url.cannot_be_a_base() {
            return Err(LocationError::malformed(
                raw,
                "expected a `/` separated path after the scheme",
            ));
        }
        if url.has_host() {
            return Err(LocationError::malformed(
                raw,
                "authority components are not supported",
            ));
        }
        if url.fragment().is_some() {
            return Err(LocationError::malformed(raw, "fragments are not supported"));
        }

        let segments: Vec<String> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(canonical_segment)
                    .collect()
            })
            .unwrap_or_default();

        if segments.is_empty() {
            return Err(LocationError::malformed(
                raw,
                "at least one path segment is required",
            ));
        }

        let mut user = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                USER_PARAMETER if user.is_none() && !value.is_empty() => {
                    user = Some(value.into_owned())
                }
                USER_PARAMETER => {
                    return Err(LocationError::malformed(
                        raw,
                        "user scope must be given exactly once and be non-empty",
                    ));
                }
                other => {
                    return Err(LocationError::malformed(
                        raw,
                        format!("unsupported query parameter `{other}`"),
                    ));
                }
            }
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            segments,
            user,
        })
    }

    /// Returns the canonical ancestor at site granularity.
    ///
    /// The site location keeps the scheme and the grid and site segments and
    /// drops any user scope. Reduction is idempotent.
    pub fn site_location(&self) -> Result<Location, LocationError> {
        if self.segments.len() < SITE_DEPTH {
            return Err(LocationError::NoSiteAncestor {
                location: self.to_string(),
            });
        }

        Ok(Self {
            scheme: self.scheme.clone(),
            segments: self.segments[..SITE_DEPTH].to_vec(),
            user: None,
        })
    }

    /// Returns the grid root that encloses this location.
    pub fn grid(&self) -> Location {
        Self {
            scheme: self.scheme.clone(),
            segments: self.segments[..1].to_vec(),
            user: None,
        }
    }

    /// Returns the location one level below this one.
    ///
    /// The segment is percent-encoded as needed, but may not contain path,
    /// query or fragment delimiters, and may not be a dot segment.
    pub fn child(&self, segment: &str) -> Result<Location, LocationError> {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains(['/', '?', '#'])
        {
            return Err(LocationError::malformed(
                segment,
                "not a valid location segment",
            ));
        }

        let raw = format!("{}:/{}/{}", self.scheme, self.segments.join("/"), segment);
        let mut child = Self::parse(&raw)?;
        child.user = self.user.clone();
        Ok(child)
    }

    /// Returns a copy of this location scoped to the given user.
    pub fn with_user(&self, user: impl Into<String>) -> Location {
        Self {
            user: Some(user.into()),
            ..self.clone()
        }
    }

    /// Returns a copy of this location without a user scope.
    pub fn without_user(&self) -> Location {
        Self {
            user: None,
            ..self.clone()
        }
    }

    /// The (lower-cased) scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The normalized, percent-encoded path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The user scope, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Number of path segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if this location is exactly at site granularity.
    pub fn is_site(&self) -> bool {
        self.segments.len() == SITE_DEPTH && self.user.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:/{}", self.scheme, self.segments.join("/"))?;
        if let Some(user) = &self.user {
            let encoded: String = form_urlencoded::byte_serialize(user.as_bytes()).collect();
            write!(f, "?{USER_PARAMETER}={encoded}")?;
        }
        Ok(())
    }
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Location {
    type Error = LocationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = LocationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

//! Error types for location parsing and reduction.

/// Errors that can occur when parsing or reducing a [`Location`].
///
/// [`Location`]: crate::Location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The raw form does not match `scheme:/segment(/segment)*`.
    #[error("Malformed location {input:?}: {reason}")]
    Malformed {
        /// The raw input that failed to parse
        input: String,
        /// Why the input was rejected
        reason: String,
    },

    /// The location is above site granularity (e.g. a bare grid root).
    #[error("Location {location} has no enclosing site")]
    NoSiteAncestor {
        /// The location that could not be reduced
        location: String,
    },
}

impl LocationError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

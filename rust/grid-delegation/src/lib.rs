//! Per-user trust delegation assertions.
//!
//! A delegation assertion states that an issuing agent trusts a user for a
//! bounded period and a bounded delegation depth. The
//! [`TrustDelegationStore`] keeps one assertion per user on disk and moves
//! each user through three states:
//!
//! - **absent**: no assertion on record (or one that cannot be parsed); the
//!   next [`get_assertion`](TrustDelegationStore::get_assertion) issues one
//! - **valid**: the current time is inside the assertion's validity window;
//!   the assertion is returned as is
//! - **expired**: the current time is outside the window; the assertion is
//!   replaced exactly as if it were absent
//!
//! Issuing loads the user's keystore (described by the user's security
//! profile) and the agent's keystore, then asks a [`DelegationSigner`] for
//! an assertion valid from now for [`DelegationPolicy::validity`].
//! [`LocalSigner`] signs in-process with the agent's key.

mod assertion;
mod clock;
mod error;
mod policy;
mod signer;
mod store;
mod user;

pub use assertion::{Assertion, ValidityWindow};
pub use clock::{Clock, SystemClock};
pub use error::{AssertionError, DelegationError, SigningError};
pub use policy::{DEFAULT_MAX_HOPS, DEFAULT_VALIDITY_DAYS, DelegationPolicy};
pub use signer::{DelegationRequest, DelegationSigner, LocalSigner, Restrictions};
pub use store::{EnsureReport, TrustDelegationStore};
pub use user::UserId;

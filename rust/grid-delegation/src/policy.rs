use chrono::TimeDelta;

/// Default number of days a freshly issued assertion stays valid.
pub const DEFAULT_VALIDITY_DAYS: i64 = 14;

/// Default maximum delegation chain length.
pub const DEFAULT_MAX_HOPS: u32 = 10;

/// What freshly issued assertions look like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelegationPolicy {
    validity: TimeDelta,
    max_hops: u32,
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self {
            validity: TimeDelta::days(DEFAULT_VALIDITY_DAYS),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl DelegationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long issued assertions stay valid
    pub fn with_validity(mut self, validity: TimeDelta) -> Self {
        self.validity = validity;
        self
    }

    /// Set the maximum delegation chain length
    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn validity(&self) -> TimeDelta {
        self.validity
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }
}

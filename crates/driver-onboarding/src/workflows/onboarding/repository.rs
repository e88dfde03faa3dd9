use std::sync::Arc;

use serde_json::Value;

use super::domain::{ApplicantRecord, AvailabilityRecord, DriverProfile, VerificationRecord};
use super::report::ReportSnapshot;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an atomic conditional merge on the alias group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    AlreadySet,
}

/// Intake-sourced applicant records, keyed by normalized email.
pub trait ApplicantStore: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Option<ApplicantRecord>, StoreError>;
    fn all(&self) -> Result<Vec<ApplicantRecord>, StoreError>;
    fn upsert(&self, record: ApplicantRecord) -> Result<(), StoreError>;
}

/// Driver profiles. Lookups are exact-key; older rows may sit under the
/// original casing, which the identity resolver handles above this seam.
pub trait ProfileStore: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Option<DriverProfile>, StoreError>;
    fn all(&self) -> Result<Vec<DriverProfile>, StoreError>;
    fn upsert(&self, profile: DriverProfile) -> Result<(), StoreError>;

    /// Compare-and-set over the flag bag: when none of `guard_paths` is
    /// already true, apply every update (and bump `updatedAt`) in one atomic
    /// step; otherwise change nothing. This is the seam that keeps repeated
    /// acknowledgements from re-timestamping each other under concurrency.
    fn merge_unless_set(
        &self,
        key: &str,
        guard_paths: &[&str],
        updates: &[(String, Value)],
    ) -> Result<MergeOutcome, StoreError>;
}

pub trait AvailabilityStore: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Option<AvailabilityRecord>, StoreError>;
    fn all(&self) -> Result<Vec<AvailabilityRecord>, StoreError>;
    fn upsert(&self, record: AvailabilityRecord) -> Result<(), StoreError>;
}

pub trait VerificationStore: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Option<VerificationRecord>, StoreError>;
    fn all(&self) -> Result<Vec<VerificationRecord>, StoreError>;
    fn upsert(&self, record: VerificationRecord) -> Result<(), StoreError>;
}

/// Generated report snapshots. Insert-only: snapshots are never mutated or
/// deleted after creation.
pub trait ReportStore: Send + Sync {
    fn for_driver(&self, key: &str) -> Result<Vec<ReportSnapshot>, StoreError>;
    fn all(&self) -> Result<Vec<ReportSnapshot>, StoreError>;
    fn insert(&self, snapshot: ReportSnapshot) -> Result<(), StoreError>;
}

/// The five independent record stores one aggregation pass joins across.
#[derive(Clone)]
pub struct StoreSet {
    pub applicants: Arc<dyn ApplicantStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub availability: Arc<dyn AvailabilityStore>,
    pub verification: Arc<dyn VerificationStore>,
    pub reports: Arc<dyn ReportStore>,
}

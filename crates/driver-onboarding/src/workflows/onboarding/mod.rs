//! Driver onboarding core: workflow-state reconstruction from the flag bag,
//! idempotent policy acknowledgements, and cross-store aggregation for
//! operator tooling and generated reports.

pub mod domain;
pub mod identity;
pub mod ledger;
pub mod progress;
pub mod projection;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod vehicle;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminPermission, AdminRole, AdminUser, ApplicantRecord, AvailabilityRecord, DriverProfile,
    FlagBag, OnboardingStatus, VerificationRecord,
};
pub use identity::{CanonicalKey, KeyCandidates};
pub use ledger::{AcknowledgeOutcome, AcknowledgementLedger, LedgerError, PolicyType};
pub use progress::{OnboardingStage, ProgressPosition, ProgressWarning};
pub use projection::{AggregationProjector, MergedView, ProjectionError};
pub use report::ReportSnapshot;
pub use repository::{
    ApplicantStore, AvailabilityStore, MergeOutcome, ProfileStore, ReportStore, StoreError,
    StoreSet, VerificationStore,
};
pub use router::onboarding_router;
pub use service::{OnboardingError, OnboardingService, StepOutcome};
pub use vehicle::VehicleCategory;

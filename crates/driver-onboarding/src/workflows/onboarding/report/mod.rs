mod builder;
mod snapshot;

pub use builder::{build_snapshot, ReportSources};
pub use snapshot::{
    DayAvailability, DriverInfo, FacilityPreferences, HealthAndSafety, OnboardingStatusSummary,
    PersonalInfo, ReportSnapshot,
};

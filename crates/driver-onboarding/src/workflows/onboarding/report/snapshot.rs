use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::domain::OnboardingStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverInfo {
    pub vehicle_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_id: Option<String>,
}

/// One day's slots. Report availability is ordered Monday through Sunday,
/// with any non-standard day keys appended after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub day: String,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAndSafety {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_physical_difficulties: Option<bool>,
    pub smoking_fitness_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityPreferences {
    #[serde(default)]
    pub selected_facilities: Vec<String>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusSummary {
    pub status: OnboardingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Immutable, point-in-time generated report artifact. Multiple snapshots may
/// exist per applicant; "latest" is decided by `createdAt` descending with
/// `reportId` as the tie-break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub report_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub personal_info: PersonalInfo,
    pub driver_info: DriverInfo,
    #[serde(default)]
    pub verification_details: BTreeMap<String, Value>,
    #[serde(default)]
    pub availability: Vec<DayAvailability>,
    /// `<policy>: bool` plus `<policy>Date: timestamp|null` pairs.
    #[serde(default)]
    pub acknowledgements: BTreeMap<String, Value>,
    pub health_and_safety: HealthAndSafety,
    pub facility_preferences: FacilityPreferences,
    pub onboarding_status: OnboardingStatusSummary,
    #[serde(default)]
    pub progress: BTreeMap<String, bool>,
}

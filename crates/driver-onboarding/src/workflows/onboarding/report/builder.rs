use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::super::domain::{
    ApplicantRecord, AvailabilityRecord, DriverProfile, FlagBag, VerificationRecord,
};
use super::super::progress::OnboardingStage;
use super::super::vehicle;
use super::snapshot::{
    DayAvailability, DriverInfo, FacilityPreferences, HealthAndSafety, OnboardingStatusSummary,
    PersonalInfo, ReportSnapshot,
};

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Stages surfaced in the report's acknowledgements section, keyed the way
/// operator tooling reads them.
const ACKNOWLEDGEMENT_ENTRIES: [(&str, OnboardingStage); 7] = [
    ("feeStructure", OnboardingStage::FeeStructure),
    ("paymentCycleSchedule", OnboardingStage::PaymentCycleSchedule),
    ("routesPolicy", OnboardingStage::RoutesPolicy),
    ("cancellationPolicy", OnboardingStage::CancellationPolicy),
    ("blocksClassification", OnboardingStage::BlocksClassification),
    ("smokingFitnessCheck", OnboardingStage::SmokingFitnessCheck),
    ("liabilities", OnboardingStage::Liabilities),
];

/// Everything a snapshot can be assembled from. Any piece may be missing;
/// the builder degrades the corresponding section instead of failing.
#[derive(Debug, Default)]
pub struct ReportSources<'a> {
    pub applicant: Option<&'a ApplicantRecord>,
    pub profile: Option<&'a DriverProfile>,
    pub availability: Option<&'a AvailabilityRecord>,
    pub verification: Option<&'a VerificationRecord>,
}

pub fn build_snapshot(
    report_id: String,
    canonical_email: &str,
    sources: &ReportSources<'_>,
    created_at: DateTime<Utc>,
) -> ReportSnapshot {
    let empty_flags = FlagBag::default();
    let flags = sources
        .profile
        .map(|profile| &profile.flags)
        .unwrap_or(&empty_flags);

    ReportSnapshot {
        report_id,
        email: canonical_email.to_string(),
        created_at,
        personal_info: personal_info(canonical_email, sources.applicant, flags),
        driver_info: driver_info(sources.applicant),
        verification_details: verification_details(sources.verification),
        availability: ordered_availability(sources.availability),
        acknowledgements: acknowledgements(flags),
        health_and_safety: health_and_safety(flags),
        facility_preferences: facility_preferences(flags),
        onboarding_status: onboarding_status(sources.profile),
        progress: progress_map(flags),
    }
}

/// Contact fields drifted across payload generations; read the applicant
/// record first, then the profile bag's historical names.
fn personal_info(
    canonical_email: &str,
    applicant: Option<&ApplicantRecord>,
    flags: &FlagBag,
) -> PersonalInfo {
    let name = applicant
        .and_then(|record| record.name.clone())
        .or_else(|| first_string(flags, &["name", "fullName"]));
    let phone = applicant
        .and_then(|record| record.phone.clone())
        .or_else(|| first_string(flags, &["phone", "phoneNumber"]));
    let city = applicant.and_then(|record| record.city.clone());

    PersonalInfo {
        name,
        email: canonical_email.to_string(),
        phone,
        city,
    }
}

fn driver_info(applicant: Option<&ApplicantRecord>) -> DriverInfo {
    let payload = applicant
        .map(|record| &record.raw_payload)
        .unwrap_or(&Value::Null);

    DriverInfo {
        vehicle_type: vehicle::classify(payload).label().to_string(),
        country: applicant.and_then(|record| record.country.clone()),
        city: applicant.and_then(|record| record.city.clone()),
        applicant_id: applicant.and_then(|record| record.applicant_id.clone()),
        funnel_id: applicant.and_then(|record| record.funnel_id.clone()),
    }
}

fn verification_details(verification: Option<&VerificationRecord>) -> BTreeMap<String, Value> {
    let record = match verification {
        Some(record) => record,
        None => return BTreeMap::new(),
    };

    let mut details = record.details.clone();
    details.insert("verified".to_string(), Value::Bool(record.verified));
    if let Some(method) = &record.method {
        details.insert("method".to_string(), Value::String(method.clone()));
    }
    if let Some(verified_at) = record.verified_at {
        details.insert(
            "verifiedAt".to_string(),
            Value::String(verified_at.to_rfc3339()),
        );
    }
    details
}

/// Monday through Sunday first; any non-standard day keys keep their stored
/// order and land after the real weekdays.
fn ordered_availability(availability: Option<&AvailabilityRecord>) -> Vec<DayAvailability> {
    let record = match availability {
        Some(record) => record,
        None => return Vec::new(),
    };

    let mut days = Vec::with_capacity(record.days.len());
    for weekday in WEEKDAYS {
        if let Some((day, slots)) = record
            .days
            .iter()
            .find(|(day, _)| day.eq_ignore_ascii_case(weekday))
        {
            days.push(DayAvailability {
                day: day.clone(),
                slots: slots.clone(),
            });
        }
    }
    for (day, slots) in &record.days {
        if !WEEKDAYS
            .iter()
            .any(|weekday| day.eq_ignore_ascii_case(weekday))
        {
            days.push(DayAvailability {
                day: day.clone(),
                slots: slots.clone(),
            });
        }
    }
    days
}

fn acknowledgements(flags: &FlagBag) -> BTreeMap<String, Value> {
    let mut entries = BTreeMap::new();
    for (key, stage) in ACKNOWLEDGEMENT_ENTRIES {
        entries.insert(
            key.to_string(),
            Value::Bool(flags.any_set(stage.completion_aliases())),
        );
        let date = stage
            .completion_timestamp()
            .and_then(|path| flags.timestamp(path))
            .map(|at| Value::String(at.to_rfc3339()))
            .unwrap_or(Value::Null);
        entries.insert(format!("{key}Date"), date);
    }
    entries
}

fn health_and_safety(flags: &FlagBag) -> HealthAndSafety {
    HealthAndSafety {
        smoking_status: first_string(flags, &["smokingStatus", "smoker"]),
        has_physical_difficulties: flags
            .get("hasPhysicalDifficulties")
            .and_then(Value::as_bool),
        smoking_fitness_completed: flags
            .any_set(OnboardingStage::SmokingFitnessCheck.completion_aliases()),
    }
}

fn facility_preferences(flags: &FlagBag) -> FacilityPreferences {
    let selected_facilities = flags
        .get("selectedFacilities")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    FacilityPreferences {
        selected_facilities,
        acknowledged: flags.any_set(OnboardingStage::FacilityLocations.completion_aliases()),
        acknowledged_at: OnboardingStage::FacilityLocations
            .completion_timestamp()
            .and_then(|path| flags.timestamp(path)),
    }
}

fn onboarding_status(profile: Option<&DriverProfile>) -> OnboardingStatusSummary {
    let profile = match profile {
        Some(profile) => profile,
        None => return OnboardingStatusSummary::default(),
    };

    OnboardingStatusSummary {
        status: profile.onboarding_status,
        completed_at: profile.completed_at,
        started_at: profile.created_at,
    }
}

fn progress_map(flags: &FlagBag) -> BTreeMap<String, bool> {
    OnboardingStage::ordered()
        .into_iter()
        .filter(|stage| !stage.completion_aliases().is_empty())
        .map(|stage| {
            (
                stage.key().to_string(),
                flags.any_set(stage.completion_aliases()),
            )
        })
        .collect()
}

fn first_string(flags: &FlagBag, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| flags.string(path))
        .map(str::to_string)
}

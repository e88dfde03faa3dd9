use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::onboarding::domain::{
    AdminPermission, AdminRole, AdminUser, ApplicantRecord, AvailabilityRecord, DriverProfile,
    VerificationRecord,
};
use crate::workflows::onboarding::report::{
    DriverInfo, FacilityPreferences, HealthAndSafety, OnboardingStatusSummary, PersonalInfo,
    ReportSnapshot,
};
use crate::workflows::onboarding::repository::{
    ApplicantStore, AvailabilityStore, MergeOutcome, ProfileStore, ReportStore, StoreError,
    StoreSet, VerificationStore,
};
use crate::workflows::onboarding::service::OnboardingService;

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn applicant(email: &str) -> ApplicantRecord {
    ApplicantRecord {
        email: email.to_string(),
        phone: Some("+447700900123".to_string()),
        name: Some("Asha Patel".to_string()),
        applicant_id: Some("apl-001".to_string()),
        funnel_id: Some("funnel-07".to_string()),
        stage: Some("interview".to_string()),
        status: Some("active".to_string()),
        city: Some("Leeds".to_string()),
        country: Some("UK".to_string()),
        raw_payload: json!({ "vehicle": { "type": "Saloon" } }),
        created_at: Some(at(2025, 5, 1, 9)),
    }
}

pub(super) fn profile(email: &str) -> DriverProfile {
    DriverProfile::new(email, at(2025, 5, 1, 10))
}

pub(super) fn operations_admin() -> AdminUser {
    AdminUser {
        email: "ops@fleet.example".to_string(),
        role: AdminRole::Operations,
        permissions: BTreeSet::from([
            AdminPermission::ResetProgress,
            AdminPermission::PreviewReport,
        ]),
    }
}

pub(super) fn support_admin() -> AdminUser {
    AdminUser {
        email: "support@fleet.example".to_string(),
        role: AdminRole::Support,
        permissions: BTreeSet::from([AdminPermission::PreviewReport]),
    }
}

pub(super) fn snapshot(email: &str, report_id: &str, created_at: DateTime<Utc>) -> ReportSnapshot {
    ReportSnapshot {
        report_id: report_id.to_string(),
        email: email.to_string(),
        created_at,
        personal_info: PersonalInfo {
            name: None,
            email: email.to_string(),
            phone: None,
            city: None,
        },
        driver_info: DriverInfo {
            vehicle_type: "car".to_string(),
            country: None,
            city: None,
            applicant_id: None,
            funnel_id: None,
        },
        verification_details: BTreeMap::new(),
        availability: Vec::new(),
        acknowledgements: BTreeMap::new(),
        health_and_safety: HealthAndSafety::default(),
        facility_preferences: FacilityPreferences::default(),
        onboarding_status: OnboardingStatusSummary::default(),
        progress: BTreeMap::new(),
    }
}

#[derive(Default)]
pub(super) struct MemoryApplicants {
    pub(super) records: Mutex<HashMap<String, ApplicantRecord>>,
}

impl ApplicantStore for MemoryApplicants {
    fn fetch(&self, key: &str) -> Result<Option<ApplicantRecord>, StoreError> {
        let guard = self.records.lock().expect("applicant mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn all(&self) -> Result<Vec<ApplicantRecord>, StoreError> {
        let guard = self.records.lock().expect("applicant mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn upsert(&self, record: ApplicantRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("applicant mutex poisoned");
        guard.insert(
            crate::workflows::onboarding::CanonicalKey::new(&record.email).into_string(),
            record,
        );
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryProfiles {
    pub(super) records: Mutex<HashMap<String, DriverProfile>>,
}

impl MemoryProfiles {
    pub(super) fn seed(&self, key: &str, profile: DriverProfile) {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        guard.insert(key.to_string(), profile);
    }

    pub(super) fn stored(&self, key: &str) -> Option<DriverProfile> {
        let guard = self.records.lock().expect("profile mutex poisoned");
        guard.get(key).cloned()
    }
}

impl ProfileStore for MemoryProfiles {
    fn fetch(&self, key: &str) -> Result<Option<DriverProfile>, StoreError> {
        let guard = self.records.lock().expect("profile mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn all(&self) -> Result<Vec<DriverProfile>, StoreError> {
        let guard = self.records.lock().expect("profile mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn upsert(&self, profile: DriverProfile) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        guard.insert(profile.email.clone(), profile);
        Ok(())
    }

    fn merge_unless_set(
        &self,
        key: &str,
        guard_paths: &[&str],
        updates: &[(String, Value)],
    ) -> Result<MergeOutcome, StoreError> {
        let mut guard = self.records.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(key).ok_or(StoreError::NotFound)?;
        if guard_paths.iter().any(|path| profile.flags.is_set(path)) {
            return Ok(MergeOutcome::AlreadySet);
        }
        for (path, value) in updates {
            profile.flags.set(path, value.clone());
        }
        profile.updated_at = Some(Utc::now());
        Ok(MergeOutcome::Applied)
    }
}

#[derive(Default)]
pub(super) struct MemoryAvailability {
    pub(super) records: Mutex<HashMap<String, AvailabilityRecord>>,
}

impl MemoryAvailability {
    pub(super) fn seed(&self, key: &str, record: AvailabilityRecord) {
        let mut guard = self.records.lock().expect("availability mutex poisoned");
        guard.insert(key.to_string(), record);
    }
}

impl AvailabilityStore for MemoryAvailability {
    fn fetch(&self, key: &str) -> Result<Option<AvailabilityRecord>, StoreError> {
        let guard = self.records.lock().expect("availability mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn all(&self) -> Result<Vec<AvailabilityRecord>, StoreError> {
        let guard = self.records.lock().expect("availability mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn upsert(&self, record: AvailabilityRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("availability mutex poisoned");
        guard.insert(record.email.clone(), record);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryVerification {
    pub(super) records: Mutex<HashMap<String, VerificationRecord>>,
}

impl MemoryVerification {
    pub(super) fn seed(&self, key: &str, record: VerificationRecord) {
        let mut guard = self.records.lock().expect("verification mutex poisoned");
        guard.insert(key.to_string(), record);
    }
}

impl VerificationStore for MemoryVerification {
    fn fetch(&self, key: &str) -> Result<Option<VerificationRecord>, StoreError> {
        let guard = self.records.lock().expect("verification mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn all(&self) -> Result<Vec<VerificationRecord>, StoreError> {
        let guard = self.records.lock().expect("verification mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn upsert(&self, record: VerificationRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("verification mutex poisoned");
        guard.insert(record.email.clone(), record);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryReports {
    pub(super) snapshots: Mutex<Vec<ReportSnapshot>>,
}

impl MemoryReports {
    pub(super) fn seed(&self, snapshot: ReportSnapshot) {
        let mut guard = self.snapshots.lock().expect("report mutex poisoned");
        guard.push(snapshot);
    }

    pub(super) fn count(&self) -> usize {
        self.snapshots.lock().expect("report mutex poisoned").len()
    }
}

impl ReportStore for MemoryReports {
    fn for_driver(&self, key: &str) -> Result<Vec<ReportSnapshot>, StoreError> {
        let guard = self.snapshots.lock().expect("report mutex poisoned");
        Ok(guard
            .iter()
            .filter(|snapshot| snapshot.email == key)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<ReportSnapshot>, StoreError> {
        let guard = self.snapshots.lock().expect("report mutex poisoned");
        Ok(guard.clone())
    }

    fn insert(&self, snapshot: ReportSnapshot) -> Result<(), StoreError> {
        let mut guard = self.snapshots.lock().expect("report mutex poisoned");
        guard.push(snapshot);
        Ok(())
    }
}

/// Availability store standing in for a flaking collection.
pub(super) struct UnavailableAvailability;

impl AvailabilityStore for UnavailableAvailability {
    fn fetch(&self, _key: &str) -> Result<Option<AvailabilityRecord>, StoreError> {
        Err(StoreError::Unavailable("availability offline".to_string()))
    }

    fn all(&self) -> Result<Vec<AvailabilityRecord>, StoreError> {
        Err(StoreError::Unavailable("availability offline".to_string()))
    }

    fn upsert(&self, _record: AvailabilityRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("availability offline".to_string()))
    }
}

pub(super) struct MemoryStores {
    pub(super) applicants: Arc<MemoryApplicants>,
    pub(super) profiles: Arc<MemoryProfiles>,
    pub(super) availability: Arc<MemoryAvailability>,
    pub(super) verification: Arc<MemoryVerification>,
    pub(super) reports: Arc<MemoryReports>,
}

impl MemoryStores {
    pub(super) fn new() -> Self {
        Self {
            applicants: Arc::new(MemoryApplicants::default()),
            profiles: Arc::new(MemoryProfiles::default()),
            availability: Arc::new(MemoryAvailability::default()),
            verification: Arc::new(MemoryVerification::default()),
            reports: Arc::new(MemoryReports::default()),
        }
    }

    pub(super) fn set(&self) -> StoreSet {
        StoreSet {
            applicants: self.applicants.clone(),
            profiles: self.profiles.clone(),
            availability: self.availability.clone(),
            verification: self.verification.clone(),
            reports: self.reports.clone(),
        }
    }
}

pub(super) fn build_service(stores: &MemoryStores) -> OnboardingService {
    OnboardingService::with_operators(
        stores.set(),
        vec![operations_admin(), support_admin()],
    )
}

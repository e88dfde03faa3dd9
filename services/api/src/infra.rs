use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use driver_onboarding::workflows::onboarding::{
    AdminPermission, AdminRole, AdminUser, ApplicantRecord, ApplicantStore, AvailabilityRecord,
    AvailabilityStore, CanonicalKey, DriverProfile, MergeOutcome, ProfileStore, ReportSnapshot,
    ReportStore, StoreError, StoreSet, VerificationRecord, VerificationStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryApplicantStore {
    records: Mutex<HashMap<String, ApplicantRecord>>,
}

impl ApplicantStore for InMemoryApplicantStore {
    fn fetch(&self, key: &str) -> Result<Option<ApplicantRecord>, StoreError> {
        let guard = self.records.lock().expect("applicant mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn all(&self) -> Result<Vec<ApplicantRecord>, StoreError> {
        let guard = self.records.lock().expect("applicant mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn upsert(&self, record: ApplicantRecord) -> Result<(), StoreError> {
        let key = CanonicalKey::new(&record.email).into_string();
        let mut guard = self.records.lock().expect("applicant mutex poisoned");
        guard.insert(key, record);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryProfileStore {
    records: Mutex<HashMap<String, DriverProfile>>,
}

impl ProfileStore for InMemoryProfileStore {
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
pub(crate) struct InMemoryAvailabilityStore {
    records: Mutex<HashMap<String, AvailabilityRecord>>,
}

impl AvailabilityStore for InMemoryAvailabilityStore {
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
pub(crate) struct InMemoryVerificationStore {
    records: Mutex<HashMap<String, VerificationRecord>>,
}

impl VerificationStore for InMemoryVerificationStore {
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
pub(crate) struct InMemoryReportStore {
    snapshots: Mutex<Vec<ReportSnapshot>>,
}

impl ReportStore for InMemoryReportStore {
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

pub(crate) fn in_memory_store_set() -> StoreSet {
    StoreSet {
        applicants: Arc::new(InMemoryApplicantStore::default()),
        profiles: Arc::new(InMemoryProfileStore::default()),
        availability: Arc::new(InMemoryAvailabilityStore::default()),
        verification: Arc::new(InMemoryVerificationStore::default()),
        reports: Arc::new(InMemoryReportStore::default()),
    }
}

/// Operator directory for the demo/default deployment. A real deployment
/// loads this from the admin identity collaborator.
pub(crate) fn default_operators() -> Vec<AdminUser> {
    vec![
        AdminUser {
            email: "ops@fleet.example".to_string(),
            role: AdminRole::Operations,
            permissions: [
                AdminPermission::ResetProgress,
                AdminPermission::PreviewReport,
            ]
            .into_iter()
            .collect(),
        },
        AdminUser {
            email: "support@fleet.example".to_string(),
            role: AdminRole::Support,
            permissions: [AdminPermission::PreviewReport].into_iter().collect(),
        },
    ]
}

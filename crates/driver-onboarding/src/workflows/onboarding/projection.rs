use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::domain::{
    ApplicantRecord, AvailabilityRecord, DriverProfile, OnboardingStatus, VerificationRecord,
};
use super::identity::KeyCandidates;
use super::progress::{self, OnboardingStage};
use super::report::ReportSnapshot;
use super::repository::{StoreError, StoreSet};

/// Merged operator-facing view of one applicant across all five stores.
///
/// `fields` carries every ApplicantRecord field overlaid with every
/// DriverProfile field (profile wins on collision); `id`/`email` are always
/// pinned to the canonical key regardless of which store's casing matched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedView {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub onboarding_status: OnboardingStatus,
    pub next_stage: OnboardingStage,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSnapshot>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("no applicant or profile for {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Deterministic "latest" rule shared by the dashboard join and the report
/// lookup path: `createdAt` descending, ties broken by `reportId` descending.
pub fn latest_snapshot(mut snapshots: Vec<ReportSnapshot>) -> Option<ReportSnapshot> {
    snapshots.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.report_id.cmp(&a.report_id))
    });
    snapshots.into_iter().next()
}

/// Joins ApplicantRecord + DriverProfile + AvailabilityRecord +
/// VerificationRecord + latest ReportSnapshot into one consistent view.
pub struct AggregationProjector {
    stores: StoreSet,
}

impl AggregationProjector {
    pub fn new(stores: StoreSet) -> Self {
        Self { stores }
    }

    /// Full dashboard batch. Each auxiliary collection is fetched exactly
    /// once into a keyed map; a failed collection degrades to empty with a
    /// warning instead of blanking the dashboard.
    pub fn project_all(&self) -> Result<Vec<MergedView>, StoreError> {
        let applicants = self.stores.applicants.all()?;

        let profiles = keyed(prefetch(self.stores.profiles.all(), "profiles"), |profile| {
            profile.email.clone()
        });
        let availability = keyed(
            prefetch(self.stores.availability.all(), "availability"),
            |record| record.email.clone(),
        );
        let verification = keyed(
            prefetch(self.stores.verification.all(), "verification"),
            |record| record.email.clone(),
        );
        let mut reports: HashMap<String, Vec<ReportSnapshot>> = HashMap::new();
        for snapshot in prefetch(self.stores.reports.all(), "reports") {
            reports
                .entry(snapshot.email.clone())
                .or_default()
                .push(snapshot);
        }

        let mut views = Vec::with_capacity(applicants.len());
        for applicant in applicants {
            let candidates = KeyCandidates::resolve(&applicant.email);
            let pinned = candidates.pin(|key| {
                profiles.contains_key(key)
                    || availability.contains_key(key)
                    || verification.contains_key(key)
                    || reports.contains_key(key)
            });

            let (profile, avail, verif, report) = match pinned {
                Some(key) => (
                    profiles.get(key).cloned(),
                    availability.get(key).cloned(),
                    verification.get(key).cloned(),
                    reports
                        .get(key)
                        .cloned()
                        .and_then(latest_snapshot),
                ),
                None => (None, None, None, None),
            };

            views.push(merge_view(
                &candidates,
                Some(applicant),
                profile,
                avail,
                verif,
                report,
            ));
        }

        // Fixed store state must always yield the same order.
        views.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(views)
    }

    /// Single-applicant view for report use. Point lookups are fine here; the
    /// pinned-key rule still applies across the sub-lookups.
    pub fn project_one(&self, email: &str) -> Result<MergedView, ProjectionError> {
        let candidates = KeyCandidates::resolve(email);

        let mut applicant = None;
        for candidate in candidates.iter() {
            if let Some(record) = self.stores.applicants.fetch(candidate)? {
                applicant = Some(record);
                break;
            }
        }

        // One candidate pins all four sub-lookups; the first key with any
        // data anywhere wins.
        let mut resolved = None;
        for candidate in candidates.iter() {
            let profile = self.stores.profiles.fetch(candidate)?;
            let availability = self.stores.availability.fetch(candidate)?;
            let verification = self.stores.verification.fetch(candidate)?;
            let reports = self.stores.reports.for_driver(candidate)?;
            if profile.is_some()
                || availability.is_some()
                || verification.is_some()
                || !reports.is_empty()
            {
                resolved = Some((profile, availability, verification, reports));
                break;
            }
        }
        let (profile, availability, verification, reports) =
            resolved.unwrap_or((None, None, None, Vec::new()));
        let report = latest_snapshot(reports);

        if applicant.is_none() && profile.is_none() {
            return Err(ProjectionError::NotFound(
                candidates.canonical().to_string(),
            ));
        }

        Ok(merge_view(
            &candidates,
            applicant,
            profile,
            availability,
            verification,
            report,
        ))
    }
}

fn merge_view(
    candidates: &KeyCandidates,
    applicant: Option<ApplicantRecord>,
    profile: Option<DriverProfile>,
    availability: Option<AvailabilityRecord>,
    verification: Option<VerificationRecord>,
    report: Option<ReportSnapshot>,
) -> MergedView {
    let canonical = candidates.canonical().as_str().to_string();

    let mut fields = applicant
        .as_ref()
        .map(document_map)
        .unwrap_or_default();
    if let Some(profile) = &profile {
        for (key, value) in document_map(profile) {
            fields.insert(key, value);
        }
        for warning in progress::out_of_order_warnings(&profile.flags) {
            warn!(
                email = %canonical,
                stage = warning.stage.key(),
                missing = warning.missing.key(),
                "stage asserted complete ahead of an earlier stage"
            );
        }
    }
    // Pinned/typed fields live on the view itself, never in the overlay.
    for pinned_field in ["id", "email", "createdAt", "updatedAt", "onboardingStatus"] {
        fields.remove(pinned_field);
    }

    let created_at = applicant
        .as_ref()
        .and_then(|record| record.created_at)
        .or_else(|| profile.as_ref().and_then(|profile| profile.created_at))
        .unwrap_or_else(Utc::now);
    let updated_at = profile.as_ref().and_then(|profile| profile.updated_at);
    let onboarding_status = profile
        .as_ref()
        .map(|profile| profile.onboarding_status)
        .unwrap_or_default();
    let next_stage = profile
        .as_ref()
        .map(progress::position)
        .unwrap_or_else(progress::ProgressPosition::start)
        .next;

    MergedView {
        id: canonical.clone(),
        email: canonical,
        created_at,
        updated_at,
        onboarding_status,
        next_stage,
        fields,
        availability,
        verification,
        report,
    }
}

fn document_map<T: Serialize>(document: &T) -> BTreeMap<String, Value> {
    match serde_json::to_value(document) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

/// One bad collection or row degrades that piece to empty; it never aborts
/// the batch.
fn prefetch<T>(result: Result<Vec<T>, StoreError>, collection: &str) -> Vec<T> {
    match result {
        Ok(records) => records,
        Err(err) => {
            warn!(%collection, error = %err, "auxiliary prefetch failed; continuing degraded");
            Vec::new()
        }
    }
}

fn keyed<T, F>(records: Vec<T>, mut key_of: F) -> HashMap<String, T>
where
    F: FnMut(&T) -> String,
{
    records
        .into_iter()
        .map(|record| (key_of(&record), record))
        .collect()
}

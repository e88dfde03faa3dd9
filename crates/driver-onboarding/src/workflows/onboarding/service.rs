use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::domain::{AdminPermission, AdminUser, ApplicantRecord, DriverProfile};
use super::identity::{CanonicalKey, KeyCandidates};
use super::ledger::{AcknowledgeOutcome, AcknowledgementLedger, LedgerError, PolicyType};
use super::progress::{self, OnboardingStage, ProgressPosition};
use super::projection::{latest_snapshot, AggregationProjector, MergedView, ProjectionError};
use super::report::{build_snapshot, ReportSnapshot, ReportSources};
use super::repository::{MergeOutcome, StoreError, StoreSet};

static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_report_id() -> String {
    let id = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("report-{id:06}")
}

/// Outcome of a generic step-completion write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub success: bool,
    pub already_completed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("operation requires an authenticated identity")]
    Auth,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("operator {0} lacks the required permission")]
    Forbidden(String),
    #[error("stage {0:?} carries no completion flag")]
    UntrackedStage(OnboardingStage),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for OnboardingError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Auth => Self::Auth,
            LedgerError::ProfileNotFound(key) => Self::NotFound(key),
            LedgerError::Store(err) => Self::Store(err),
        }
    }
}

impl From<ProjectionError> for OnboardingError {
    fn from(value: ProjectionError) -> Self {
        match value {
            ProjectionError::NotFound(key) => Self::NotFound(key),
            ProjectionError::Store(err) => Self::Store(err),
        }
    }
}

/// Facade composing the identity resolver, state machine, ledger, and
/// projector over the five stores.
pub struct OnboardingService {
    stores: StoreSet,
    ledger: AcknowledgementLedger,
    projector: AggregationProjector,
    operators: HashMap<String, AdminUser>,
}

impl OnboardingService {
    pub fn new(stores: StoreSet) -> Self {
        Self::with_operators(stores, Vec::new())
    }

    pub fn with_operators(stores: StoreSet, operators: Vec<AdminUser>) -> Self {
        let ledger = AcknowledgementLedger::new(stores.profiles.clone());
        let projector = AggregationProjector::new(stores.clone());
        let operators = operators
            .into_iter()
            .map(|operator| (CanonicalKey::new(&operator.email).into_string(), operator))
            .collect();

        Self {
            stores,
            ledger,
            projector,
            operators,
        }
    }

    /// Register an intake-sourced applicant under its canonical key.
    pub fn register_applicant(
        &self,
        mut record: ApplicantRecord,
    ) -> Result<CanonicalKey, OnboardingError> {
        let raw = record.email.trim();
        if raw.is_empty() {
            return Err(OnboardingError::Auth);
        }
        let key = CanonicalKey::new(raw);
        record.email = raw.to_string();
        self.stores.applicants.upsert(record)?;
        Ok(key)
    }

    pub fn import_applicants(
        &self,
        records: Vec<ApplicantRecord>,
    ) -> Result<usize, OnboardingError> {
        let mut imported = 0;
        for record in records {
            self.register_applicant(record)?;
            imported += 1;
        }
        Ok(imported)
    }

    /// First successful phone verification creates the profile; repeat calls
    /// only re-assert the verify flags.
    pub fn verify_phone(&self, identity: Option<&str>) -> Result<StepOutcome, OnboardingError> {
        let raw = require_identity(identity)?;
        let candidates = KeyCandidates::resolve(raw);

        let existing = self.find_profile_key(&candidates)?;
        let key = match existing {
            Some(key) => key,
            None => {
                let now = Utc::now();
                let profile = DriverProfile::new(candidates.canonical().as_str(), now);
                self.stores.profiles.upsert(profile)?;
                info!(email = %candidates.canonical(), "driver profile created");
                candidates.canonical().as_str().to_string()
            }
        };

        self.write_step(&key, OnboardingStage::Verify)
    }

    /// Generic step writer used by the in-flow UI: sets every alias of the
    /// stage's completion flag plus a timestamp, idempotently.
    pub fn complete_step(
        &self,
        stage: OnboardingStage,
        identity: Option<&str>,
    ) -> Result<StepOutcome, OnboardingError> {
        if stage.completion_aliases().is_empty() {
            return Err(OnboardingError::UntrackedStage(stage));
        }
        let raw = require_identity(identity)?;
        let candidates = KeyCandidates::resolve(raw);
        let key = self
            .find_profile_key(&candidates)?
            .ok_or_else(|| OnboardingError::NotFound(candidates.canonical().to_string()))?;

        self.write_step(&key, stage)
    }

    pub fn acknowledge(
        &self,
        policy: PolicyType,
        identity: Option<&str>,
    ) -> Result<AcknowledgeOutcome, OnboardingError> {
        Ok(self.ledger.acknowledge(policy, identity)?)
    }

    /// Reconstructed position for the in-flow UI. A missing profile is a
    /// fresh start, not an error.
    pub fn position(&self, identity: Option<&str>) -> Result<ProgressPosition, OnboardingError> {
        let raw = require_identity(identity)?;
        let candidates = KeyCandidates::resolve(raw);
        let profile = self.fetch_profile(&candidates)?;
        Ok(profile
            .as_ref()
            .map(progress::position)
            .unwrap_or_else(ProgressPosition::start))
    }

    /// Finish onboarding: generate the immutable snapshot, then flip the
    /// profile to completed with the report pointer.
    pub fn complete(&self, identity: Option<&str>) -> Result<ReportSnapshot, OnboardingError> {
        let raw = require_identity(identity)?;
        let candidates = KeyCandidates::resolve(raw);
        let mut profile = self
            .fetch_profile(&candidates)?
            .ok_or_else(|| OnboardingError::NotFound(candidates.canonical().to_string()))?;

        let snapshot = self.synthesize_snapshot(&candidates, Some(&profile))?;
        self.stores.reports.insert(snapshot.clone())?;

        let now = snapshot.created_at;
        profile.onboarding_status = super::domain::OnboardingStatus::Completed;
        profile.completed_at = Some(now);
        profile.updated_at = Some(now);
        profile.report_id = Some(snapshot.report_id.clone());
        self.stores.profiles.upsert(profile)?;

        info!(email = %candidates.canonical(), report = %snapshot.report_id, "onboarding completed");
        Ok(snapshot)
    }

    /// Admin preview: latest stored snapshot, or one synthesized on the fly
    /// (not persisted) when none exists yet.
    pub fn report_preview(
        &self,
        email: &str,
        operator: Option<&str>,
    ) -> Result<ReportSnapshot, OnboardingError> {
        self.require_operator(operator, AdminPermission::PreviewReport)?;
        let candidates = KeyCandidates::resolve(email);

        for candidate in candidates.iter() {
            let stored = latest_snapshot(self.stores.reports.for_driver(candidate)?);
            if let Some(snapshot) = stored {
                return Ok(snapshot);
            }
        }

        let profile = self.fetch_profile(&candidates)?;
        let applicant = self.fetch_applicant(&candidates)?;
        if profile.is_none() && applicant.is_none() {
            return Err(OnboardingError::NotFound(
                candidates.canonical().to_string(),
            ));
        }
        self.synthesize_snapshot(&candidates, profile.as_ref())
    }

    /// Administrative reset: clears every known alias of every progress flag
    /// (timestamps included) and reopens the profile. Snapshots are immutable
    /// history and stay behind.
    pub fn reset_progress(
        &self,
        email: &str,
        operator: Option<&str>,
    ) -> Result<(), OnboardingError> {
        self.require_operator(operator, AdminPermission::ResetProgress)?;
        let candidates = KeyCandidates::resolve(email);
        let mut profile = self
            .fetch_profile(&candidates)?
            .ok_or_else(|| OnboardingError::NotFound(candidates.canonical().to_string()))?;

        for stage in OnboardingStage::ordered() {
            for alias in stage.completion_aliases() {
                profile.flags.clear(alias);
            }
            if let Some(timestamp) = stage.completion_timestamp() {
                profile.flags.clear(timestamp);
            }
        }
        profile.onboarding_status = super::domain::OnboardingStatus::Started;
        profile.completed_at = None;
        profile.report_id = None;
        profile.updated_at = Some(Utc::now());
        self.stores.profiles.upsert(profile)?;

        info!(email = %candidates.canonical(), "onboarding progress reset");
        Ok(())
    }

    pub fn dashboard(&self) -> Result<Vec<MergedView>, OnboardingError> {
        Ok(self.projector.project_all()?)
    }

    pub fn merged(&self, email: &str) -> Result<MergedView, OnboardingError> {
        Ok(self.projector.project_one(email)?)
    }

    pub fn operator(&self, email: &str) -> Option<&AdminUser> {
        self.operators.get(CanonicalKey::new(email).as_str())
    }

    fn require_operator(
        &self,
        operator: Option<&str>,
        permission: AdminPermission,
    ) -> Result<&AdminUser, OnboardingError> {
        let raw = require_identity(operator)?;
        let admin = self
            .operator(raw)
            .ok_or(OnboardingError::Auth)?;
        if !admin.can(permission) {
            return Err(OnboardingError::Forbidden(admin.email.clone()));
        }
        Ok(admin)
    }

    fn write_step(
        &self,
        key: &str,
        stage: OnboardingStage,
    ) -> Result<StepOutcome, OnboardingError> {
        let mut updates: Vec<(String, Value)> = stage
            .completion_aliases()
            .iter()
            .map(|alias| ((*alias).to_string(), Value::Bool(true)))
            .collect();
        if let Some(timestamp) = stage.completion_timestamp() {
            updates.push((timestamp.to_string(), Value::String(Utc::now().to_rfc3339())));
        }

        match self
            .stores
            .profiles
            .merge_unless_set(key, stage.completion_aliases(), &updates)?
        {
            MergeOutcome::AlreadySet => Ok(StepOutcome {
                success: true,
                already_completed: true,
            }),
            MergeOutcome::Applied => Ok(StepOutcome {
                success: true,
                already_completed: false,
            }),
        }
    }

    fn synthesize_snapshot(
        &self,
        candidates: &KeyCandidates,
        profile: Option<&DriverProfile>,
    ) -> Result<ReportSnapshot, OnboardingError> {
        let applicant = self.fetch_applicant(candidates)?;
        let availability =
            first_match(candidates, |key| self.stores.availability.fetch(key))?;
        let verification =
            first_match(candidates, |key| self.stores.verification.fetch(key))?;

        let sources = ReportSources {
            applicant: applicant.as_ref(),
            profile,
            availability: availability.as_ref(),
            verification: verification.as_ref(),
        };
        Ok(build_snapshot(
            next_report_id(),
            candidates.canonical().as_str(),
            &sources,
            Utc::now(),
        ))
    }

    fn fetch_profile(
        &self,
        candidates: &KeyCandidates,
    ) -> Result<Option<DriverProfile>, StoreError> {
        first_match(candidates, |key| self.stores.profiles.fetch(key))
    }

    fn fetch_applicant(
        &self,
        candidates: &KeyCandidates,
    ) -> Result<Option<ApplicantRecord>, StoreError> {
        first_match(candidates, |key| self.stores.applicants.fetch(key))
    }

    fn find_profile_key(
        &self,
        candidates: &KeyCandidates,
    ) -> Result<Option<String>, StoreError> {
        for candidate in candidates.iter() {
            if self.stores.profiles.fetch(candidate)?.is_some() {
                return Ok(Some(candidate.to_string()));
            }
        }
        Ok(None)
    }
}

fn first_match<T, F>(candidates: &KeyCandidates, fetch: F) -> Result<Option<T>, StoreError>
where
    F: Fn(&str) -> Result<Option<T>, StoreError>,
{
    for candidate in candidates.iter() {
        if let Some(value) = fetch(candidate)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn require_identity(identity: Option<&str>) -> Result<&str, OnboardingError> {
    identity
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(OnboardingError::Auth)
}

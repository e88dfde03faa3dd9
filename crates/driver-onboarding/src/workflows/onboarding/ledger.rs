use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identity::KeyCandidates;
use super::progress::OnboardingStage;
use super::repository::{MergeOutcome, ProfileStore, StoreError};

/// Policies a driver must acknowledge during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    FeeStructure,
    Liabilities,
    CancellationPolicy,
    PaymentCycleSchedule,
}

impl PolicyType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::FeeStructure,
            Self::Liabilities,
            Self::CancellationPolicy,
            Self::PaymentCycleSchedule,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FeeStructure => "Fee Structure",
            Self::Liabilities => "Liabilities",
            Self::CancellationPolicy => "Cancellation Policy",
            Self::PaymentCycleSchedule => "Payment Cycle & Schedule",
        }
    }

    pub const fn stage(self) -> OnboardingStage {
        match self {
            Self::FeeStructure => OnboardingStage::FeeStructure,
            Self::Liabilities => OnboardingStage::Liabilities,
            Self::CancellationPolicy => OnboardingStage::CancellationPolicy,
            Self::PaymentCycleSchedule => OnboardingStage::PaymentCycleSchedule,
        }
    }

    /// Canonical plus legacy flag names; the ledger writes all of them.
    pub const fn alias_flags(self) -> &'static [&'static str] {
        self.stage().completion_aliases()
    }

    pub const fn timestamp_flag(self) -> &'static str {
        match self {
            Self::FeeStructure => "feeStructureAcknowledgedAt",
            Self::Liabilities => "liabilitiesAcknowledgedAt",
            Self::CancellationPolicy => "cancellationPolicyAcknowledgedAt",
            Self::PaymentCycleSchedule => "paymentCycleScheduleAcknowledgedAt",
        }
    }
}

/// Outcome of an acknowledgement call. Duplicate acknowledgement is never an
/// error condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeOutcome {
    pub success: bool,
    pub already_acknowledged: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("acknowledgement requires an authenticated identity")]
    Auth,
    #[error("no driver profile for {0}")]
    ProfileNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Records a policy acknowledgement exactly once per policy type.
///
/// The write path is a single conditional merge keyed on the alias group's
/// current truth value, so a repeat call can never regress or re-timestamp
/// an acknowledgement, including under concurrent first calls.
pub struct AcknowledgementLedger {
    profiles: Arc<dyn ProfileStore>,
}

impl AcknowledgementLedger {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    pub fn acknowledge(
        &self,
        policy: PolicyType,
        identity: Option<&str>,
    ) -> Result<AcknowledgeOutcome, LedgerError> {
        let raw = identity
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(LedgerError::Auth)?;

        let candidates = KeyCandidates::resolve(raw);
        let mut resolved = None;
        for candidate in candidates.iter() {
            if self.profiles.fetch(candidate)?.is_some() {
                resolved = Some(candidate.to_string());
                break;
            }
        }
        let key = resolved
            .ok_or_else(|| LedgerError::ProfileNotFound(candidates.canonical().to_string()))?;

        let updates = acknowledgement_updates(policy);
        match self
            .profiles
            .merge_unless_set(&key, policy.alias_flags(), &updates)?
        {
            MergeOutcome::AlreadySet => Ok(AcknowledgeOutcome {
                success: true,
                already_acknowledged: true,
            }),
            MergeOutcome::Applied => Ok(AcknowledgeOutcome {
                success: true,
                already_acknowledged: false,
            }),
        }
    }
}

fn acknowledgement_updates(policy: PolicyType) -> Vec<(String, Value)> {
    let mut updates: Vec<(String, Value)> = policy
        .alias_flags()
        .iter()
        .map(|flag| ((*flag).to_string(), Value::Bool(true)))
        .collect();
    updates.push((
        policy.timestamp_flag().to_string(),
        Value::String(Utc::now().to_rfc3339()),
    ));
    updates
}

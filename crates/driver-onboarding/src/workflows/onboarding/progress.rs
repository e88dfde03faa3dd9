use serde::{Deserialize, Serialize};

use super::domain::{DriverProfile, FlagBag, OnboardingStatus};

/// Ordered onboarding stages. `Welcome` is initial; `Completed` is terminal
/// and forces a fresh start in the surrounding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    Welcome,
    Verify,
    ConfirmDetails,
    Introduction,
    About,
    Role,
    Availability,
    FacilityLocations,
    BlocksClassification,
    FeeStructure,
    PaymentCycleSchedule,
    RoutesPolicy,
    CancellationPolicy,
    SmokingFitnessCheck,
    Liabilities,
    AcknowledgementsSummary,
    Completed,
}

impl OnboardingStage {
    pub const fn ordered() -> [Self; 17] {
        [
            Self::Welcome,
            Self::Verify,
            Self::ConfirmDetails,
            Self::Introduction,
            Self::About,
            Self::Role,
            Self::Availability,
            Self::FacilityLocations,
            Self::BlocksClassification,
            Self::FeeStructure,
            Self::PaymentCycleSchedule,
            Self::RoutesPolicy,
            Self::CancellationPolicy,
            Self::SmokingFitnessCheck,
            Self::Liabilities,
            Self::AcknowledgementsSummary,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Verify => "Verify",
            Self::ConfirmDetails => "Confirm Details",
            Self::Introduction => "Introduction",
            Self::About => "About",
            Self::Role => "Role",
            Self::Availability => "Availability",
            Self::FacilityLocations => "Facility Locations",
            Self::BlocksClassification => "Blocks Classification",
            Self::FeeStructure => "Fee Structure",
            Self::PaymentCycleSchedule => "Payment Cycle & Schedule",
            Self::RoutesPolicy => "How Routes Work",
            Self::CancellationPolicy => "Cancellation Policy",
            Self::SmokingFitnessCheck => "Smoking & Fitness Check",
            Self::Liabilities => "Liabilities",
            Self::AcknowledgementsSummary => "Acknowledgements Summary",
            Self::Completed => "Completed",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Verify => "verify",
            Self::ConfirmDetails => "confirm_details",
            Self::Introduction => "introduction",
            Self::About => "about",
            Self::Role => "role",
            Self::Availability => "availability",
            Self::FacilityLocations => "facility_locations",
            Self::BlocksClassification => "blocks_classification",
            Self::FeeStructure => "fee_structure",
            Self::PaymentCycleSchedule => "payment_cycle_schedule",
            Self::RoutesPolicy => "routes_policy",
            Self::CancellationPolicy => "cancellation_policy",
            Self::SmokingFitnessCheck => "smoking_fitness_check",
            Self::Liabilities => "liabilities",
            Self::AcknowledgementsSummary => "acknowledgements_summary",
            Self::Completed => "completed",
        }
    }

    /// Every field name observed to assert this stage's completion. The same
    /// semantic fact accumulated up to three differently-named aliases over
    /// the product's history; any one of them counts.
    pub const fn completion_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Welcome | Self::AcknowledgementsSummary | Self::Completed => &[],
            Self::Verify => &["phoneVerified", "progress_verify.confirmed"],
            Self::ConfirmDetails => &["detailsConfirmed", "progress_confirm_details.confirmed"],
            Self::Introduction => {
                &["introductionAcknowledged", "progress_introduction.confirmed"]
            }
            Self::About => &["aboutAcknowledged", "progress_about.confirmed"],
            Self::Role => &["roleAcknowledged", "progress_role.confirmed"],
            Self::Availability => &["progress_availability.confirmed"],
            Self::FacilityLocations => &[
                "facilityLocationsAcknowledged",
                "progress_facility_locations.confirmed",
            ],
            Self::BlocksClassification => &["blocksClassificationAcknowledged"],
            Self::FeeStructure => &[
                "acknowledgedFeeStructure",
                "feeStructureAcknowledged",
                "progress_fee_structure.confirmed",
            ],
            Self::PaymentCycleSchedule => &[
                "acknowledgedPaymentCycleSchedule",
                "paymentCycleScheduleAcknowledged",
            ],
            Self::RoutesPolicy => {
                &["routesPolicyAcknowledged", "progress_routes_policy.confirmed"]
            }
            Self::CancellationPolicy => &[
                "acknowledgedCancellationPolicy",
                "cancellationPolicyAcknowledged",
                "progress_cancellation_policy.confirmed",
            ],
            Self::SmokingFitnessCheck => &["progress_smoking_fitness_check.confirmed"],
            Self::Liabilities => &["acknowledgedLiabilities", "progress_liabilities.confirmed"],
        }
    }

    /// Where the step writer records the completion time for this stage.
    pub const fn completion_timestamp(self) -> Option<&'static str> {
        match self {
            Self::Welcome | Self::AcknowledgementsSummary | Self::Completed => None,
            Self::Verify => Some("phoneVerifiedAt"),
            Self::ConfirmDetails => Some("detailsConfirmedAt"),
            Self::Introduction => Some("introductionAcknowledgedAt"),
            Self::About => Some("aboutAcknowledgedAt"),
            Self::Role => Some("roleAcknowledgedAt"),
            Self::Availability => Some("progress_availability.timestamp"),
            Self::FacilityLocations => Some("facilityLocationsAcknowledgedAt"),
            Self::BlocksClassification => Some("blocksClassificationAcknowledgedAt"),
            Self::FeeStructure => Some("feeStructureAcknowledgedAt"),
            Self::PaymentCycleSchedule => Some("paymentCycleScheduleAcknowledgedAt"),
            Self::RoutesPolicy => Some("routesPolicyAcknowledgedAt"),
            Self::CancellationPolicy => Some("cancellationPolicyAcknowledgedAt"),
            Self::SmokingFitnessCheck => Some("progress_smoking_fitness_check.timestamp"),
            Self::Liabilities => Some("liabilitiesAcknowledgedAt"),
        }
    }
}

/// Stages that must all be asserted complete before the acknowledgements
/// summary becomes reachable. Reaching the summary needs every policy step,
/// not just the latest one.
pub const SUMMARY_PREREQUISITES: [OnboardingStage; 6] = [
    OnboardingStage::Liabilities,
    OnboardingStage::BlocksClassification,
    OnboardingStage::FeeStructure,
    OnboardingStage::RoutesPolicy,
    OnboardingStage::CancellationPolicy,
    OnboardingStage::SmokingFitnessCheck,
];

/// Reconstructed position in the onboarding flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPosition {
    /// Latest stage asserted complete, scanning backward. `None` for a fresh
    /// (or completed-and-restarting) applicant.
    pub completed: Option<OnboardingStage>,
    pub next: OnboardingStage,
}

impl ProgressPosition {
    pub const fn start() -> Self {
        Self {
            completed: None,
            next: OnboardingStage::Welcome,
        }
    }
}

/// A stage asserted complete while an earlier stage shows no completion
/// under any alias. Stage selection does not reject these; callers surface
/// them as validation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressWarning {
    pub stage: OnboardingStage,
    pub missing: OnboardingStage,
}

pub fn summary_prerequisites_met(flags: &FlagBag) -> bool {
    SUMMARY_PREREQUISITES
        .iter()
        .all(|stage| flags.any_set(stage.completion_aliases()))
}

/// Pure resolution of the resume point from the flag bag alone.
///
/// Walks the stage list in reverse; the first stage asserted complete
/// determines the next stage. The transition into the acknowledgements
/// summary is the one conjunctive test: every summary prerequisite must hold.
pub fn resume_point(flags: &FlagBag) -> ProgressPosition {
    let stages = OnboardingStage::ordered();
    for (index, stage) in stages.iter().enumerate().rev() {
        let complete = match stage {
            OnboardingStage::Liabilities => summary_prerequisites_met(flags),
            _ => flags.any_set(stage.completion_aliases()),
        };
        if complete {
            let next = stages
                .get(index + 1)
                .copied()
                .unwrap_or(OnboardingStage::Completed);
            return ProgressPosition {
                completed: Some(*stage),
                next,
            };
        }
    }
    ProgressPosition::start()
}

/// Position for a profile. A completed profile restarts rather than resumes:
/// the machine reports WELCOME and the caller treats it as a fresh flow.
pub fn position(profile: &DriverProfile) -> ProgressPosition {
    if profile.onboarding_status == OnboardingStatus::Completed {
        return ProgressPosition::start();
    }
    resume_point(&profile.flags)
}

/// Every (later stage asserted, earlier stage absent) pair in the bag.
pub fn out_of_order_warnings(flags: &FlagBag) -> Vec<ProgressWarning> {
    let stages = OnboardingStage::ordered();
    let mut warnings = Vec::new();
    for (index, stage) in stages.iter().enumerate() {
        if stage.completion_aliases().is_empty() || !flags.any_set(stage.completion_aliases()) {
            continue;
        }
        for earlier in &stages[..index] {
            if earlier.completion_aliases().is_empty() {
                continue;
            }
            if !flags.any_set(earlier.completion_aliases()) {
                warnings.push(ProgressWarning {
                    stage: *stage,
                    missing: *earlier,
                });
            }
        }
    }
    warnings
}

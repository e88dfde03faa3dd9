use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::common::{applicant, at, profile, snapshot, MemoryStores, UnavailableAvailability};
use crate::workflows::onboarding::domain::{AvailabilityRecord, VerificationRecord};
use crate::workflows::onboarding::projection::{
    latest_snapshot, AggregationProjector, ProjectionError,
};
use crate::workflows::onboarding::repository::{ApplicantStore, StoreSet};

fn projector(stores: &MemoryStores) -> AggregationProjector {
    AggregationProjector::new(stores.set())
}

#[test]
fn latest_snapshot_prefers_the_newest_created_at() {
    let older = snapshot("a@b.com", "report-000001", at(2025, 6, 1, 8));
    let newer = snapshot("a@b.com", "report-000002", at(2025, 6, 2, 8));

    let latest = latest_snapshot(vec![older, newer.clone()]).expect("snapshot chosen");
    assert_eq!(latest.report_id, newer.report_id);
}

#[test]
fn latest_snapshot_breaks_created_at_ties_deterministically() {
    let first = snapshot("a@b.com", "report-000003", at(2025, 6, 2, 8));
    let second = snapshot("a@b.com", "report-000004", at(2025, 6, 2, 8));

    let latest =
        latest_snapshot(vec![first.clone(), second.clone()]).expect("snapshot chosen");
    assert_eq!(latest.report_id, "report-000004");

    let reversed = latest_snapshot(vec![second, first]).expect("snapshot chosen");
    assert_eq!(reversed.report_id, "report-000004");
}

#[test]
fn profile_fields_override_applicant_fields_except_the_pinned_key() {
    let stores = MemoryStores::new();
    stores
        .applicants
        .upsert(applicant("A@B.com"))
        .expect("applicant stored");

    let mut driver = profile("a@b.com");
    driver.flags.set("city", Value::String("Manchester".to_string()));
    stores.profiles.seed("a@b.com", driver);

    let views = projector(&stores).project_all().expect("projection succeeds");
    assert_eq!(views.len(), 1);

    let view = &views[0];
    assert_eq!(view.email, "a@b.com");
    assert_eq!(view.id, "a@b.com");
    assert_eq!(view.fields.get("city"), Some(&json!("Manchester")));
    assert_eq!(view.fields.get("country"), Some(&json!("UK")));
}

#[test]
fn one_resolved_key_serves_every_sub_lookup() {
    let stores = MemoryStores::new();
    // The intake row keeps the original casing in the email field but sits
    // under the normalized key; every other store was written pre-normalization.
    stores
        .applicants
        .upsert(applicant("A@B.com"))
        .expect("applicant stored");
    stores.profiles.seed("A@B.com", profile("A@B.com"));
    stores.availability.seed(
        "A@B.com",
        AvailabilityRecord {
            email: "A@B.com".to_string(),
            days: BTreeMap::from([("monday".to_string(), vec!["am".to_string()])]),
            updated_at: None,
        },
    );
    stores.verification.seed(
        "A@B.com",
        VerificationRecord {
            email: "A@B.com".to_string(),
            verified: true,
            method: Some("sms".to_string()),
            verified_at: Some(at(2025, 5, 2, 9)),
            details: BTreeMap::new(),
        },
    );
    stores
        .reports
        .seed(snapshot("A@B.com", "report-000005", at(2025, 6, 1, 8)));

    let views = projector(&stores).project_all().expect("projection succeeds");
    let view = &views[0];

    assert_eq!(view.email, "a@b.com", "output email pins the canonical key");
    assert!(view.availability.is_some());
    assert!(view.verification.is_some());
    assert!(view.report.is_some());
}

#[test]
fn unmatched_applicants_degrade_to_an_empty_view() {
    let stores = MemoryStores::new();
    stores
        .applicants
        .upsert(applicant("solo@example.com"))
        .expect("applicant stored");

    let views = projector(&stores).project_all().expect("projection succeeds");
    let view = &views[0];

    assert!(view.availability.is_none());
    assert!(view.verification.is_none());
    assert!(view.report.is_none());
    assert_eq!(view.next_stage.key(), "welcome");
}

#[test]
fn a_failing_auxiliary_collection_does_not_blank_the_dashboard() {
    let stores = MemoryStores::new();
    stores
        .applicants
        .upsert(applicant("driver@example.com"))
        .expect("applicant stored");
    stores
        .profiles
        .seed("driver@example.com", profile("driver@example.com"));

    let set = StoreSet {
        availability: std::sync::Arc::new(UnavailableAvailability),
        ..stores.set()
    };
    let views = AggregationProjector::new(set)
        .project_all()
        .expect("projection continues degraded");

    assert_eq!(views.len(), 1);
    assert!(views[0].availability.is_none());
}

#[test]
fn output_is_sorted_newest_first_and_repeatable() {
    let stores = MemoryStores::new();
    let mut first = applicant("early@example.com");
    first.created_at = Some(at(2025, 4, 1, 9));
    let mut second = applicant("late@example.com");
    second.created_at = Some(at(2025, 5, 20, 9));
    let mut third = applicant("tied@example.com");
    third.created_at = Some(at(2025, 5, 20, 9));
    stores.applicants.upsert(first).expect("stored");
    stores.applicants.upsert(second).expect("stored");
    stores.applicants.upsert(third).expect("stored");

    let projector = projector(&stores);
    let once = projector.project_all().expect("projection succeeds");
    let twice = projector.project_all().expect("projection succeeds");

    let emails: Vec<&str> = once.iter().map(|view| view.email.as_str()).collect();
    assert_eq!(
        emails,
        vec!["late@example.com", "tied@example.com", "early@example.com"]
    );

    let first_pass = serde_json::to_value(&once).expect("serializes");
    let second_pass = serde_json::to_value(&twice).expect("serializes");
    assert_eq!(first_pass, second_pass);
}

#[test]
fn created_at_falls_back_to_the_profile() {
    let stores = MemoryStores::new();
    let mut record = applicant("driver@example.com");
    record.created_at = None;
    stores.applicants.upsert(record).expect("stored");
    stores
        .profiles
        .seed("driver@example.com", profile("driver@example.com"));

    let views = projector(&stores).project_all().expect("projection succeeds");
    assert_eq!(views[0].created_at, at(2025, 5, 1, 10));
}

#[test]
fn project_one_requires_an_applicant_or_a_profile() {
    let stores = MemoryStores::new();

    match projector(&stores).project_one("ghost@example.com") {
        Err(ProjectionError::NotFound(key)) => assert_eq!(key, "ghost@example.com"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn project_one_builds_a_view_from_the_profile_alone() {
    let stores = MemoryStores::new();
    let mut driver = profile("orphan@example.com");
    driver.flags.set("phoneVerified", Value::Bool(true));
    stores.profiles.seed("orphan@example.com", driver);

    let view = projector(&stores)
        .project_one("Orphan@Example.com")
        .expect("projection succeeds");
    assert_eq!(view.email, "orphan@example.com");
    assert_eq!(view.next_stage.key(), "confirm_details");
}

#[test]
fn project_one_returns_the_latest_report() {
    let stores = MemoryStores::new();
    stores
        .applicants
        .upsert(applicant("driver@example.com"))
        .expect("stored");
    stores
        .reports
        .seed(snapshot("driver@example.com", "report-000006", at(2025, 6, 1, 8)));
    stores
        .reports
        .seed(snapshot("driver@example.com", "report-000007", at(2025, 6, 3, 8)));

    let view = projector(&stores)
        .project_one("driver@example.com")
        .expect("projection succeeds");
    assert_eq!(
        view.report.as_ref().map(|report| report.report_id.as_str()),
        Some("report-000007")
    );
}

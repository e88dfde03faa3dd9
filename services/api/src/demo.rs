use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::infra::{default_operators, in_memory_store_set};
use driver_onboarding::error::AppError;
use driver_onboarding::workflows::intake::ApplicantImporter;
use driver_onboarding::workflows::onboarding::{
    OnboardingService, OnboardingStage, PolicyType,
};

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    /// Applicant intake CSV export to project
    #[arg(long)]
    pub(crate) intake: PathBuf,
    /// Project a single driver instead of the full dashboard
    #[arg(long)]
    pub(crate) driver: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the administrative reset at the end of the demo
    #[arg(long)]
    pub(crate) skip_reset: bool,
}

const DEMO_EXPORT: &str = "\
Email,Phone,Name,Applicant Id,Funnel Id,Stage,Status,City,Country,Payload,Created At
Asha.Patel@Example.com,+447700900123,Asha Patel,apl-001,funnel-07,interview,active,Leeds,UK,\"{\"\"driver\"\": {\"\"vehicleType\"\": \"\"Large Van\"\"}}\",2025-05-01T09:30:00Z
marko@example.com,+447700900456,Marko Ilic,apl-002,funnel-07,applied,active,Leeds,UK,\"{\"\"vehicle\"\": \"\"Saloon\"\"}\",2025-05-03T14:00:00Z
";

const DEMO_DRIVER: &str = "Asha.Patel@Example.com";
const DEMO_OPERATOR: &str = "ops@fleet.example";

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let service = build_service();
    let records = ApplicantImporter::from_path(&args.intake)?;
    let imported = service.import_applicants(records)?;
    println!("imported {imported} applicants from {}", args.intake.display());

    match args.driver {
        Some(driver) => {
            let view = service.merged(&driver)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
            );
        }
        None => {
            let views = service.dashboard()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&views).unwrap_or_else(|_| "[]".to_string())
            );
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_service();

    println!("== intake ==");
    let records = ApplicantImporter::from_reader(Cursor::new(DEMO_EXPORT))?;
    let imported = service.import_applicants(records)?;
    println!("imported {imported} applicants");

    println!("\n== onboarding flow for {DEMO_DRIVER} ==");
    service.verify_phone(Some(DEMO_DRIVER))?;
    print_position(&service)?;

    for stage in [
        OnboardingStage::ConfirmDetails,
        OnboardingStage::Introduction,
        OnboardingStage::About,
        OnboardingStage::Role,
        OnboardingStage::Availability,
        OnboardingStage::FacilityLocations,
        OnboardingStage::BlocksClassification,
        OnboardingStage::RoutesPolicy,
        OnboardingStage::SmokingFitnessCheck,
    ] {
        service.complete_step(stage, Some(DEMO_DRIVER))?;
        println!("completed step: {}", stage.label());
    }

    for policy in [
        PolicyType::FeeStructure,
        PolicyType::PaymentCycleSchedule,
        PolicyType::CancellationPolicy,
        PolicyType::Liabilities,
    ] {
        let outcome = service.acknowledge(policy, Some(DEMO_DRIVER))?;
        println!(
            "acknowledged {} (already acknowledged: {})",
            policy.label(),
            outcome.already_acknowledged
        );
    }
    let repeat = service.acknowledge(PolicyType::FeeStructure, Some(DEMO_DRIVER))?;
    println!(
        "re-acknowledged {} (already acknowledged: {})",
        PolicyType::FeeStructure.label(),
        repeat.already_acknowledged
    );
    print_position(&service)?;

    println!("\n== completion ==");
    let snapshot = service.complete(Some(DEMO_DRIVER))?;
    println!(
        "generated {} for {} (vehicle: {})",
        snapshot.report_id, snapshot.email, snapshot.driver_info.vehicle_type
    );

    println!("\n== operator dashboard ==");
    for view in service.dashboard()? {
        println!(
            "{} | status: {} | next stage: {} | report: {}",
            view.email,
            view.onboarding_status.label(),
            view.next_stage.label(),
            view.report
                .as_ref()
                .map(|report| report.report_id.as_str())
                .unwrap_or("-")
        );
    }

    if !args.skip_reset {
        println!("\n== administrative reset ==");
        service.reset_progress(DEMO_DRIVER, Some(DEMO_OPERATOR))?;
        print_position(&service)?;
    }

    Ok(())
}

fn build_service() -> Arc<OnboardingService> {
    Arc::new(OnboardingService::with_operators(
        in_memory_store_set(),
        default_operators(),
    ))
}

fn print_position(service: &OnboardingService) -> Result<(), AppError> {
    let position = service.position(Some(DEMO_DRIVER))?;
    match position.completed {
        Some(stage) => println!(
            "position: completed {} -> next {}",
            stage.label(),
            position.next.label()
        ),
        None => println!("position: next {}", position.next.label()),
    }
    Ok(())
}

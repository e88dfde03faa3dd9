use crate::cli::ServeArgs;
use crate::infra::{default_operators, in_memory_store_set, AppState};
use crate::routes::with_onboarding_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use driver_onboarding::config::AppConfig;
use driver_onboarding::error::AppError;
use driver_onboarding::telemetry;
use driver_onboarding::workflows::intake::ApplicantImporter;
use driver_onboarding::workflows::onboarding::OnboardingService;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(OnboardingService::with_operators(
        in_memory_store_set(),
        default_operators(),
    ));

    if let Some(path) = args.intake.take() {
        let records = ApplicantImporter::from_path(&path)?;
        let imported = service.import_applicants(records)?;
        info!(path = %path.display(), imported, "seeded applicants from intake export");
    }

    let app = with_onboarding_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "driver onboarding service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{applicant, build_service, profile, MemoryStores};
use crate::workflows::onboarding::repository::ApplicantStore;
use crate::workflows::onboarding::router::onboarding_router;

fn router(stores: &MemoryStores) -> axum::Router {
    onboarding_router(Arc::new(build_service(stores)))
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn acknowledge_without_identity_is_unauthorized() {
    let stores = MemoryStores::new();

    let response = router(&stores)
        .oneshot(json_request(
            "POST",
            "/api/v1/onboarding/acknowledgements",
            json!({ "policy": "fee_structure" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn acknowledge_happy_path_reports_the_outcome() {
    let stores = MemoryStores::new();
    stores
        .profiles
        .seed("driver@example.com", profile("driver@example.com"));

    let mut request = json_request(
        "POST",
        "/api/v1/onboarding/acknowledgements",
        json!({ "policy": "fee_structure" }),
    );
    request
        .headers_mut()
        .insert("x-driver-email", "driver@example.com".parse().expect("header"));

    let response = router(&stores).oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["alreadyAcknowledged"], json!(false));
}

#[tokio::test]
async fn acknowledge_for_an_unknown_profile_is_not_found() {
    let stores = MemoryStores::new();

    let mut request = json_request(
        "POST",
        "/api/v1/onboarding/acknowledgements",
        json!({ "policy": "liabilities" }),
    );
    request
        .headers_mut()
        .insert("x-driver-email", "ghost@example.com".parse().expect("header"));

    let response = router(&stores).oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_lists_merged_views() {
    let stores = MemoryStores::new();
    stores
        .applicants
        .upsert(applicant("driver@example.com"))
        .expect("stored");

    let response = router(&stores)
        .oneshot(
            Request::builder()
                .uri("/api/v1/drivers")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    let views = body.as_array().expect("array payload");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["email"], json!("driver@example.com"));
    assert_eq!(views[0]["nextStage"], json!("welcome"));
}

#[tokio::test]
async fn report_endpoint_enforces_the_operator_gate() {
    let stores = MemoryStores::new();
    stores
        .profiles
        .seed("driver@example.com", profile("driver@example.com"));

    let bare = Request::builder()
        .uri("/api/v1/drivers/driver@example.com/report")
        .body(Body::empty())
        .expect("request builds");
    let response = router(&stores).oneshot(bare).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut allowed = Request::builder()
        .uri("/api/v1/drivers/driver@example.com/report")
        .body(Body::empty())
        .expect("request builds");
    allowed
        .headers_mut()
        .insert("x-operator-email", "support@fleet.example".parse().expect("header"));
    let response = router(&stores)
        .oneshot(allowed)
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["email"], json!("driver@example.com"));
}

#[tokio::test]
async fn reset_requires_the_reset_permission() {
    let stores = MemoryStores::new();
    stores
        .profiles
        .seed("driver@example.com", profile("driver@example.com"));

    let mut forbidden = Request::builder()
        .method("POST")
        .uri("/api/v1/drivers/driver@example.com/reset")
        .body(Body::empty())
        .expect("request builds");
    forbidden
        .headers_mut()
        .insert("x-operator-email", "support@fleet.example".parse().expect("header"));
    let response = router(&stores)
        .oneshot(forbidden)
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut allowed = Request::builder()
        .method("POST")
        .uri("/api/v1/drivers/driver@example.com/reset")
        .body(Body::empty())
        .expect("request builds");
    allowed
        .headers_mut()
        .insert("x-operator-email", "ops@fleet.example".parse().expect("header"));
    let response = router(&stores)
        .oneshot(allowed)
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_and_position_drive_the_flow() {
    let stores = MemoryStores::new();
    let app = router(&stores);

    let mut verify = Request::builder()
        .method("POST")
        .uri("/api/v1/onboarding/verify")
        .body(Body::empty())
        .expect("request builds");
    verify
        .headers_mut()
        .insert("x-driver-email", "driver@example.com".parse().expect("header"));
    let response = app
        .clone()
        .oneshot(verify)
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let mut position = Request::builder()
        .uri("/api/v1/onboarding/position")
        .body(Body::empty())
        .expect("request builds");
    position
        .headers_mut()
        .insert("x-driver-email", "driver@example.com".parse().expect("header"));
    let response = app.oneshot(position).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["completed"], json!("verify"));
    assert_eq!(body["next"], json!("confirm_details"));
}

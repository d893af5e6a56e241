mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
#[serial_test::serial]
async fn create_and_scale_deployment() {
    let (state, _dir, _launcher) = common::test_state().await;
    state.engine.registry().install(common::demo_manifest("demo")).await.expect("install plugin");
    let app = volant_api::create_app(state.clone());

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/deployments")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "fleet", "plugin": "demo", "replicas": 2}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let vms = state.engine.list_vms(&Default::default()).await.unwrap();
    assert_eq!(vms.vms.len(), 2);
    assert!(vms.vms.iter().any(|v| v.name == "fleet-1"));
    assert!(vms.vms.iter().any(|v| v.name == "fleet-2"));

    let scale = Request::builder()
        .method("PATCH")
        .uri("/api/v1/deployments/fleet")
        .header("content-type", "application/json")
        .body(Body::from(json!({"replicas": 1}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(scale).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let vms = state.engine.list_vms(&Default::default()).await.unwrap();
    assert_eq!(vms.vms.len(), 1);
    assert_eq!(vms.vms[0].name, "fleet-1");

    let delete = Request::builder().method("DELETE").uri("/api/v1/deployments/fleet").body(Body::empty()).unwrap();
    let response = app.oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let vms = state.engine.list_vms(&Default::default()).await.unwrap();
    assert!(vms.vms.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn list_deployments_reports_total() {
    let (state, _dir, _launcher) = common::test_state().await;
    state.engine.registry().install(common::demo_manifest("demo")).await.expect("install plugin");
    let app = volant_api::create_app(state);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/deployments")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "fleet", "plugin": "demo", "replicas": 1}).to_string()))
        .unwrap();
    app.clone().oneshot(create).await.unwrap();

    let list = Request::builder().uri("/api/v1/deployments").body(Body::empty()).unwrap();
    let response = app.oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let listed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["total"], 1);
}

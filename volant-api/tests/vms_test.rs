mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use volant_core::vm::{Vm, VmStatus};

#[tokio::test]
#[serial_test::serial]
async fn create_list_and_fetch_vm() {
    let (state, _dir, _launcher) = common::test_state().await;
    state.engine.registry().install(common::demo_manifest("demo")).await.expect("install plugin");
    let app = volant_api::create_app(state);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/vms")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "web-1", "plugin": "demo"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let vm: Vm = serde_json::from_slice(&body).unwrap();
    assert_eq!(vm.name, "web-1");
    assert_eq!(vm.status, VmStatus::Pending);

    let list = Request::builder().uri("/api/v1/vms").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-total-count").unwrap(), "1");

    let get = Request::builder().uri("/api/v1/vms/web-1").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let missing = Request::builder().uri("/api/v1/vms/nope").body(Body::empty()).unwrap();
    let response = app.oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial_test::serial]
async fn create_vm_rejects_unknown_plugin() {
    let (state, _dir, _launcher) = common::test_state().await;
    let app = volant_api::create_app(state);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/vms")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "web-1", "plugin": "missing"}).to_string()))
        .unwrap();
    let response = app.oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial_test::serial]
async fn start_stop_restart_roundtrip() {
    let (state, _dir, launcher) = common::test_state().await;
    state.engine.registry().install(common::demo_manifest("demo")).await.expect("install plugin");
    let app = volant_api::create_app(state.clone());

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/vms")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "web-2", "plugin": "demo"}).to_string()))
        .unwrap();
    app.clone().oneshot(create).await.unwrap();

    let start = Request::builder().method("POST").uri("/api/v1/vms/web-2/start").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(start).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let vm: Vm = serde_json::from_slice(&body).unwrap();
    assert_eq!(vm.status, VmStatus::Running);

    let stop = Request::builder().method("POST").uri("/api/v1/vms/web-2/stop").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(stop).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(launcher.was_stopped(vm.id));

    let destroy = Request::builder().method("DELETE").uri("/api/v1/vms/web-2").body(Body::empty()).unwrap();
    let response = app.oneshot(destroy).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let vms = state.engine.list_vms(&Default::default()).await.unwrap();
    assert!(vms.vms.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn update_config_reports_restart_required() {
    let (state, _dir, _launcher) = common::test_state().await;
    state.engine.registry().install(common::demo_manifest("demo")).await.expect("install plugin");
    let app = volant_api::create_app(state);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/vms")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "web-3", "plugin": "demo"}).to_string()))
        .unwrap();
    app.clone().oneshot(create).await.unwrap();

    let patch = Request::builder()
        .method("PATCH")
        .uri("/api/v1/vms/web-3/config")
        .header("content-type", "application/json")
        .body(Body::from(json!({"cpu": 4}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(patch).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let update: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(update["restart_required"], true);
    assert_eq!(update["version"], 2);

    let history = Request::builder().uri("/api/v1/vms/web-3/config/history").body(Body::empty()).unwrap();
    let response = app.oneshot(history).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let entries: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
}

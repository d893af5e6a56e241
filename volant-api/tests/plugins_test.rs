mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
#[serial_test::serial]
async fn install_list_and_toggle_plugin() {
    let (state, _dir, _launcher) = common::test_state().await;
    let app = volant_api::create_app(state);

    let manifest = common::demo_manifest("demo");
    let install = Request::builder()
        .method("POST")
        .uri("/api/v1/plugins")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&manifest).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(install).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let list = Request::builder().uri("/api/v1/plugins").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let plugins: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(plugins.as_array().unwrap().len(), 1);

    let disable = Request::builder()
        .method("POST")
        .uri("/api/v1/plugins/demo/enabled")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"enabled": false}"#))
        .unwrap();
    let response = app.clone().oneshot(disable).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fetch = Request::builder().uri("/api/v1/plugins/demo").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(fetch).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let plugin: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(plugin["enabled"], false);

    let remove = Request::builder().method("DELETE").uri("/api/v1/plugins/demo").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(remove).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let missing = Request::builder().uri("/api/v1/plugins/demo").body(Body::empty()).unwrap();
    let response = app.oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

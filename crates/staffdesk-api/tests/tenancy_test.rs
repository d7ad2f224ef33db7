//! Host-based tenant resolution and isolation between tenants.

mod helpers;

use helpers::{
    api_path, initialize, payload, send_chunk, setup_test_app, ACME_HOST, CENTRAL_HOST,
    GLOBEX_HOST,
};
use serde_json::{json, Value};

#[tokio::test]
async fn test_unknown_domain_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/initialize"))
        .add_header("Host", "unknown.example.com")
        .json(&json!({ "filename": "a.bin", "total_size": 10, "total_chunks": 1 }))
        .await;

    assert_eq!(response.status_code(), 404);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TENANT_NOT_IDENTIFIED");
}

#[tokio::test]
async fn test_host_port_and_case_are_ignored() {
    let app = setup_test_app().await;
    let session = initialize(app.client(), "ACME.example.com:8080", "a.bin", 10, 1).await;
    let upload_id = session["uploadId"].as_str().unwrap();

    let status = app
        .client()
        .get(&api_path(&format!("/status/{}", upload_id)))
        .add_header("Host", ACME_HOST)
        .await;
    assert_eq!(status.status_code(), 200);
}

#[tokio::test]
async fn test_sessions_are_invisible_across_tenants() {
    let app = setup_test_app().await;
    let client = app.client();

    let session = initialize(client, ACME_HOST, "secret.bin", 100, 1).await;
    let upload_id = session["uploadId"].as_str().unwrap().to_string();

    for host in [GLOBEX_HOST, CENTRAL_HOST] {
        let status = client
            .get(&api_path(&format!("/status/{}", upload_id)))
            .add_header("Host", host)
            .await;
        assert_eq!(status.status_code(), 404, "visible from {host}");

        let chunk = send_chunk(client, host, &upload_id, 0, payload(100)).await;
        assert_eq!(chunk.status_code(), 404);

        let cancel = client
            .post(&api_path(&format!("/cancel/{}", upload_id)))
            .add_header("Host", host)
            .await;
        assert_eq!(cancel.json::<Value>()["data"]["cancelled"], false);
    }

    let status = client
        .get(&api_path(&format!("/status/{}", upload_id)))
        .add_header("Host", ACME_HOST)
        .await;
    assert_eq!(status.status_code(), 200);
    assert_eq!(status.json::<Value>()["data"]["status"], "initialized");
}

#[tokio::test]
async fn test_same_destination_does_not_collide_between_tenants() {
    let app = setup_test_app().await;
    let client = app.client();

    let mut paths = Vec::new();
    for (host, byte) in [(ACME_HOST, 1u8), (GLOBEX_HOST, 2u8)] {
        let session = initialize(client, host, "shared.bin", 4, 1).await;
        let upload_id = session["uploadId"].as_str().unwrap().to_string();
        send_chunk(client, host, &upload_id, 0, vec![byte; 4]).await;

        let response = client
            .post(&api_path("/assemble"))
            .add_header("Host", host)
            .json(&json!({ "upload_id": upload_id, "destination_path": "shared/file.bin" }))
            .await;
        assert_eq!(response.status_code(), 200, "{}", response.text());
        paths.push(response.json::<Value>()["data"]["path"].as_str().unwrap().to_string());
    }

    assert_ne!(paths[0], paths[1]);
    assert_eq!(app.storage.get(&paths[0]).await.unwrap().as_ref(), &[1u8; 4]);
    assert_eq!(app.storage.get(&paths[1]).await.unwrap().as_ref(), &[2u8; 4]);
}

#[tokio::test]
async fn test_health_and_openapi_need_no_tenant() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/health")
        .add_header("Host", "unknown.example.com")
        .await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["cacheDriver"], "memory");

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), 200);
    let doc = response.json::<Value>();
    assert!(doc["paths"]
        .as_object()
        .unwrap()
        .contains_key("/api/v1/uploads/chunked/initialize"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/health")
        .add_header("X-Request-ID", "trace-123")
        .await;
    assert_eq!(response.header("X-Request-ID"), "trace-123");
}

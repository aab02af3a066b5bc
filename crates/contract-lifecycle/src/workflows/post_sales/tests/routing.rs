use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::post_sales::domain::status;
use crate::workflows::post_sales::router::process_handler;
use crate::workflows::post_sales::{InMemoryAuditLog, InMemoryContractStore};

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn explicit_date_route_runs_rule_and_reports_counts() {
    let store = Arc::new(InMemoryContractStore::default());
    let key = electric("E123");
    store.put_status(status_record(key.clone(), status::LIVE)).await;
    store
        .put_commission(commission(&key, None, Some("2024-06-01")))
        .await;

    let response = router_with_store(store.clone())
        .oneshot(post("/api/renewal-window-date/process/2024-05-15"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], true);
    assert_eq!(payload["statusCode"], 200);
    assert_eq!(
        payload["message"],
        "Successfully processed contracts for 2024-05-15. Successfully updated 1 contracts to Renewal Window"
    );
    assert_eq!(payload["data"]["rule"], "RenewalWindowDate");
    assert_eq!(payload["data"]["totalSource"], 1);
    assert_eq!(payload["data"]["matchedCount"], 1);
    assert_eq!(payload["data"]["updatedCount"], 1);
    assert_eq!(payload["data"]["updatedIds"][0], "E123");
    assert!(payload["data"].get("processedAt").is_some());
    assert!(payload["data"].get("decisions").is_none());
    assert!(payload["requestId"].as_str().is_some());
}

#[tokio::test]
async fn wall_clock_route_succeeds_on_empty_store() {
    let response = router_with_store(Arc::new(InMemoryContractStore::default()))
        .oneshot(post("/api/objection-count/process"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["message"],
        "Successfully updated 0 contracts to Objection Closed"
    );
    assert_eq!(payload["data"]["updatedCount"], 0);
    assert_eq!(payload["errors"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn overdue_route_reports_identified_and_inserted() {
    let store = Arc::new(InMemoryContractStore::default());
    let key = electric("E77");
    store
        .put_status(status_record(key.clone(), status::PROCESSING_PRESENT_MONTH))
        .await;
    store
        .put_commission(commission(&key, Some("2024-05-01"), None))
        .await;
    let router = router_with_store(store);

    let response = router
        .clone()
        .oneshot(post("/api/overdue-present-contracts/process/2024-05-03"))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["message"],
        "Successfully processed contracts for 2024-05-03. Successfully identified 1 overdue contracts. Inserted 1 new records."
    );

    let replay = router
        .oneshot(post("/api/overdue-present-contracts/process/2024-05-03"))
        .await
        .expect("route executes");
    let payload = read_json_body(replay).await;
    assert_eq!(payload["data"]["matchedCount"], 1);
    assert_eq!(payload["data"]["updatedCount"], 0);
}

#[tokio::test]
async fn malformed_date_is_a_bad_request() {
    let response = router_with_store(Arc::new(InMemoryContractStore::default()))
        .oneshot(post("/api/objection-date/process/2024-02-30"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], false);
    assert_eq!(payload["message"], "Failed to process objection date contracts");
    assert!(payload["data"].is_null());
}

#[tokio::test]
async fn unknown_rule_slug_is_not_found() {
    let response = router_with_store(Arc::new(InMemoryContractStore::default()))
        .oneshot(post("/api/archive-everything/process"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failure_returns_internal_error_envelope() {
    let (service, _) = build_service(Arc::new(UnavailableStore));

    let response = process_handler::<UnavailableStore, InMemoryAuditLog>(
        State(Arc::new(service)),
        Path("contract-ended-renewed-date".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["message"],
        "Failed to process contract ended renewed date contracts"
    );
    assert_eq!(
        payload["errors"],
        serde_json::json!([
            "data store failure while fetching candidates",
            "store unavailable: database offline"
        ])
    );
    assert!(payload["data"].is_null());
}

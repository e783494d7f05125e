//! Inventory client tests against a stub backend: tag reads, SET writes,
//! serial path escaping on the wire, DEP lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use depshift::application::ports::InventoryDirectory;
use depshift::domain::DepStatus;
use depshift::infra::InventoryClient;
use depshift::infra::inventory::path_safe_serial;

use crate::helpers::{fast_client, spawn_stub};

const SERIAL: &str = "C02ABC123";
const PROFILE_UUID: &str = "9E2B0F9A-5F7C-4B8E-9D2A-1C3E5F7A9B0C";

fn client(base: &str) -> InventoryClient {
    InventoryClient::new(
        fast_client(),
        base,
        "inv-token".to_string(),
        PROFILE_UUID.to_string(),
    )
}

#[tokio::test]
async fn tag_lookup_maps_404_to_unknown_device() {
    let app = Router::new().route(
        "/api/inventory/machines/{serial}/meta/",
        get(|| async { StatusCode::NOT_FOUND }),
    );
    let base = spawn_stub(app).await;

    let tags = client(&base).tags(SERIAL).await.unwrap();

    assert_eq!(tags, None);
}

#[tokio::test]
async fn tags_decode_into_a_set() {
    let app = Router::new().route(
        "/api/inventory/machines/{serial}/meta/",
        get(|headers: HeaderMap| async move {
            let authorization = headers.get("authorization").and_then(|v| v.to_str().ok());
            assert_eq!(authorization, Some("Token inv-token"));
            Json(json!({ "tags": ["ready", "laptop"] }))
        }),
    );
    let base = spawn_stub(app).await;

    let tags = client(&base).tags(SERIAL).await.unwrap().unwrap();

    assert_eq!(
        tags.into_iter().collect::<Vec<_>>(),
        ["laptop", "ready"]
    );
}

#[tokio::test]
async fn awkward_serials_hit_the_escaped_path() {
    let seen = Arc::new(Mutex::new(None::<String>));
    let captured = seen.clone();
    let app = Router::new().route(
        "/api/inventory/machines/{serial}/meta/",
        get(move |Path(serial): Path<String>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(serial);
                Json(json!({ "tags": [] }))
            }
        }),
    );
    let base = spawn_stub(app).await;

    let serial = "C02 ABC/1";
    let tags = client(&base).tags(serial).await.unwrap();

    assert_eq!(tags, Some(Default::default()));
    let seen = seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen, path_safe_serial(serial));
    assert!(seen.starts_with('.'));
}

#[tokio::test]
async fn set_tags_sends_a_set_operation_and_is_idempotent() {
    let bodies = Arc::new(Mutex::new(Vec::<Value>::new()));
    let recorded = bodies.clone();
    let app = Router::new().route(
        "/api/inventory/machines/tags/",
        post(move |Json(body): Json<Value>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(body);
                StatusCode::OK
            }
        }),
    );
    let base = spawn_stub(app).await;
    let client = client(&base);

    let names = vec!["started".to_string()];
    client.set_tags(SERIAL, "migration", &names).await.unwrap();
    client.set_tags(SERIAL, "migration", &names).await.unwrap();

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1], "same arguments, same request");
    assert_eq!(
        bodies[0],
        json!({
            "serial_numbers": [SERIAL],
            "operations": [{ "kind": "SET", "taxonomy": "migration", "names": ["started"] }]
        })
    );
}

#[tokio::test]
async fn dep_status_classifies_through_the_wire() {
    let app = Router::new().route(
        "/api/mdm/dep/devices/",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            assert_eq!(params.get("serial_number").map(String::as_str), Some(SERIAL));
            Json(json!({
                "count": 1,
                "results": [{ "profile_uuid": PROFILE_UUID, "profile_status": "assigned" }]
            }))
        }),
    );
    let base = spawn_stub(app).await;

    let status = client(&base).dep_status(SERIAL).await.unwrap();

    assert_eq!(status, DepStatus::Ok);
}

#[tokio::test]
async fn zero_dep_matches_mean_unknown() {
    let app = Router::new().route(
        "/api/mdm/dep/devices/",
        get(|| async { Json(json!({ "count": 0, "results": [] })) }),
    );
    let base = spawn_stub(app).await;

    let status = client(&base).dep_status(SERIAL).await.unwrap();

    assert_eq!(status, DepStatus::Unknown);
}

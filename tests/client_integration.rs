//! Integration tests for the tables API client.
//!
//! These tests run the real HTTP transport against an in-process mock of the
//! tables service, covering the full request/response cycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_test::{TestServer, TestServerConfig, Transport};
use chrono::DateTime;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use invasive_tracker::{
    ApiClient, ApiError, ClientConfig, CollectionResponse, ListParams, Record, Session,
    VerificationStatus, get_species_stats, habitat_distribution, verification_distribution,
};

/// In-memory stand-in for the remote tables service.
#[derive(Clone, Default)]
struct MockTables {
    tables: Arc<Mutex<HashMap<String, Vec<Record>>>>,
    next_id: Arc<AtomicU64>,
}

impl MockTables {
    fn seed(&self, table: &str, rows: Value) {
        let rows: Vec<Record> = serde_json::from_value(rows).unwrap();
        self.tables.lock().unwrap().insert(table.to_string(), rows);
    }

    fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn matches_search(row: &Record, search: &str) -> bool {
    let needle = search.to_lowercase();
    row.values()
        .filter_map(Value::as_str)
        .any(|value| value.to_lowercase().contains(&needle))
}

async fn list_rows(
    State(state): State<MockTables>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let rows: Vec<Record> = state
        .rows(&table)
        .into_iter()
        .filter(|row| params.get("search").is_none_or(|s| matches_search(row, s)))
        .collect();
    let total = rows.len();
    let limit = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(usize::MAX);
    let page: Vec<Record> = rows.into_iter().take(limit).collect();

    Json(json!({ "data": page, "total": total }))
}

async fn create_row(
    State(state): State<MockTables>,
    Path(table): Path<String>,
    Json(mut body): Json<Record>,
) -> (StatusCode, Json<Record>) {
    let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    body.insert("id".into(), json!(format!("{table}-{id}")));

    state
        .tables
        .lock()
        .unwrap()
        .entry(table)
        .or_default()
        .push(body.clone());

    (StatusCode::CREATED, Json(body))
}

async fn get_row(
    State(state): State<MockTables>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Record>, StatusCode> {
    state
        .rows(&table)
        .into_iter()
        .find(|row| row.get("id") == Some(&json!(id)))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn write_row(
    state: &MockTables,
    table: &str,
    id: &str,
    body: Record,
    merge: bool,
) -> Result<Json<Record>, StatusCode> {
    let mut tables = state.tables.lock().unwrap();
    let row = tables
        .get_mut(table)
        .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&json!(id))))
        .ok_or(StatusCode::NOT_FOUND)?;

    if merge {
        row.extend(body);
    } else {
        *row = body;
        row.insert("id".into(), json!(id));
    }

    Ok(Json(row.clone()))
}

async fn replace_row(
    State(state): State<MockTables>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<Record>,
) -> Result<Json<Record>, StatusCode> {
    write_row(&state, &table, &id, body, false)
}

async fn patch_row(
    State(state): State<MockTables>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<Record>,
) -> Result<Json<Record>, StatusCode> {
    write_row(&state, &table, &id, body, true)
}

async fn delete_row(
    State(state): State<MockTables>,
    Path((table, id)): Path<(String, String)>,
) -> StatusCode {
    let mut tables = state.tables.lock().unwrap();
    let Some(rows) = tables.get_mut(&table) else {
        return StatusCode::NOT_FOUND;
    };
    let before = rows.len();
    rows.retain(|row| row.get("id") != Some(&json!(id)));

    if rows.len() < before {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Mock tables service on a random local port, with a client pointed at it.
///
/// The returned server must be held for the duration of the test.
fn spawn_mock_service() -> (TestServer, ApiClient, MockTables) {
    let state = MockTables::default();

    let app = Router::new()
        .route("/tables/:table", get(list_rows).post(create_row))
        .route(
            "/tables/:table/:id",
            get(get_row)
                .put(replace_row)
                .patch(patch_row)
                .delete(delete_row),
        )
        .with_state(state.clone());

    let config = TestServerConfig {
        transport: Some(Transport::HttpRandomPort),
        ..TestServerConfig::default()
    };
    let server = TestServer::new_with_config(app, config).unwrap();
    let address = server.server_address().unwrap().to_string();

    let client = ApiClient::new(&ClientConfig::with_base_url(&address)).unwrap();
    (server, client, state)
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn test_create_report_round_trip() {
    let (_server, client, _state) = spawn_mock_service();
    let input = record(json!({
        "species_name": "Garlic mustard",
        "habitat_description": "Forest understory"
    }));

    let created = client.reports().create(&input).await.unwrap();

    assert!(!input.contains_key("report_date"));
    let report_date = created["report_date"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(report_date).is_ok());

    let id = created["id"].as_str().unwrap();
    let fetched = client.reports().get_by_id(id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_update_semantics() {
    let (_server, client, state) = spawn_mock_service();
    state.seed(
        "invasive_species",
        json!([{"id": "s1", "common_name": "Kudzu", "threat_level": "High"}]),
    );
    state.seed(
        "sighting_reports",
        json!([{"id": "r1", "species_name": "Kudzu", "verification_status": "Pending"}]),
    );

    let replaced = client
        .species()
        .update("s1", &record(json!({"common_name": "Kudzu vine"})))
        .await
        .unwrap();
    let verified = client
        .verify_report("r1", "J. Alvarez", VerificationStatus::Verified)
        .await
        .unwrap();

    assert_eq!(replaced, record(json!({"id": "s1", "common_name": "Kudzu vine"})));
    assert_eq!(verified["species_name"], json!("Kudzu"));
    assert_eq!(verified["verification_status"], json!("Verified"));
    assert_eq!(verified["verified_by"], json!("J. Alvarez"));
}

#[tokio::test]
async fn test_missing_record_is_request_failed() {
    let (_server, client, _state) = spawn_mock_service();

    let err = client.locations().get_by_id("nope").await.unwrap_err();

    assert!(matches!(err, ApiError::RequestFailed { status: 404 }));
}

#[tokio::test]
async fn test_delete_then_get() {
    let (_server, client, state) = spawn_mock_service();
    state.seed("monitoring_locations", json!([{"id": "l1", "name": "North marsh"}]));

    client.locations().delete("l1").await.unwrap();

    let err = client.locations().get_by_id("l1").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_search_species_passes_parameters() {
    let (_server, client, state) = spawn_mock_service();
    state.seed(
        "invasive_species",
        json!([
            {"id": "s1", "common_name": "Zebra mussel"},
            {"id": "s2", "common_name": "Quagga mussel"},
            {"id": "s3", "common_name": "Cane toad"},
        ]),
    );

    let response = client.search_species("mussel").await.unwrap();

    assert!(matches!(response, CollectionResponse::Paginated { total: 2, .. }));
    assert_eq!(response.data().len(), 2);
}

#[tokio::test]
async fn test_species_stats_and_distributions() {
    let (_server, client, state) = spawn_mock_service();
    state.seed(
        "invasive_species",
        json!([{"id": "s1", "threat_level": "High"}, {"id": "s2"}]),
    );
    state.seed(
        "sighting_reports",
        json!([
            {"id": "r1", "verification_status": "Pending", "habitat_description": "Farm pond"},
            {"id": "r2", "verification_status": "Verified", "habitat_description": "Roadside"},
            {"id": "r3", "verification_status": "Rejected"},
        ]),
    );
    state.seed("users", json!([{"id": "u1"}]));

    let stats = get_species_stats(&client).await.unwrap();

    assert_eq!(stats.total_species, 2);
    assert_eq!(stats.total_reports, 3);
    assert_eq!(stats.monitoring_sites, 0);
    assert_eq!(stats.contributors, 1);
    assert_eq!(stats.active_reports, 2);

    let habitats = habitat_distribution(&stats.reports);
    assert_eq!(habitats.get("Wetland"), Some(1));
    assert_eq!(habitats.get("Urban"), Some(1));
    assert_eq!(habitats.get("Other"), Some(1));

    let verification = verification_distribution(&stats.reports);
    assert_eq!(verification.get("Rejected"), Some(1));
}

#[tokio::test]
async fn test_authenticate_existing_and_new_users() {
    let (_server, client, state) = spawn_mock_service();
    state.seed(
        "users",
        json!([{
            "id": "u1",
            "email": "lee@example.org",
            "username": "lee",
            "expertise_level": "Expert",
            "last_login": "2023-01-01T00:00:00.000Z"
        }]),
    );
    let session = Session::new();

    let existing = session
        .authenticate_user(&client, "lee@example.org", "Lee", "researcher")
        .await
        .unwrap();
    assert_eq!(existing["id"], json!("u1"));
    assert_eq!(existing["expertise_level"], json!("Expert"));
    assert_ne!(existing["last_login"], json!("2023-01-01T00:00:00.000Z"));

    let created = session
        .authenticate_user(&client, "kim@example.org", "Kim", "citizen")
        .await
        .unwrap();
    assert_eq!(created["username"], json!("kim"));
    assert_eq!(created["expertise_level"], json!("Beginner"));
    assert_eq!(session.current_user(), Some(created));
    assert_eq!(state.rows("users").len(), 2);
}

#[tokio::test]
async fn test_mock_service_lists_envelope() {
    let (server, _client, state) = spawn_mock_service();
    state.seed("invasive_species", json!([{"id": "s1"}, {"id": "s2"}]));

    let response = server.get("/tables/invasive_species").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&ClientConfig::with_base_url(&format!("http://{addr}"))).unwrap();
    let err = client.users().list(&ListParams::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}

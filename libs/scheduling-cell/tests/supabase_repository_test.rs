// libs/scheduling-cell/tests/supabase_repository_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use scheduling_cell::models::{SchedulingError, SessionStatus};
use scheduling_cell::repository::{SchedulingRepository, SupabaseSchedulingRepository};
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_service_key: "service-key".to_string(),
        redis_url: None,
    }
}

fn utc(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse().unwrap()
}

#[tokio::test]
async fn sessions_parse_from_postgrest_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "client_id": "550e8400-e29b-41d4-a716-446655440001",
            "therapist_id": "550e8400-e29b-41d4-a716-446655440002",
            "start_time": "2026-03-02T10:00:00Z",
            "end_time": "2026-03-02T11:00:00Z",
            "status": "scheduled",
            "notes": null
        })]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let sessions = repository
        .scheduled_sessions_in_range(utc("2026-03-02T00:00:00Z"), utc("2026-03-03T00:00:00Z"))
        .await
        .unwrap();

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Scheduled);
    assert_eq!(sessions[0].duration_minutes(), 60);
}

#[tokio::test]
async fn malformed_session_rows_surface_a_database_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": "not-a-uuid",
            "status": "scheduled"
        })]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let result = repository
        .scheduled_sessions_in_range(utc("2026-03-02T00:00:00Z"), utc("2026-03-03T00:00:00Z"))
        .await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

#[tokio::test]
async fn missing_therapist_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let result = repository.get_therapist(Uuid::new_v4()).await;

    assert_matches!(result, Err(SchedulingError::TherapistNotFound));
}

#[tokio::test]
async fn missing_client_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let result = repository.get_client(Uuid::new_v4()).await;

    assert_matches!(result, Err(SchedulingError::ClientNotFound));
}

#[tokio::test]
async fn absent_workload_target_reads_as_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/workload_targets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let target = repository.workload_target(Uuid::new_v4()).await.unwrap();

    assert!(target.is_none());
}

#[tokio::test]
async fn off_grid_availability_windows_are_rejected_not_rounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_windows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": "550e8400-e29b-41d4-a716-446655440010",
            "owner_id": "550e8400-e29b-41d4-a716-446655440011",
            "owner_kind": "therapist",
            "day_of_week": 1,
            "start_time": "09:10:00",
            "end_time": "12:00:00"
        })]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let result = repository
        .availability_windows(Uuid::new_v4())
        .await;

    assert_matches!(result, Err(SchedulingError::ValidationError(_)));
}

#[tokio::test]
async fn grid_aligned_availability_windows_parse() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_windows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": "550e8400-e29b-41d4-a716-446655440010",
            "owner_id": "550e8400-e29b-41d4-a716-446655440011",
            "owner_kind": "therapist",
            "day_of_week": 1,
            "start_time": "09:15:00",
            "end_time": "12:00:00"
        })]))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let windows = repository
        .availability_windows(Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].day_of_week, 1);
}

#[tokio::test]
async fn unreachable_store_surfaces_a_database_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&mock_server)
        .await;

    let repository = SupabaseSchedulingRepository::new(&test_config(&mock_server));

    let result = repository
        .scheduled_sessions_in_range(utc("2026-03-02T00:00:00Z"), utc("2026-03-03T00:00:00Z"))
        .await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

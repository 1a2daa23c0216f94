/// Integration tests with a mocked Supabase REST endpoint
/// Exercises the REST store backend without hitting a real project
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{TimeZone, Utc};
use portfolio_advisor_api::api::poller::IngestionPoller;
use portfolio_advisor_api::errors::AppError;
use portfolio_advisor_api::integrations::store::ClientStore;
use portfolio_advisor_api::integrations::supabase_client::SupabaseClient;
use portfolio_advisor_api::models::AnalysisRecord;
use portfolio_advisor_api::watermark::Watermark;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a client pointed at the mock server
fn create_test_client(base_url: &str) -> SupabaseClient {
    SupabaseClient::new(
        base_url,
        "test-key".to_string(),
        "client_forms",
        "unified_table",
        Duration::from_secs(5),
    )
    .expect("client should build")
}

fn analysis_record() -> AnalysisRecord {
    AnalysisRecord {
        client_id: "c-1".to_string(),
        user_id: "advisor-1".to_string(),
        client_profile: "{}".to_string(),
        financial_situation: "{}".to_string(),
        investment_objectives: "{}".to_string(),
        investment_strategy: "{}".to_string(),
        risk_profile: "{}".to_string(),
        portfolio_data: "{}".to_string(),
        portfolio_recommendation: "{}".to_string(),
        mutual_funds_analysis: "{}".to_string(),
        bonds_analysis: "{}".to_string(),
        fixed_deposits_analysis: r#"{"Fixed_Deposits":[]}"#.to_string(),
    }
}

#[tokio::test]
async fn test_poll_query_filters_after_watermark() {
    let mock_server = MockServer::start().await;

    let rows = serde_json::json!([
        {"client_id": "c-1", "created_at": "2024-05-01T10:00:01+00:00", "age": "41"},
        {"client_id": "c-2", "created_at": "2024-05-01T10:00:02.5+00:00"}
    ]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("created_at", "gt.2024-05-01T10:00:00.000000Z"))
        .and(query_param("order", "created_at.asc"))
        .and(header("apikey", "test-key"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let records = client.fetch_intake_since(watermark).await.unwrap();

    assert_eq!(records.len(), 2);
    let first = records[0].record.as_ref().unwrap();
    assert_eq!(first.client_id, "c-1");
    assert_eq!(first.age(), 41);
    assert!(records[1].created_at > records[0].created_at);
}

#[tokio::test]
async fn test_latest_created_at_on_empty_table() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    assert_eq!(client.latest_intake_created_at().await.unwrap(), None);
}

#[tokio::test]
async fn test_latest_created_at_reads_newest_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("select", "created_at"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"created_at": "2024-05-01T10:00:00Z"}])),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    assert_eq!(
        client.latest_intake_created_at().await.unwrap(),
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_lookup_by_client_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("client_id", "eq.c-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"client_id": "c-7", "created_at": "2024-05-01T10:00:00Z", "risk_tolerance": "high"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("client_id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    let found = client.fetch_intake_by_client_id("c-7").await.unwrap();
    assert_eq!(found.unwrap().declared_risk_tolerance().as_deref(), Some("high"));

    let missing = client.fetch_intake_by_client_id("missing").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_insert_posts_analysis_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/unified_table"))
        .and(header("Prefer", "return=minimal"))
        .and(body_partial_json(serde_json::json!({
            "client_id": "c-1",
            "user_id": "advisor-1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    client.insert_analysis(&analysis_record()).await.unwrap();
}

#[tokio::test]
async fn test_insert_rejection_is_store_fault() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/unified_table"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    match client.insert_analysis(&analysis_record()).await {
        Err(AppError::StoreUnavailable(msg)) => assert!(msg.contains("duplicate key")),
        other => panic!("Expected StoreUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let err = client.fetch_intake_since(watermark).await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_non_list_body_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "oops"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let err = client.fetch_intake_since(watermark).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_row_without_created_at_fails_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"client_id": "c-1", "created_at": "2024-05-01T10:00:01Z"},
            {"client_id": "c-2"}
        ])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let err = client.fetch_intake_since(watermark).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_row_without_client_id_is_carried_alone() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"client_id": null, "created_at": "2024-05-01T10:00:01Z"},
            {"client_id": "c-2", "created_at": "2024-05-01T10:00:02Z"}
        ])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let rows = client.fetch_intake_since(watermark).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert!(matches!(rows[0].record, Err(AppError::MalformedResponse(_))));
    assert_eq!(
        rows[0].created_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 1).unwrap()
    );
    assert_eq!(rows[1].record.as_ref().unwrap().client_id, "c-2");
}

#[tokio::test]
async fn test_poller_moves_past_row_without_client_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("created_at", "gt.2024-05-01T10:00:00.000000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"client_id": null, "created_at": "2024-05-01T10:00:01Z"},
            {"client_id": "c-2", "created_at": "2024-05-01T10:00:02Z"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .and(query_param("created_at", "gt.2024-05-01T10:00:02.000000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/unified_table"))
        .and(body_partial_json(serde_json::json!({"client_id": "c-2"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(create_test_client(&mock_server.uri()));
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let mut poller = IngestionPoller::new(store, Duration::from_secs(5), "advisor-1")
        .with_watermark(Watermark::at(start));

    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.rejected, 1);
    assert_eq!(report.persisted, 1);

    for _ in 0..2 {
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.fetched, 0);
    }
    assert_eq!(
        poller.watermark().position(),
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 2).unwrap())
    );
}

#[tokio::test]
async fn test_undecodable_body_is_transient_and_maps_to_502() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/client_forms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    let err = client.fetch_intake_by_client_id("c-1").await.unwrap_err();
    match &err {
        AppError::WithContext { source, context } => {
            assert!(context.contains("reading body"));
            assert!(matches!(**source, AppError::MalformedResponse(_)));
        }
        other => panic!("Expected decode failure with context, got {:?}", other),
    }
    assert!(err.is_transient());
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unreachable_store_is_transient() {
    // Nothing listens on port 1 locally.
    let client = create_test_client("http://127.0.0.1:1");
    let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

    let err = client.fetch_intake_since(watermark).await.unwrap_err();
    match &err {
        AppError::WithContext { source, .. } => {
            assert!(matches!(**source, AppError::StoreUnavailable(_)))
        }
        other => panic!("Expected connection failure with context, got {:?}", other),
    }
    assert!(err.is_transient());
    assert_eq!(
        err.into_response().status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

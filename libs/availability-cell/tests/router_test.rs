use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availability_cell::router::availability_routes;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

// A Monday far enough ahead that the real clock never filters it.
const FUTURE_MONDAY: &str = "2099-06-01";

fn app(mock_server: &MockServer) -> Router {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    availability_routes(std::sync::Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_exam(mock_server: &MockServer, exam: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/exam_types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([exam])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_get_availability_for_doctor() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let exam_id = Uuid::new_v4().to_string();

    mount_exam(&mock_server, MockSupabaseResponses::exam_type_response(&exam_id, "Consulta clínica", "consulta", 30, Some(&doctor_id))).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "Dra. Ana Souza", "Clínica geral", true)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::rule_response(&doctor_id, 1, "08:00", "09:00", "consulta")
        ])))
        .mount(&mock_server)
        .await;
    for table in ["schedule_openings", "schedule_exceptions", "appointments"] {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
    }

    let request = Request::builder()
        .uri(format!("/?exam_type_id={}&date={}&doctor_id={}", exam_id, FUTURE_MONDAY, doctor_id))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"], FUTURE_MONDAY);
    assert_eq!(body["total"], 3);
    assert_eq!(body["slots"][0], json!({"start": "08:00", "end": "08:30"}));
    assert_eq!(body["slots"][2], json!({"start": "09:00", "end": "09:30"}));
}

#[tokio::test]
async fn test_caller_token_is_forwarded_to_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/exam_types"))
        .and(header("authorization", "Bearer caller-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .uri(format!("/?exam_type_id={}&date={}", Uuid::new_v4(), FUTURE_MONDAY))
        .header("Authorization", "Bearer caller-jwt")
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_laboratorio_returns_bad_request() {
    let mock_server = MockServer::start().await;
    let exam_id = Uuid::new_v4().to_string();
    mount_exam(&mock_server, MockSupabaseResponses::exam_type_response(&exam_id, "Glicemia", "laboratorio", 5, None)).await;

    let request = Request::builder()
        .uri(format!("/?exam_type_id={}&date={}", exam_id, FUTURE_MONDAY))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("does not use scheduling"));
}

#[tokio::test]
async fn test_malformed_date_returns_bad_request() {
    let mock_server = MockServer::start().await;

    let request = Request::builder()
        .uri(format!("/?exam_type_id={}&date=2099-6-1", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/exam_types"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("connection reset", "08006"),
        ))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .uri(format!("/next?exam_type_id={}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "internal");
}

#[tokio::test]
async fn test_malformed_query_id_returns_json_error() {
    let mock_server = MockServer::start().await;

    let request = Request::builder()
        .uri(format!("/?exam_type_id=nope&date={}", FUTURE_MONDAY))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_malformed_doctor_path_returns_json_error() {
    let mock_server = MockServer::start().await;

    let request = Request::builder()
        .uri(format!("/doctors/nope/grid?exam_type_id={}&date={}", Uuid::new_v4(), FUTURE_MONDAY))
        .body(Body::empty())
        .unwrap();

    let response = app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_input");
}

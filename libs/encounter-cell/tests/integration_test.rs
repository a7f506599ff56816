// libs/encounter-cell/tests/integration_test.rs
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use encounter_cell::router::encounter_routes;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestResponses, TestConfig, TestUser};

struct TestContext {
    server: MockServer,
    token: String,
    config: TestConfig,
    user: TestUser,
}

async fn setup() -> TestContext {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let user = TestUser::provider("clinician@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    TestContext {
        server,
        token,
        config,
        user,
    }
}

async fn send(
    ctx: &TestContext,
    method_str: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let app = encounter_routes(ctx.config.to_app_state());

    let builder = Request::builder()
        .method(method_str)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", ctx.token));

    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn mount_directory_mocks(server: &MockServer, patient_id: Uuid, provider_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::patient_row(&patient_id.to_string())
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::provider_row(&provider_id.to_string())
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn creating_an_encounter_succeeds() {
    let ctx = setup().await;
    let patient_id = Uuid::new_v4();
    let provider_id = Uuid::new_v4();

    mount_directory_mocks(&ctx.server, patient_id, provider_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &patient_id.to_string(),
                &provider_id.to_string(),
                "scheduled",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "POST",
        "/",
        Some(json!({
            "patient_id": patient_id,
            "provider_id": provider_id,
            "encounter_type": "outpatient",
            "chief_complaint": "Headache"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "scheduled");
    assert!(body["encounter_number"]
        .as_str()
        .unwrap()
        .starts_with("ENC"));
}

#[tokio::test]
async fn creating_an_encounter_in_a_terminal_status_is_rejected() {
    let ctx = setup().await;

    let (status, body) = send(
        &ctx,
        "POST",
        "/",
        Some(json!({
            "patient_id": Uuid::new_v4(),
            "provider_id": Uuid::new_v4(),
            "encounter_type": "outpatient",
            "status": "completed"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("cannot be created"));
}

#[tokio::test]
async fn creating_for_unknown_patient_returns_not_found() {
    let ctx = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    let (status, _) = send(
        &ctx,
        "POST",
        "/",
        Some(json!({
            "patient_id": Uuid::new_v4(),
            "provider_id": Uuid::new_v4(),
            "encounter_type": "outpatient"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completing_an_in_progress_encounter_sets_discharge_date() {
    let ctx = setup().await;
    let encounter_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let provider_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &patient_id.to_string(),
                &provider_id.to_string(),
                "in_progress",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let mut completed_row = MockPostgrestResponses::encounter_row(
        &patient_id.to_string(),
        &provider_id.to_string(),
        "completed",
    );
    completed_row["discharge_date"] = json!("2024-01-01T17:30:00Z");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed_row])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "PATCH",
        &format!("/{}/status", encounter_id),
        Some(json!({ "status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(!body["discharge_date"].is_null());
    // Discharge never precedes admission.
    let admission: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["admission_date"].clone()).unwrap();
    let discharge: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["discharge_date"].clone()).unwrap();
    assert!(discharge >= admission);
}

#[tokio::test]
async fn completing_a_scheduled_encounter_is_a_state_conflict() {
    let ctx = setup().await;
    let encounter_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "scheduled",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "PATCH",
        &format!("/{}/status", encounter_id),
        Some(json!({ "status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Invalid status transition"));
}

#[tokio::test]
async fn completing_twice_is_a_state_conflict() {
    let ctx = setup().await;
    let encounter_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "completed",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let (status, _) = send(
        &ctx,
        "PATCH",
        &format!("/{}/status", encounter_id),
        Some(json!({ "status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn adding_a_clinical_note_succeeds() {
    let ctx = setup().await;
    let encounter_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &patient_id.to_string(),
                &ctx.user.id,
                "in_progress",
            )
        ])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([MockPostgrestResponses::provider_row(&ctx.user.id)])),
        )
        .mount(&ctx.server)
        .await;

    let note_id = Uuid::new_v4();
    let actor = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/clinical_notes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": note_id,
            "encounter_id": encounter_id,
            "author_id": ctx.user.id,
            "note_type": "progress",
            "subjective": "Patient reports improvement",
            "objective": "Afebrile, vitals stable",
            "assessment": "Resolving",
            "plan": "Follow up in two weeks",
            "created_at": "2024-01-01T10:00:00Z",
            "updated_at": "2024-01-01T10:00:00Z",
            "created_by": actor,
            "updated_by": actor
        }])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "POST",
        &format!("/{}/notes", encounter_id),
        Some(json!({
            "note_type": "progress",
            "subjective": "Patient reports improvement",
            "objective": "Afebrile, vitals stable",
            "assessment": "Resolving",
            "plan": "Follow up in two weeks"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["note_type"], "progress");
    assert_eq!(body["encounter_id"], encounter_id.to_string());
}

#[tokio::test]
async fn adding_a_note_to_a_missing_encounter_returns_not_found() {
    let ctx = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    let (status, _) = send(
        &ctx,
        "POST",
        &format!("/{}/notes", Uuid::new_v4()),
        Some(json!({ "note_type": "progress", "subjective": "..." })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn diagnosis_without_a_code_is_rejected() {
    let ctx = setup().await;

    let (status, _) = send(
        &ctx,
        "POST",
        &format!("/{}/diagnoses", Uuid::new_v4()),
        Some(json!({
            "diagnosis_code": "  ",
            "description": "Unspecified",
            "diagnosis_type": "primary"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recording_vitals_derives_bmi() {
    let ctx = setup().await;
    let encounter_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &patient_id.to_string(),
                &Uuid::new_v4().to_string(),
                "in_progress",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let actor = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/vital_signs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "encounter_id": encounter_id,
            "patient_id": patient_id,
            "recorded_by": ctx.user.id,
            "measured_at": "2024-01-01T10:00:00Z",
            "temperature": 36.8,
            "heart_rate": 72,
            "respiratory_rate": 16,
            "systolic_bp": 120,
            "diastolic_bp": 80,
            "oxygen_saturation": 98.0,
            "height": 180.0,
            "weight": 81.0,
            "bmi": 25.0,
            "created_at": "2024-01-01T10:00:00Z",
            "updated_at": "2024-01-01T10:00:00Z",
            "created_by": actor,
            "updated_by": actor
        }])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "POST",
        &format!("/{}/vitals", encounter_id),
        Some(json!({
            "temperature": 36.8,
            "heart_rate": 72,
            "respiratory_rate": 16,
            "systolic_bp": 120,
            "diastolic_bp": 80,
            "oxygen_saturation": 98.0,
            "height": 180.0,
            "weight": 81.0
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bmi"], 25.0);
}

#[tokio::test]
async fn listing_encounters_passes_filters_through() {
    let ctx = setup().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/encounters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::encounter_row(
                &patient_id.to_string(),
                &Uuid::new_v4().to_string(),
                "completed",
            )
        ])))
        .mount(&ctx.server)
        .await;

    let (status, body) = send(
        &ctx,
        "GET",
        &format!("/?patient_id={}&status=completed&limit=10", patient_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "completed");
}

#[tokio::test]
async fn requests_without_a_valid_token_are_rejected() {
    let ctx = setup().await;
    let app = encounter_routes(ctx.config.to_app_state());

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header(
            "Authorization",
            format!("Bearer {}", JwtTestUtils::create_malformed_token()),
        )
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

//! HTTP layer: routing, auth, status codes and multipart uploads.

use actix_web::http::Method;
use actix_web::test;
use serde_json::{Value, json};

use super::test_helpers::*;

const BOUNDARY: &str = "----tcm-test-boundary";

/// Build a multipart body with text fields and one file part.
fn multipart_body(fields: &[(&str, String)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload<S>(app: &S, token: &str, execution_id: &str, body: Vec<u8>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/executions/{}/attachments", execution_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[actix_rt::test]
async fn test_health_is_public_and_api_requires_token() {
    let world = World::new();
    let app = create_test_app(&world).await;

    let (status, body) = call_json(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call_json(&app, Method::GET, "/api/v1/projects", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) =
        call_json(&app, Method::GET, "/api/v1/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_run_through_http() {
    let world = World::new();
    let app = create_test_app(&world).await;
    let token = world.token_for(&world.user);
    let token = Some(token.as_str());

    let (status, project) = call_json(
        &app,
        Method::POST,
        "/api/v1/projects",
        token,
        Some(json!({ "name": "Web shop" })),
    )
    .await;
    assert_eq!(status, 201, "{project}");
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, case) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{}/test-cases", project_id),
        token,
        Some(json!({
            "case_type": "regular",
            "title": "Pay with card",
            "test_steps": [
                { "step_number": 1, "action": "Open cart" },
                { "step_number": 2, "action": "Pay" }
            ]
        })),
    )
    .await;
    assert_eq!(status, 201, "{case}");
    assert_eq!(case["case_type"], "regular");
    let case_id = case["id"].as_str().unwrap().to_string();

    let (status, suite) = call_json(
        &app,
        Method::POST,
        "/api/v1/suites",
        token,
        Some(json!({ "project_id": project_id, "name": "Release" })),
    )
    .await;
    assert_eq!(status, 201, "{suite}");
    let suite_id = suite["id"].as_str().unwrap().to_string();

    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/suites/{}/cases", suite_id),
        token,
        Some(json!({ "test_case_id": case_id })),
    )
    .await;
    assert_eq!(status, 201);

    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/suites/{}/cases", suite_id),
        token,
        Some(json!({ "test_case_id": case_id })),
    )
    .await;
    assert_eq!(status, 409);

    let (status, snapshot) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/suites/{}/sessions", suite_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, 201, "{snapshot}");
    let session_id = snapshot["session"]["id"].as_str().unwrap().to_string();
    let execution_id = snapshot["current_execution"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, execution) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/steps/1/toggle", execution_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(execution["completed_steps"], json!([1]));

    let (status, _) = call_json(
        &app,
        Method::PUT,
        &format!("/api/v1/executions/{}/steps/2/failure", execution_id),
        token,
        Some(json!({ "reason": "Card declined" })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/finalize", execution_id),
        token,
        Some(json!({ "outcome": "failed" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, done) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/finalize", execution_id),
        token,
        Some(json!({ "outcome": "failed", "reason": "Payment never completes" })),
    )
    .await;
    assert_eq!(status, 200, "{done}");
    assert_eq!(done["session"]["status"], "completed");
    assert_eq!(done["session"]["progress_percentage"], 100);

    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/steps/1/toggle", execution_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, 409);

    let (status, stats) = call_json(
        &app,
        Method::GET,
        &format!("/api/v1/reports/suite-stats?suite_id={}", suite_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(stats["executions"]["failed"], 1);
    assert_eq!(stats["sessions_completed"], 1);

    let (status, _) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/reset", execution_id),
        token,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, 400);

    let (status, reset) = call_json(
        &app,
        Method::POST,
        &format!("/api/v1/executions/{}/reset", execution_id),
        token,
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(reset["rolled_back"], "failed");
    assert_eq!(reset["session"]["status"], "in_progress");

    // Another user sees nothing
    let stranger = world.token_for(&world.stranger());
    let (status, _) = call_json(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{}", session_id),
        Some(stranger.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_multipart_upload() {
    let world = World::new();
    let app = create_test_app(&world).await;
    let token = world.token_for(&world.user);
    let (suite, cases) = world.seed_suite(&[1]).await;
    let execution = world.start(suite.id).await.current_execution.unwrap();
    let execution_id = execution.id.to_string();
    let case_field = ("test_case_id", cases[0].case_ref().id.to_string());

    let (status, body) = upload(
        &app,
        &token,
        &execution_id,
        multipart_body(
            &[case_field.clone(), ("step_number", "1".to_string())],
            Some(("notes.pdf", "application/pdf", b"%PDF-1.4")),
        ),
    )
    .await;
    assert_eq!(status, 415, "{body}");

    let big = png_bytes(MAX_ATTACHMENT_SIZE + 1);
    let (status, _) = upload(
        &app,
        &token,
        &execution_id,
        multipart_body(&[case_field.clone()], Some(("big.png", "image/png", &big))),
    )
    .await;
    assert_eq!(status, 413);

    let (status, _) = upload(&app, &token, &execution_id, multipart_body(&[case_field.clone()], None))
        .await;
    assert_eq!(status, 400);
    assert_eq!(world.db.attachment_count(), 0);

    let image = png_bytes(2048);
    let (status, attachment) = upload(
        &app,
        &token,
        &execution_id,
        multipart_body(
            &[
                case_field,
                ("step_number", "1".to_string()),
                ("description", "Declined banner".to_string()),
            ],
            Some(("declined.png", "image/png", &image)),
        ),
    )
    .await;
    assert_eq!(status, 201, "{attachment}");
    assert_eq!(attachment["size_bytes"], 2048);
    assert_eq!(attachment["file_name"], "declined.png");
    let attachment_id = attachment["id"].as_str().unwrap().to_string();

    let (status, list) = call_json(
        &app,
        Method::GET,
        &format!("/api/v1/executions/{}/attachments", execution_id),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, signed) = call_json(
        &app,
        Method::GET,
        &format!("/api/v1/attachments/{}/url", attachment_id),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert!(signed["url"].as_str().unwrap().starts_with("https://"));

    let (status, _) = call_json(
        &app,
        Method::DELETE,
        &format!("/api/v1/attachments/{}", attachment_id),
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, 204);
    assert!(world.objects.keys().is_empty());
}

#[actix_rt::test]
async fn test_tracker_disabled_returns_503() {
    let world = World::new();
    let app = create_test_app(&world).await;
    let token = world.token_for(&world.user);

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/api/v1/issues/batch",
        Some(token.as_str()),
        Some(json!({ "execution_ids": [uuid::Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}

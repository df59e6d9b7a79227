// tests/sendgrid_http.rs
//
// SendGrid transport against a local stand-in server: auth header, payload
// shape, and non-2xx handling.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use trend_dashboard::notify::{Attachment, Mailer, ReportEmail, SendGridMailer};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    reply: Arc<Mutex<Option<StatusCode>>>,
}

async fn capture(State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    c.requests.lock().unwrap().push((auth, body));
    c.reply.lock().unwrap().unwrap_or(StatusCode::ACCEPTED)
}

/// Serve the capture route on an ephemeral port; returns the endpoint URL.
async fn spawn_server(c: Captured) -> String {
    let app = Router::new()
        .route("/v3/mail/send", post(capture))
        .with_state(c);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v3/mail/send")
}

fn email() -> ReportEmail {
    ReportEmail {
        subject: "Weekly Tech Trends — 2025-10-06".into(),
        body: "Attached: weekly trend report (PDF).".into(),
        attachment: Attachment {
            filename: "weekly_trends_2025-10-06.pdf".into(),
            content_type: "application/pdf",
            bytes: b"%PDF-1.3 fake".to_vec(),
        },
    }
}

fn mailer(endpoint: String) -> SendGridMailer {
    SendGridMailer::new(
        "SG.test-key".into(),
        "team@example.com".into(),
        "reports@example.com".into(),
    )
    .with_endpoint(endpoint)
    .with_timeout(5)
}

#[tokio::test]
async fn posts_payload_with_bearer_auth() {
    let captured = Captured::default();
    let endpoint = spawn_server(captured.clone()).await;

    mailer(endpoint).send(&email()).await.expect("send ok");

    let reqs = captured.requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    let (auth, body) = &reqs[0];
    assert_eq!(auth.as_deref(), Some("Bearer SG.test-key"));
    assert_eq!(body["personalizations"][0]["to"][0]["email"], "team@example.com");
    assert_eq!(body["from"]["email"], "reports@example.com");
    assert_eq!(body["from"]["name"], "Trend Reports");
    assert_eq!(body["subject"], "Weekly Tech Trends — 2025-10-06");
    assert_eq!(body["content"][0]["type"], "text/plain");

    let att = &body["attachments"][0];
    assert_eq!(att["filename"], "weekly_trends_2025-10-06.pdf");
    assert_eq!(att["type"], "application/pdf");
    assert_eq!(att["disposition"], "attachment");
    let decoded = STANDARD.decode(att["content"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, b"%PDF-1.3 fake");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let captured = Captured::default();
    *captured.reply.lock().unwrap() = Some(StatusCode::UNAUTHORIZED);
    let endpoint = spawn_server(captured.clone()).await;

    let err = mailer(endpoint).send(&email()).await.unwrap_err();
    assert!(format!("{err:#}").contains("401"), "{err:#}");
}

//! Webhook endpoints: verification handshake and event delivery.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{Span, debug, info, info_span, warn};

use super::payload::{VerifyQuery, WebhookPayload};
use crate::pipeline::MessageProcessor;

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub processor: Arc<MessageProcessor>,
    pub verify_token: SecretString,
    /// Required value of the payload's top-level `object`.
    pub webhook_object: String,
}

/// Build the webhook router.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Request span with method and path only; the query carries the verify token.
fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dm-autoresponder"
    }))
}

/// Outcome of the verification handshake.
pub fn verify(query: &VerifyQuery, expected_token: &str) -> (StatusCode, String) {
    let mode = query.mode.as_deref().filter(|m| !m.is_empty());
    let token = query.verify_token.as_deref().filter(|t| !t.is_empty());

    match (mode, token) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && token == expected_token {
                (StatusCode::OK, query.challenge.clone().unwrap_or_default())
            } else {
                (
                    StatusCode::FORBIDDEN,
                    "Invalid verification token".to_string(),
                )
            }
        }
        _ => (StatusCode::BAD_REQUEST, "Missing parameters".to_string()),
    }
}

/// GET /webhook
async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(query): Query<VerifyQuery>,
) -> impl IntoResponse {
    let (status, body) = verify(&query, state.verify_token.expose_secret());
    if status == StatusCode::OK {
        info!("Webhook verified");
    } else {
        warn!(status = status.as_u16(), reason = %body, "Webhook verification failed");
    }
    (status, body)
}

/// POST /webhook
///
/// Replies 200 once every event has been handled, whatever the send
/// outcomes were.
async fn receive_webhook(State(state): State<WebhookState>, body: Bytes) -> impl IntoResponse {
    let payload = match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Webhook body is not a valid payload");
            return invalid_object();
        }
    };
    debug!(payload = %String::from_utf8_lossy(&body), "Received data");

    if payload.object.as_deref() != Some(state.webhook_object.as_str()) {
        warn!(
            object = payload.object.as_deref().unwrap_or("<missing>"),
            expected = %state.webhook_object,
            "Webhook object mismatch"
        );
        return invalid_object();
    }

    state.processor.process_batch(payload.events()).await;

    (StatusCode::OK, Json(json!({"status": "ok"})))
}

fn invalid_object() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": "invalid object"})),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::pipeline::processor::tests::RecordingSender;
    use crate::pipeline::{OutboundResponse, Rule, RulesEngine};

    fn app(rules: Vec<Rule>, sender: Arc<RecordingSender>) -> Router {
        let processor = MessageProcessor::new(
            Arc::new(RulesEngine::new(rules)),
            sender,
            "Sorry, no appropriate response was found.",
        );
        webhook_routes(WebhookState {
            processor: Arc::new(processor),
            verify_token: SecretString::from("secret".to_string()),
            webhook_object: "instagram".to_string(),
        })
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(body: serde_json::Value) -> Request<Body> {
        Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    // ── Verification ────────────────────────────────────────────────

    #[tokio::test]
    async fn verification_echoes_challenge() {
        let app = app(vec![], Arc::default());
        let (status, body) = call(
            app,
            get("/webhook?hub.mode=subscribe&hub.verify_token=secret&hub.challenge=123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "123");
    }

    #[tokio::test]
    async fn verification_rejects_wrong_token() {
        let app = app(vec![], Arc::default());
        let (status, _) = call(
            app,
            get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=123"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn verification_rejects_wrong_mode() {
        let app = app(vec![], Arc::default());
        let (status, _) = call(
            app,
            get("/webhook?hub.mode=unsubscribe&hub.verify_token=secret&hub.challenge=1"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn verification_requires_parameters() {
        let app = app(vec![], Arc::default());
        let (status, body) = call(app, get("/webhook?hub.challenge=123")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing parameters");
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let query = VerifyQuery {
            mode: Some("subscribe".into()),
            verify_token: Some(String::new()),
            challenge: Some("1".into()),
        };
        assert_eq!(verify(&query, "secret").0, StatusCode::BAD_REQUEST);
    }

    // ── Event delivery ──────────────────────────────────────────────

    #[tokio::test]
    async fn wrong_object_is_rejected_without_sending() {
        let sender = Arc::new(RecordingSender::default());
        let (status, body) = call(
            app(vec![], sender.clone()),
            post(json!({
                "object": "page",
                "entry": [{"messaging": [{"sender": {"id": "1"}, "message": {"text": "hi"}}]}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            json!({"status": "invalid object"})
        );
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_object() {
        let request = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, _) = call(app(vec![], Arc::default()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn matching_rule_is_sent_to_sender() {
        let sender = Arc::new(RecordingSender::default());
        let rules = vec![Rule::new(
            &[],
            &["price", "cost"],
            &["free"],
            OutboundResponse::text("Our price is $10"),
        )];
        let (status, body) = call(
            app(rules, sender.clone()),
            post(json!({
                "object": "instagram",
                "entry": [{"messaging": [
                    {"sender": {"id": "42"}, "message": {"text": "What is the COST?"}},
                    {"sender": {"id": "43"}}
                ]}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            json!({"status": "ok"})
        );
        let sent = sender.sent.lock().await;
        assert_eq!(
            sent.as_slice(),
            &[("42".to_string(), OutboundResponse::text("Our price is $10"))]
        );
    }

    #[tokio::test]
    async fn malformed_entry_does_not_reject_delivery() {
        let sender = Arc::new(RecordingSender::default());
        let (status, body) = call(
            app(vec![], sender.clone()),
            post(json!({
                "object": "instagram",
                "entry": [
                    {"messaging": [{"sender": {"id": "1"}, "message": {"text": "hi"}}]},
                    {"messaging": null}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            json!({"status": "ok"})
        );
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn send_failures_still_return_ok() {
        let sender = Arc::new(RecordingSender {
            fail_for: vec!["42".into()],
            ..Default::default()
        });
        let (status, _) = call(
            app(vec![], sender.clone()),
            post(json!({
                "object": "instagram",
                "entry": [{"messaging": [{"sender": {"id": "42"}, "message": {"text": "hi"}}]}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn request_logs_omit_verify_token() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, _) = call(
            app(vec![], Arc::default()),
            get("/webhook?hub.mode=subscribe&hub.verify_token=secret&hub.challenge=123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Webhook verified"));
        assert!(output.contains("path=/webhook"));
        assert!(!output.contains("verify_token"));
        assert!(!output.contains("hub.challenge"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = call(app(vec![], Arc::default()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("dm-autoresponder"));
    }
}

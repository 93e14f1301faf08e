//! Integration tests for the relay HTTP surface

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{TimeZone, Utc};
use form_relay::domain::config::WebhookConfig;
use form_relay::{
    Clock, DeliveryChannel, DeliveryError, ManualClock, NotificationPayload, RelayConfig,
    RelayService, WebhookChannel,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TWELVE_HOURS: Duration = Duration::from_secs(12 * 60 * 60);

/// Records every payload it is asked to deliver
#[derive(Default)]
struct RecordingChannel {
    delivered: Mutex<Vec<NotificationPayload>>,
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.delivered.lock().push(payload.clone());
        Ok(())
    }
}

/// Fails every delivery with the given status
struct FailingChannel(u16);

#[async_trait]
impl DeliveryChannel for FailingChannel {
    async fn deliver(&self, _payload: &NotificationPayload) -> Result<(), DeliveryError> {
        Err(DeliveryError::Status(self.0))
    }
}

struct Harness {
    router: Router,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(config: RelayConfig, channel: Option<Arc<dyn DeliveryChannel>>) -> Self {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let service =
            RelayService::with_parts(config, channel, Arc::clone(&clock) as Arc<dyn Clock>)
                .unwrap();

        Self {
            router: service.router(),
            clock,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn submit(&self, body: Value) -> Response {
        self.send(submit_request(body.to_string(), "10.0.0.1:40000")).await
    }
}

fn submit_request(body: String, peer: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/sendForm")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let peer: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn some_channel<C>(channel: Arc<C>) -> Option<Arc<dyn DeliveryChannel>>
where
    C: DeliveryChannel + 'static,
{
    Some(channel)
}

fn valid_form() -> Value {
    json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello there" })
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_valid_submission_is_relayed() {
    let channel = Arc::new(RecordingChannel::default());
    let harness = Harness::new(RelayConfig::default(), some_channel(channel.clone()));

    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "message": "Done!", "code": 200 }));

    let delivered = channel.delivered.lock();
    assert_eq!(delivered.len(), 1);
    let payload = serde_json::to_value(&delivered[0]).unwrap();
    assert_eq!(
        payload,
        json!({
            "embeds": [{
                "title": "New Form Submission!",
                "description": "Submitted: **<t:1700000000:f>**",
                "color": 16777215,
                "fields": [
                    { "name": "Name", "value": "Ada" },
                    { "name": "Email", "value": "ada@example.com" },
                    { "name": "Message", "value": "`Hello there`" }
                ]
            }]
        })
    );
}

#[tokio::test]
async fn test_mention_and_style_are_applied() {
    let mut config = RelayConfig::default();
    config.webhook.mention = Some("<@&42>".to_string());
    config.webhook.timestamp_style = form_relay::TimestampStyle::Relative;

    let channel = Arc::new(RecordingChannel::default());
    let harness = Harness::new(config, some_channel(channel.clone()));

    let response = harness.submit(valid_form()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let delivered = channel.delivered.lock();
    assert_eq!(delivered[0].content.as_deref(), Some("<@&42>"));
    assert_eq!(
        delivered[0].embeds[0].description,
        "Submitted: **<t:1700000000:R>**"
    );
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let cases = [
        json!({ "email": "ada@example.com", "message": "Hi" }),
        json!({ "name": "", "email": "ada@example.com", "message": "Hi" }),
        json!({ "name": "Ada", "email": null, "message": "Hi" }),
        json!({ "name": "Ada", "email": "ada@example.com", "message": false }),
        json!({ "name": 0, "email": "ada@example.com", "message": "Hi" }),
        json!({}),
    ];

    for body in cases {
        let channel = Arc::new(RecordingChannel::default());
        let harness = Harness::new(RelayConfig::default(), some_channel(channel.clone()));

        let response = harness.submit(body.clone()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Please fill in the necessary fields." })
        );
        assert!(channel.delivered.lock().is_empty());
    }
}

#[tokio::test]
async fn test_non_string_fields_are_stringified() {
    let channel = Arc::new(RecordingChannel::default());
    let harness = Harness::new(RelayConfig::default(), some_channel(channel.clone()));

    let response = harness
        .submit(json!({ "name": 42, "email": true, "message": "Hi" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let delivered = channel.delivered.lock();
    let fields = &delivered[0].embeds[0].fields;
    assert_eq!(fields[0].value, "42");
    assert_eq!(fields[1].value, "true");
}

#[tokio::test]
async fn test_unreadable_body_is_rejected() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );

    let response = harness
        .send(submit_request("not json".to_string(), "10.0.0.2:40000"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Please fill in the necessary fields." })
    );
}

#[tokio::test]
async fn test_unconfigured_webhook() {
    let harness = Harness::new(RelayConfig::default(), None);

    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Webhook URL not configured" })
    );
}

#[tokio::test]
async fn test_validation_runs_before_configuration_check() {
    let harness = Harness::new(RelayConfig::default(), None);

    let response = harness.submit(json!({ "name": "Ada" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delivery_failure_keeps_legacy_status() {
    let channel = some_channel(Arc::new(FailingChannel(404)));
    let harness = Harness::new(RelayConfig::default(), channel);

    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "error": "An Error Occurred!",
            "errorMsg": "Request failed with status code 404"
        })
    );
}

#[tokio::test]
async fn test_transport_failure_hides_webhook_url() {
    let url = "http://127.0.0.1:1/api/webhooks/123/SECRET_TOKEN";
    let webhook = WebhookChannel::new(url, &WebhookConfig::default()).unwrap();
    let harness = Harness::new(RelayConfig::default(), some_channel(Arc::new(webhook)));

    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error"], "An Error Occurred!");
    let error_msg = body["errorMsg"].as_str().unwrap();
    assert!(!error_msg.is_empty());
    assert!(!error_msg.contains("SECRET_TOKEN"), "leaked: {}", error_msg);
    assert!(!error_msg.contains(url), "leaked: {}", error_msg);
}

#[tokio::test]
async fn test_delivery_failure_status_is_configurable() {
    let mut config = RelayConfig::default();
    config.webhook.failure_status = 502;
    let harness = Harness::new(config, some_channel(Arc::new(FailingChannel(500))));

    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "An Error Occurred!");
    assert_eq!(body["errorMsg"], "Request failed with status code 500");
}

#[tokio::test]
async fn test_second_submission_in_window_is_limited() {
    let channel = Arc::new(RecordingChannel::default());
    let harness = Harness::new(RelayConfig::default(), some_channel(channel.clone()));

    assert_eq!(harness.submit(valid_form()).await.status(), StatusCode::OK);

    harness.clock.advance(Duration::from_secs(60));
    let response = harness.submit(valid_form()).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response.headers()[header::RETRY_AFTER].to_str().unwrap();
    assert_eq!(retry_after, (TWELVE_HOURS.as_secs() - 60).to_string());
    let body = json_body(response).await;
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(channel.delivered.lock().len(), 1);
}

#[tokio::test]
async fn test_window_reopens_after_twelve_hours() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );

    assert_eq!(harness.submit(valid_form()).await.status(), StatusCode::OK);
    assert_eq!(
        harness.submit(valid_form()).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    harness.clock.advance(TWELVE_HOURS);
    assert_eq!(harness.submit(valid_form()).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_submissions_count_against_limit() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );

    assert_eq!(
        harness.submit(json!({})).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        harness.submit(valid_form()).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );
    let body = valid_form().to_string();

    let first = harness.send(submit_request(body.clone(), "10.0.0.1:1000")).await;
    let second = harness.send(submit_request(body.clone(), "10.0.0.2:1000")).await;
    let repeat = harness.send(submit_request(body, "10.0.0.1:2000")).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_header_ignored_unless_trusted() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );
    let body = valid_form().to_string();

    let mut first = submit_request(body.clone(), "10.0.0.1:1000");
    first
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
    let mut second = submit_request(body, "10.0.0.1:1000");
    second
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.2".parse().unwrap());

    assert_eq!(harness.send(first).await.status(), StatusCode::OK);
    assert_eq!(
        harness.send(second).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_forwarded_header_used_when_trusted() {
    let mut config = RelayConfig::default();
    config.rate_limit.trust_proxy = true;
    let harness = Harness::new(config, some_channel(Arc::new(RecordingChannel::default())));
    let body = valid_form().to_string();

    let mut first = submit_request(body.clone(), "10.0.0.1:1000");
    first
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
    let mut second = submit_request(body, "10.0.0.1:1000");
    second
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.2".parse().unwrap());

    assert_eq!(harness.send(first).await.status(), StatusCode::OK);
    assert_eq!(harness.send(second).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_liveness_is_not_rate_limited() {
    let harness = Harness::new(RelayConfig::default(), None);

    for _ in 0..3 {
        let response = harness
            .send(Request::get("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Discord Webhook Server is running!");
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );

    harness.submit(valid_form()).await;
    harness.submit(valid_form()).await;

    let response = harness
        .send(Request::get("/metrics").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = json_body(response).await;
    assert_eq!(metrics["submissions"]["total"], 2);
    assert_eq!(metrics["submissions"]["accepted"], 1);
    assert_eq!(metrics["submissions"]["rate_limited"], 1);
    assert_eq!(metrics["deliveries"]["succeeded"], 1);
}

#[tokio::test]
async fn test_cors_preflight() {
    let harness = Harness::new(RelayConfig::default(), None);

    let response = harness
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/sendForm")
                .header(header::ORIGIN, "https://site.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_header_on_submission() {
    let harness = Harness::new(
        RelayConfig::default(),
        some_channel(Arc::new(RecordingChannel::default())),
    );

    let mut request = submit_request(valid_form().to_string(), "10.0.0.1:1000");
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://site.example.com".parse().unwrap());

    let response = harness.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = RelayConfig::default();
    config.limits.max_body_bytes = 64;
    let channel = Arc::new(RecordingChannel::default());
    let harness = Harness::new(config, some_channel(channel.clone()));

    let body = json!({
        "name": "Ada",
        "email": "ada@example.com",
        "message": "x".repeat(256),
    })
    .to_string();
    let mut request = submit_request(body.clone(), "10.0.0.1:1000");
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, body.len().into());

    let response = harness.send(request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(channel.delivered.lock().is_empty());
}

#[tokio::test]
async fn test_serves_over_tcp_with_graceful_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let channel = Arc::new(RecordingChannel::default());
    let service = RelayService::with_parts(
        RelayConfig::default(),
        some_channel(channel.clone()),
        Arc::new(form_relay::SystemClock),
    )
    .unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(service.serve_on(listener, async {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();
    let url = format!("http://{}/api/sendForm", addr);

    let first = client.post(&url).json(&valid_form()).send().await.unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = client.post(&url).json(&valid_form()).send().await.unwrap();
    assert_eq!(second.status().as_u16(), 429);

    assert_eq!(channel.delivered.lock().len(), 1);

    drop(client);
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

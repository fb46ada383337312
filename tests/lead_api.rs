/// End-to-end tests for the submission endpoints.
/// Drives the axum router in-process against the in-memory store, with
/// wiremock standing in for the Telegram Bot API and the automation webhook.
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lead_intake::config::NotifyConfig;
use lead_intake::dispatcher::{DispatchConfig, NotificationDispatcher, NotificationSink};
use lead_intake::errors::AppError;
use lead_intake::handlers::AppState;
use lead_intake::models::{Contacts, Lead, LeadStatus, NewLead, Service, ServiceCategory};
use lead_intake::routes;
use lead_intake::store::{LeadStore, MemoryStore};
use lead_intake::telegram_client::TelegramClient;
use lead_intake::webhook_client::WebhookClient;

const BOT_TOKEN: &str = "123456:TEST";
const TELEGRAM_PATH: &str = "/bot123456:TEST/sendMessage";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    telegram: MockServer,
    webhook: MockServer,
}

fn catalog() -> Vec<Service> {
    vec![
        Service {
            id: 7,
            category: ServiceCategory::Engine,
            title: "Раскоксовка".to_string(),
            slug: "raskoksovka".to_string(),
            short_desc: "Очистка поршневой группы".to_string(),
            price_from: Some(1500),
            order: 1,
            is_published: true,
        },
        Service {
            id: 8,
            category: ServiceCategory::Diagnostics,
            title: "Диагностика".to_string(),
            slug: "diagnostika".to_string(),
            short_desc: String::new(),
            price_from: None,
            order: 0,
            is_published: true,
        },
        Service {
            id: 9,
            category: ServiceCategory::Detailing,
            title: "Черновик".to_string(),
            slug: "draft".to_string(),
            short_desc: String::new(),
            price_from: None,
            order: 2,
            is_published: false,
        },
    ]
}

fn notify_config(telegram: &MockServer, webhook: &MockServer, configured: bool) -> NotifyConfig {
    NotifyConfig {
        bot_token: configured.then(|| BOT_TOKEN.to_string()),
        chat_id: configured.then(|| "-1001234567890".to_string()),
        telegram_api_base: telegram.uri(),
        webhook_url: configured.then(|| format!("{}/hook", webhook.uri())),
        timeout: Duration::from_secs(1),
    }
}

async fn spawn_app_with(configured: bool, leads: Option<Arc<dyn LeadStore>>) -> TestApp {
    let telegram = MockServer::start().await;
    let webhook = MockServer::start().await;
    let store = Arc::new(MemoryStore::with_services(catalog()));

    let config = notify_config(&telegram, &webhook, configured);
    let sinks: Vec<Arc<dyn NotificationSink>> = vec![
        Arc::new(TelegramClient::new(&config).unwrap()),
        Arc::new(WebhookClient::new(&config).unwrap()),
    ];
    let (dispatcher, _worker) = NotificationDispatcher::start(sinks, DispatchConfig::default());

    let state = Arc::new(AppState {
        leads: leads.unwrap_or_else(|| store.clone() as Arc<dyn LeadStore>),
        reviews: store.clone(),
        catalog: store.clone(),
        dispatcher,
        contacts: Some(Contacts::from_phone("+996700123456")),
    });

    TestApp {
        router: routes::router(state),
        store,
        telegram,
        webhook,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(true, None).await
}

async fn mount_ok(app: &TestApp) {
    Mock::given(method("POST"))
        .and(path(TELEGRAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&app.telegram)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.webhook)
        .await;
}

async fn post_form(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_raw(router: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Polls until the mock server has seen `expected` requests (or times out).
async fn wait_for_requests(server: &MockServer, expected: usize) -> Vec<wiremock::Request> {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= expected || Instant::now() > deadline {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Gives detached work a moment to run before asserting nothing happened.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_valid_lead_is_stored_and_notified() {
    let app = spawn_app().await;
    mount_ok(&app).await;

    let (status, body) = post_form(
        &app.router,
        "/lead",
        "name=Ivan&phone=%2B996700000000&website=",
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ok"], json!(true));

    let leads = app.store.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].status, LeadStatus::New);
    assert_eq!(leads[0].phone_e164, "+996700000000");
    assert_eq!(body["id"], json!(leads[0].id));

    let telegram = wait_for_requests(&app.telegram, 1).await;
    assert_eq!(telegram.len(), 1);
    let message: Value = telegram[0].body_json().unwrap();
    let text = message["text"].as_str().unwrap();
    assert!(text.contains("👤 Имя: Ivan"));
    assert!(text.contains("📞 Телефон: +996700000000"));
    assert!(!text.contains("UTM"));
    assert_eq!(message["chat_id"], json!("-1001234567890"));
    assert_eq!(message["parse_mode"], json!("HTML"));
    assert_eq!(message["disable_web_page_preview"], json!(true));

    let webhook = wait_for_requests(&app.webhook, 1).await;
    assert_eq!(webhook.len(), 1);
    let payload: Value = webhook[0].body_json().unwrap();
    assert_eq!(
        payload,
        json!({
            "id": leads[0].id,
            "name": "Ivan",
            "phone_e164": "+996700000000",
            "service": "",
            "comment": "",
            "utm_source": "",
            "utm_medium": "",
            "utm_campaign": "",
            "lang": "ru"
        })
    );

    // Exactly once per sink
    settle().await;
    assert_eq!(app.telegram.received_requests().await.unwrap().len(), 1);
    assert_eq!(app.webhook.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_honeypot_rejects_without_side_effects() {
    let app = spawn_app().await;
    mount_ok(&app).await;

    let (status, body) = post_form(&app.router, "/lead", "name=Bot&website=http%3A%2F%2Fspam").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["errors"], json!({"__all__": ["Проверьте форму"]}));
    assert!(app.store.leads().is_empty());

    settle().await;
    assert!(app.telegram.received_requests().await.unwrap().is_empty());
    assert!(app.webhook.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_required_fields() {
    let app = spawn_app().await;
    mount_ok(&app).await;

    let (status, body) = post_form(&app.router, "/lead", "name=&phone=&message=hello").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["phone"].is_array());
    assert!(app.store.leads().is_empty());

    settle().await;
    assert!(app.telegram.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sink_failure_does_not_affect_caller_or_other_sink() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path(TELEGRAM_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&app.telegram)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.webhook)
        .await;

    let (status, _) = post_form(&app.router, "/lead", "name=Ivan&phone=%2B996700000000").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wait_for_requests(&app.telegram, 1).await.len(), 1);
    assert_eq!(wait_for_requests(&app.webhook, 1).await.len(), 1);

    // No retry after the failure
    settle().await;
    assert_eq!(app.telegram.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unconfigured_sinks_make_no_calls() {
    let app = spawn_app_with(false, None).await;
    mount_ok(&app).await;

    let (status, _) = post_form(&app.router, "/lead", "name=Ivan&phone=%2B996700000000").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.store.leads().len(), 1);

    settle().await;
    assert!(app.telegram.received_requests().await.unwrap().is_empty());
    assert!(app.webhook.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_sink_does_not_delay_response() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&app.telegram)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&app.webhook)
        .await;

    let started = Instant::now();
    let (status, _) = post_form(&app.router, "/lead", "name=Ivan&phone=%2B996700000000").await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_service_and_utm_flow_into_notifications() {
    let app = spawn_app().await;
    mount_ok(&app).await;

    let (status, _) = post_form(
        &app.router,
        "/lead",
        "name=Aigul&phone=%2B996555123456&message=%D0%9F%D0%B5%D1%80%D0%B5%D0%B7%D0%B2%D0%BE%D0%BD%D0%B8%D1%82%D0%B5&service=7&lang=ky&utm_source=google&utm_campaign=spring",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let lead = &app.store.leads()[0];
    assert_eq!(lead.service_id, Some(7));
    assert_eq!(lead.message, "Перезвоните");

    let telegram = wait_for_requests(&app.telegram, 1).await;
    let message: Value = telegram[0].body_json().unwrap();
    let text = message["text"].as_str().unwrap();
    assert!(text.contains("🛠 Услуга: Раскоксовка"));
    assert!(text.contains("📝 Комментарий: Перезвоните"));
    assert!(text.contains("🔗 UTM: utm_source=google, utm_campaign=spring"));

    let webhook = wait_for_requests(&app.webhook, 1).await;
    let payload: Value = webhook[0].body_json().unwrap();
    assert_eq!(payload["service"], json!("Раскоксовка"));
    assert_eq!(payload["comment"], json!("Перезвоните"));
    assert_eq!(payload["utm_medium"], json!(""));
    assert_eq!(payload["lang"], json!("ky"));
}

#[tokio::test]
async fn test_unpublished_service_is_rejected() {
    let app = spawn_app().await;

    let (status, body) = post_form(
        &app.router,
        "/lead",
        "name=Ivan&phone=%2B996700000000&service=9",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["service"].is_array());
    assert!(app.store.leads().is_empty());
}

#[tokio::test]
async fn test_language_prefix() {
    let app = spawn_app().await;

    let (status, body) = post_form(&app.router, "/en/lead", "name=&phone=%2B996700000000&lang=ru").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["name"], json!(["This field is required."]));

    let (status, _) = post_form(&app.router, "/de/lead", "name=Ivan&phone=%2B996700000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.leads().is_empty());
}

struct BrokenStore;

#[async_trait]
impl LeadStore for BrokenStore {
    async fn insert_lead(&self, _lead: NewLead) -> Result<Lead, AppError> {
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }
}

#[tokio::test]
async fn test_storage_failure_skips_dispatch() {
    let app = spawn_app_with(true, Some(Arc::new(BrokenStore))).await;
    mount_ok(&app).await;

    let (status, body) = post_form(&app.router, "/lead", "name=Ivan&phone=%2B996700000000").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Database error"));

    settle().await;
    assert!(app.telegram.received_requests().await.unwrap().is_empty());
    assert!(app.webhook.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_submission() {
    let app = spawn_app().await;

    let (status, body) = post_form(
        &app.router,
        "/reviews",
        "author=%D0%90%D0%B9%D0%B1%D0%B5%D0%BA&rating=5&text=Great&source=2gis",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ok"], json!(true));

    let reviews = app.store.reviews();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].author, "Айбек");
    assert!(!reviews[0].is_published);

    let (status, body) = post_form(&app.router, "/en/reviews", "author=A&rating=9&text=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["rating"], json!(["Rating must be between 1 and 5."]));
    assert_eq!(app.store.reviews().len(), 1);
}

#[tokio::test]
async fn test_list_services_and_health() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/v1/services")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let services: Value = serde_json::from_slice(&bytes).unwrap();
    let titles: Vec<&str> = services
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Диагностика", "Раскоксовка"]);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_undecodable_bodies_get_generic_json_error() {
    let app = spawn_app().await;
    mount_ok(&app).await;
    let expected = json!({"ok": false, "errors": {"__all__": ["Проверьте форму"]}});

    // Honeypot filled on an otherwise well-formed body
    let (status, body) = post_form(&app.router, "/lead", "name=Bot&website=spam").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    // Same honeypot, duplicated field
    let (status, body) = post_form(&app.router, "/lead", "name=Bot&name=Bot2&website=spam").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    // Same honeypot, no content type
    let (status, body) = post_raw(&app.router, "/lead", None, "name=Bot&website=spam").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    let (status, body) = post_raw(&app.router, "/en/reviews", Some("text/plain"), "author=A").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    assert!(app.store.leads().is_empty());
    assert!(app.store.reviews().is_empty());
    settle().await;
    assert!(app.telegram.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_contacts() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/v1/contacts")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let contacts: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        contacts,
        json!({
            "phone_e164": "+996700123456",
            "phone_display": "+996 700 123 456",
            "whatsapp": "https://wa.me/996700123456"
        })
    );
}

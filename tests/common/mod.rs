// Mock upstreams for integration tests
#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use bytes::Bytes;
use ollama_rag_gateway::gateway_state::{GatewayConfig, GatewayState};
use serde_json::{Value, json};

/// Collects every JSON body an upstream received.
#[derive(Default)]
pub struct Recorder {
    requests: Mutex<Vec<Value>>,
}

impl Recorder {
    pub fn record(&self, body: Value) {
        self.requests.lock().unwrap().push(body);
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Poll until at least `n` requests arrived or ~2s elapsed.
    pub async fn wait_for(&self, n: usize) -> Vec<Value> {
        for _ in 0..100 {
            let requests = self.snapshot();
            if requests.len() >= n {
                return requests;
            }
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
        }
        self.snapshot()
    }
}

pub struct MockUpstream {
    pub url: String,
    pub recorder: web::Data<Recorder>,
    handle: ServerHandle,
}

impl MockUpstream {
    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

#[derive(Clone)]
pub struct OllamaBehavior {
    pub chunks: Vec<&'static str>,
    pub chat_status: u16,
}

impl OllamaBehavior {
    pub fn streaming(chunks: Vec<&'static str>) -> Self {
        OllamaBehavior {
            chunks,
            chat_status: 200,
        }
    }
}

pub const HEL_CHUNK: &str = "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n";
pub const LO_CHUNK: &str = "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":true}\n";
pub const EMBEDDING_BODY: &str = "{\"embedding\":[0.1,0.2]}";

async fn ollama_tags() -> HttpResponse {
    HttpResponse::Ok().json(json!({"models": []}))
}

async fn ollama_chat(
    body: web::Json<Value>,
    recorder: web::Data<Recorder>,
    behavior: web::Data<OllamaBehavior>,
) -> HttpResponse {
    recorder.record(body.into_inner());
    if behavior.chat_status != 200 {
        let status = StatusCode::from_u16(behavior.chat_status).unwrap();
        return HttpResponse::build(status).json(json!({"error": "model not found"}));
    }
    let chunks: Vec<Result<Bytes, std::io::Error>> = behavior
        .chunks
        .iter()
        .map(|c| Ok(Bytes::from_static(c.as_bytes())))
        .collect();
    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(futures::stream::iter(chunks))
}

async fn ollama_embeddings(body: web::Bytes, recorder: web::Data<Recorder>) -> HttpResponse {
    recorder.record(serde_json::from_slice(&body).unwrap_or(Value::Null));
    HttpResponse::Created()
        .content_type("application/json; charset=utf-8")
        .body(EMBEDDING_BODY)
}

pub async fn start_ollama(behavior: OllamaBehavior) -> MockUpstream {
    let recorder = web::Data::new(Recorder::default());
    let behavior = web::Data::new(behavior);
    let app_recorder = recorder.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_recorder.clone())
            .app_data(behavior.clone())
            .route("/api/tags", web::get().to(ollama_tags))
            .route("/api/chat", web::post().to(ollama_chat))
            .route("/api/embeddings", web::post().to(ollama_embeddings))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    MockUpstream {
        url: format!("http://{}", addr),
        recorder,
        handle,
    }
}

#[derive(Clone)]
pub struct WebhookBehavior {
    pub response: Value,
    pub status: u16,
    pub delay: Duration,
}

impl WebhookBehavior {
    pub fn ok(response: Value) -> Self {
        WebhookBehavior {
            response,
            status: 200,
            delay: Duration::ZERO,
        }
    }
}

async fn webhook_post(
    body: web::Json<Value>,
    recorder: web::Data<Recorder>,
    behavior: web::Data<WebhookBehavior>,
) -> HttpResponse {
    recorder.record(body.into_inner());
    if !behavior.delay.is_zero() {
        actix_web::rt::time::sleep(behavior.delay).await;
    }
    let status = StatusCode::from_u16(behavior.status).unwrap();
    HttpResponse::build(status).json(behavior.response.clone())
}

async fn webhook_head(behavior: web::Data<WebhookBehavior>) -> HttpResponse {
    HttpResponse::build(StatusCode::from_u16(behavior.status).unwrap()).finish()
}

/// Workflow webhook standing in for both the prepare and upsert upstreams.
pub async fn start_webhook(behavior: WebhookBehavior) -> MockUpstream {
    let recorder = web::Data::new(Recorder::default());
    let behavior = web::Data::new(behavior);
    let app_recorder = recorder.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_recorder.clone())
            .app_data(behavior.clone())
            .service(
                web::resource("/webhook")
                    .route(web::post().to(webhook_post))
                    .route(web::head().to(webhook_head)),
            )
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    MockUpstream {
        url: format!("http://{}/webhook", addr),
        recorder,
        handle,
    }
}

/// An address nothing listens on.
pub const DEAD_URL: &str = "http://127.0.0.1:1";

pub fn gateway_state(
    ollama_url: &str,
    prepare_url: Option<&str>,
    upsert_url: Option<&str>,
) -> GatewayState {
    let config = GatewayConfig {
        ollama_url: ollama_url.to_string(),
        prepare_url: prepare_url.map(String::from),
        upsert_url: upsert_url.map(String::from),
        prepare_timeout: Duration::from_millis(500),
        upsert_timeout: Duration::from_secs(2),
        ..GatewayConfig::default()
    };
    GatewayState::new(&config).unwrap()
}

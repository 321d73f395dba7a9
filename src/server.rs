use crate::error::ApiError;
use crate::gateway_state::{GatewayConfig, GatewayState};
use crate::io_struct::ChatRequest;
use crate::orchestrator::handle_chat;
use crate::readiness::{check_readiness, timestamp};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpServer, get, post, web};
use serde_json::json;
use std::io::Write;

pub const SERVICE_NAME: &str = "ollama-rag-gateway";
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[get("/healthz")]
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "service": SERVICE_NAME,
    }))
}

#[get("/readyz")]
pub async fn readyz(app_state: web::Data<GatewayState>) -> HttpResponse {
    let checks = check_readiness(&app_state).await;
    let (status, label) = if checks.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    HttpResponse::build(status).json(json!({
        "status": label,
        "checks": checks,
    }))
}

#[post("/api/chat")]
pub async fn chat(
    req: web::Json<ChatRequest>,
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, ApiError> {
    handle_chat(&app_state, req.into_inner())
        .await
        .map_err(|e| {
            log::error!("Chat request failed: {}", e);
            ApiError::gateway(e)
        })
}

#[post("/api/embeddings")]
pub async fn embeddings(
    body: web::Bytes,
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, ApiError> {
    let resp = app_state.inference.embeddings(body).await.map_err(|e| {
        log::error!("Embeddings request failed: {}", e);
        ApiError::embeddings(e)
    })?;
    resp.into_http_response().map_err(ApiError::embeddings)
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| {
            log::warn!("Rejected chat body: {}", err);
            ApiError::gateway(err).into()
        })
}

/// Register the gateway routes; shared by `startup` and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .service(healthz)
        .service(readyz)
        .service(chat)
        .service(embeddings);
}

pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .try_init();
}

pub async fn startup(config: GatewayConfig, state: GatewayState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    init_logging(config.log_level);
    log::info!("[gateway] listening on {}:{}", config.host, config.port);
    log::info!(
        "Upstreams: ollama={} prepare={} upsert={}",
        config.ollama_url,
        config.prepare_url.as_deref().unwrap_or("-"),
        config.upsert_url.as_deref().unwrap_or("-")
    );

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}

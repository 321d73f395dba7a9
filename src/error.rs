use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{upstream} unreachable: {source}")]
    Unreachable {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{upstream} did not respond within {after:?}")]
    Timeout {
        upstream: &'static str,
        after: Duration,
    },

    #[error("{upstream} returned {status}: {body}")]
    UpstreamStatus {
        upstream: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stream error: {0}")]
    Stream(String),
}

impl GatewayError {
    pub fn unreachable(upstream: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| GatewayError::Unreachable { upstream, source }
    }
}

pub const GATEWAY_ERROR: &str = "gateway_error";
pub const EMBEDDINGS_ERROR: &str = "embeddings_error";

/// Error surfaced to the caller before any response bytes were sent.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct ApiError {
    pub kind: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn new(kind: &'static str, detail: impl ToString) -> Self {
        ApiError {
            kind,
            detail: detail.to_string(),
        }
    }

    pub fn gateway(err: impl ToString) -> Self {
        Self::new(GATEWAY_ERROR, err)
    }

    pub fn embeddings(err: impl ToString) -> Self {
        Self::new(EMBEDDINGS_ERROR, err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind,
            "detail": self.detail,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_api_error_body() {
        let err = ApiError::gateway(GatewayError::UpstreamStatus {
            upstream: "ollama",
            status: 404,
            body: "model not found".to_string(),
        });
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "gateway_error");
        assert_eq!(json["detail"], "ollama returned 404: model not found");
    }
}

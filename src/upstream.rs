use crate::error::GatewayError;
use crate::io_struct::{InferenceChatRequest, PrepareRequest, RetrievedContext, UpsertRequest};
use actix_web::HttpResponse;
use bytes::Bytes;
use futures::Stream;
use reqwest::{Client, Method, StatusCode, header::CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

pub const OLLAMA: &str = "ollama";
pub const N8N_PREPARE: &str = "n8n_prepare";
pub const N8N_UPSERT: &str = "n8n_upsert";

pub const INFERENCE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const WORKFLOW_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Liveness probe: any transport failure or non-2xx status counts as down.
async fn probe(client: &Client, method: Method, url: &str, timeout: Duration) -> bool {
    match client.request(method, url).timeout(timeout).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            log::debug!("Probe {} failed: {}", url, e);
            false
        }
    }
}

async fn check_status(
    upstream: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::UpstreamStatus {
        upstream,
        status: status.as_u16(),
        body,
    })
}

/// Upstream response mirrored back to the caller as-is.
pub struct ProxyResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn into_http_response(self) -> Result<HttpResponse, GatewayError> {
        let status = actix_web::http::StatusCode::from_u16(self.status.as_u16()).map_err(|e| {
            GatewayError::Stream(format!("Invalid status code: {}", e))
        })?;
        let content_type = self
            .content_type
            .unwrap_or_else(|| "application/json".to_string());
        Ok(HttpResponse::build(status)
            .content_type(content_type)
            .body(self.body))
    }
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    client: Client,
    header_timeout: Option<Duration>,
}

impl InferenceClient {
    /// `header_timeout` bounds the wait for response headers only; a
    /// streaming body may take as long as the model needs.
    pub fn new(base_url: &str, header_timeout: Option<Duration>) -> anyhow::Result<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            header_timeout,
        })
    }

    pub fn api_path(&self, api_path: &str) -> String {
        if api_path.starts_with("/") {
            format!("{}{}", self.base_url, api_path)
        } else {
            format!("{}/{}", self.base_url, api_path)
        }
    }

    pub async fn probe(&self) -> bool {
        probe(
            &self.client,
            Method::GET,
            &self.api_path("/api/tags"),
            INFERENCE_PROBE_TIMEOUT,
        )
        .await
    }

    pub async fn chat_stream(
        &self,
        request: &InferenceChatRequest<'_>,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, GatewayError> {
        let task = self
            .client
            .post(self.api_path("/api/chat"))
            .json(request)
            .send();
        let resp = match self.header_timeout {
            Some(after) => tokio::time::timeout(after, task)
                .await
                .map_err(|_| GatewayError::Timeout {
                    upstream: OLLAMA,
                    after,
                })?,
            None => task.await,
        }
        .map_err(GatewayError::unreachable(OLLAMA))?;
        // A reachable backend is relayed whatever it answers; error bodies
        // carry no message content, so nothing gets recorded for them.
        if !resp.status().is_success() {
            log::warn!("Ollama chat returned {}, relaying its body", resp.status());
        }
        Ok(resp.bytes_stream())
    }

    pub async fn embeddings(&self, body: Bytes) -> Result<ProxyResponse, GatewayError> {
        let resp = self
            .client
            .post(self.api_path("/api/embeddings"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(GatewayError::unreachable(OLLAMA))?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp
            .bytes()
            .await
            .map_err(GatewayError::unreachable(OLLAMA))?;
        Ok(ProxyResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Outcome of the best-effort context lookup.
#[derive(Debug)]
pub enum Preparation {
    Context(RetrievedContext),
    Unavailable(GatewayError),
}

impl Preparation {
    /// Collapses `Unavailable` into an empty context.
    pub fn into_context(self) -> RetrievedContext {
        match self {
            Preparation::Context(ctx) => ctx,
            Preparation::Unavailable(_) => RetrievedContext::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrepareClient {
    url: String,
    client: Client,
    topk: u32,
    topn: u32,
}

impl PrepareClient {
    pub fn new(url: &str, timeout: Duration, topk: u32, topn: u32) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            topk,
            topn,
        })
    }

    pub async fn probe(&self) -> bool {
        probe(&self.client, Method::HEAD, &self.url, WORKFLOW_PROBE_TIMEOUT).await
    }

    pub async fn prepare(
        &self,
        query: &str,
        session_id: Option<&Value>,
        thread_id: Option<&Value>,
    ) -> Preparation {
        let request = PrepareRequest {
            query,
            session_id,
            thread_id,
            topk: self.topk,
            topn: self.topn,
        };
        match self.fetch(&request).await {
            Ok(ctx) => Preparation::Context(ctx),
            Err(e) => Preparation::Unavailable(e),
        }
    }

    async fn fetch(&self, request: &PrepareRequest<'_>) -> Result<RetrievedContext, GatewayError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(GatewayError::unreachable(N8N_PREPARE))?;
        let resp = check_status(N8N_PREPARE, resp).await?;
        let body = resp
            .bytes()
            .await
            .map_err(GatewayError::unreachable(N8N_PREPARE))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpsertClient {
    url: String,
    client: Client,
}

impl UpsertClient {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub async fn probe(&self) -> bool {
        probe(&self.client, Method::HEAD, &self.url, WORKFLOW_PROBE_TIMEOUT).await
    }

    pub async fn upsert(&self, record: &UpsertRequest) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(GatewayError::unreachable(N8N_UPSERT))?;
        check_status(N8N_UPSERT, resp).await?;
        Ok(())
    }
}

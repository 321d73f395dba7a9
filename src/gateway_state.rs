use crate::upstream::{InferenceClient, PrepareClient, UpsertClient};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the context if relevant.";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub ollama_url: String,
    pub prepare_url: Option<String>,
    pub upsert_url: Option<String>,
    pub rag_topk: u32,
    pub rerank_topn: u32,
    pub system_prompt: String,
    pub inference_timeout: Option<Duration>,
    pub prepare_timeout: Duration,
    pub upsert_timeout: Duration,
    pub log_level: log::LevelFilter,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: "0.0.0.0".to_string(),
            port: 11434,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            prepare_url: None,
            upsert_url: None,
            rag_topk: 12,
            rerank_topn: 5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            inference_timeout: Some(Duration::from_secs(300)),
            prepare_timeout: Duration::from_secs(10),
            upsert_timeout: Duration::from_secs(10),
            log_level: log::LevelFilter::Info,
        }
    }
}

fn configured(url: &Option<String>) -> Option<&str> {
    url.as_deref().map(str::trim).filter(|u| !u.is_empty())
}

/// Per-process handles shared read-only by every request.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub inference: InferenceClient,
    pub prepare: Option<PrepareClient>,
    pub upsert: Option<UpsertClient>,
    pub system_prompt: String,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let inference = InferenceClient::new(&config.ollama_url, config.inference_timeout)?;
        let prepare = configured(&config.prepare_url)
            .map(|url| {
                PrepareClient::new(
                    url,
                    config.prepare_timeout,
                    config.rag_topk,
                    config.rerank_topn,
                )
            })
            .transpose()?;
        let upsert = configured(&config.upsert_url)
            .map(|url| UpsertClient::new(url, config.upsert_timeout))
            .transpose()?;
        Ok(Self {
            inference,
            prepare,
            upsert,
            system_prompt: config.system_prompt.clone(),
        })
    }
}

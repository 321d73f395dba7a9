use clap::Parser;
use ollama_rag_gateway::Gateway;
use ollama_rag_gateway::gateway_state::{
    DEFAULT_OLLAMA_URL, DEFAULT_SYSTEM_PROMPT, GatewayConfig,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "ollama-rag-gateway")]
#[command(about = "Chat gateway that augments Ollama requests with retrieved context")]
struct CliArgs {
    #[arg(long, env = "GATEWAY_BIND_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "GATEWAY_BIND_PORT", default_value_t = 11434)]
    port: u16,

    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Context preparation webhook; unset disables augmentation
    #[arg(long, env = "N8N_PREPARE_URL")]
    prepare_url: Option<String>,

    /// Exchange recording webhook; unset disables recording
    #[arg(long, env = "N8N_UPSERT_URL")]
    upsert_url: Option<String>,

    #[arg(long, env = "RAG_TOPK", default_value_t = 12)]
    rag_topk: u32,

    #[arg(long, env = "RERANK_TOPN", default_value_t = 5)]
    rerank_topn: u32,

    #[arg(long, env = "GATEWAY_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    system_prompt: String,

    /// Seconds to wait for Ollama response headers (0 = no limit)
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value_t = 300)]
    inference_timeout_secs: u64,

    #[arg(long, env = "PREPARE_TIMEOUT_SECS", default_value_t = 10)]
    prepare_timeout_secs: u64,

    #[arg(long, env = "UPSERT_TIMEOUT_SECS", default_value_t = 10)]
    upsert_timeout_secs: u64,

    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    log_level: log::LevelFilter,
}

impl CliArgs {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            host: self.host,
            port: self.port,
            ollama_url: self.ollama_url,
            prepare_url: self.prepare_url,
            upsert_url: self.upsert_url,
            rag_topk: self.rag_topk,
            rerank_topn: self.rerank_topn,
            system_prompt: self.system_prompt,
            inference_timeout: (self.inference_timeout_secs > 0)
                .then(|| Duration::from_secs(self.inference_timeout_secs)),
            prepare_timeout: Duration::from_secs(self.prepare_timeout_secs),
            upsert_timeout: Duration::from_secs(self.upsert_timeout_secs),
            log_level: self.log_level,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    Gateway::new(args.into_config()).start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_disables_limit() {
        let args = CliArgs::parse_from([
            "ollama-rag-gateway",
            "--inference-timeout-secs",
            "0",
            "--prepare-url",
            "http://n8n:5678/webhook/prepare",
        ]);
        let config = args.into_config();
        assert!(config.inference_timeout.is_none());
        assert_eq!(
            config.prepare_url.as_deref(),
            Some("http://n8n:5678/webhook/prepare")
        );
    }
}

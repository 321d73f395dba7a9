use crate::gateway_state::GatewayState;
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Result of probing one optional upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
    NotConfigured,
}

impl From<bool> for CheckStatus {
    fn from(ok: bool) -> Self {
        if ok {
            CheckStatus::Healthy
        } else {
            CheckStatus::Unhealthy
        }
    }
}

// Wire form is `true`, `false` or `null`.
impl Serialize for CheckStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CheckStatus::Healthy => serializer.serialize_bool(true),
            CheckStatus::Unhealthy => serializer.serialize_bool(false),
            CheckStatus::NotConfigured => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ollama: bool,
    pub n8n_prepare: CheckStatus,
    pub n8n_upsert: CheckStatus,
    pub timestamp: String,
}

impl HealthReport {
    /// Only the inference backend gates readiness.
    pub fn is_ready(&self) -> bool {
        self.ollama
    }
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Probe every upstream concurrently. Never fails; each probe failure is
/// recorded as unhealthy for that upstream.
pub async fn check_readiness(state: &GatewayState) -> HealthReport {
    let prepare = async {
        match &state.prepare {
            Some(client) => CheckStatus::from(client.probe().await),
            None => CheckStatus::NotConfigured,
        }
    };
    let upsert = async {
        match &state.upsert {
            Some(client) => CheckStatus::from(client.probe().await),
            None => CheckStatus::NotConfigured,
        }
    };
    let (ollama, n8n_prepare, n8n_upsert) =
        tokio::join!(state.inference.probe(), prepare, upsert);
    HealthReport {
        ollama,
        n8n_prepare,
        n8n_upsert,
        timestamp: timestamp(),
    }
}

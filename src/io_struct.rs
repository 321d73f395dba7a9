use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MODEL: &str = "qwen3:0.6b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,

    /// Fields the gateway does not interpret (images, tool calls, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// Treats an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Accepted for compatibility; the gateway always streams.
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Opaque identifiers, forwarded as whatever JSON the caller sent.
    pub session_id: Option<Value>,
    pub thread_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContextItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContextItem {
    pub fn new(text: impl Into<String>) -> Self {
        ContextItem {
            text: text.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetrievedContext {
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: Vec<ContextItem>,
    #[serde(default, rename = "docRefs", deserialize_with = "null_as_default")]
    pub doc_refs: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct PrepareRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<&'a Value>,
    pub topk: u32,
    pub topn: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpsertRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<Value>,
    pub question: String,
    pub answer: String,
    pub refs: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct InferenceChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub options: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct FrameMessage {
    pub content: Option<String>,
}

/// One NDJSON line of the inference backend's chat stream.
#[derive(Debug, Deserialize)]
pub struct StreamFrame {
    pub message: Option<FrameMessage>,
    #[serde(default)]
    pub done: bool,
}

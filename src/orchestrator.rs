use crate::context::build_context_block;
use crate::error::GatewayError;
use crate::gateway_state::GatewayState;
use crate::io_struct::{
    ChatRequest, ContextItem, InferenceChatRequest, Message, RetrievedContext, Role,
    UpsertRequest,
};
use crate::relay::{RelayOutcome, relay};
use crate::upstream::{Preparation, UpsertClient};
use actix_web::HttpResponse;
use serde_json::Value;
use tokio::sync::oneshot;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson; charset=utf-8";

/// Content of the last user message, or `""` when there is none.
pub fn extract_query(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Base prompt, then the context block if any, then the caller's messages
/// in their original order.
pub fn compose_messages(
    system_prompt: &str,
    context: &[ContextItem],
    messages: Vec<Message>,
) -> Vec<Message> {
    let block = build_context_block(context);
    let mut out = Vec::with_capacity(messages.len() + 2);
    out.push(Message::system(system_prompt));
    if !block.is_empty() {
        out.push(Message::system(block));
    }
    out.extend(messages);
    out
}

async fn retrieve(
    state: &GatewayState,
    query: &str,
    session_id: Option<&Value>,
    thread_id: Option<&Value>,
) -> RetrievedContext {
    let Some(prepare) = &state.prepare else {
        return RetrievedContext::default();
    };
    if query.is_empty() {
        return RetrievedContext::default();
    }
    let preparation = prepare.prepare(query, session_id, thread_id).await;
    if let Preparation::Unavailable(e) = &preparation {
        log::warn!("Context preparation unavailable, continuing without: {}", e);
    }
    preparation.into_context()
}

/// Detached: waits for the relay to stop, then records the exchange once.
fn spawn_upsert(
    upsert: UpsertClient,
    outcome: oneshot::Receiver<RelayOutcome>,
    pending: UpsertRequest,
) {
    tokio::spawn(async move {
        let Ok(outcome) = outcome.await else {
            return;
        };
        if !outcome.should_record() {
            log::debug!(
                "Skipping upsert ({:?}, {} chars)",
                outcome.end,
                outcome.answer.len()
            );
            return;
        }
        let record = UpsertRequest {
            answer: outcome.answer,
            ..pending
        };
        if let Err(e) = upsert.upsert(&record).await {
            log::warn!("Upsert failed: {}", e);
        }
    });
}

/// Run one chat exchange. Errors returned here happen before any byte
/// has been streamed to the caller.
pub async fn handle_chat(
    state: &GatewayState,
    request: ChatRequest,
) -> Result<HttpResponse, GatewayError> {
    let ChatRequest {
        messages,
        model,
        options,
        session_id,
        thread_id,
        ..
    } = request;

    let query = extract_query(&messages).to_string();
    let RetrievedContext { context, doc_refs } =
        retrieve(state, &query, session_id.as_ref(), thread_id.as_ref()).await;
    log::info!(
        "Chat model={} messages={} context_items={}",
        model,
        messages.len(),
        context.len()
    );

    let outgoing = compose_messages(&state.system_prompt, &context, messages);
    let upstream = state
        .inference
        .chat_stream(&InferenceChatRequest {
            model: &model,
            messages: &outgoing,
            stream: true,
            options: &options,
        })
        .await?;

    let (body, outcome) = relay(upstream);
    if let Some(upsert) = &state.upsert {
        let pending = UpsertRequest {
            session_id,
            thread_id,
            question: query,
            answer: String::new(),
            refs: doc_refs,
        };
        spawn_upsert(upsert.clone(), outcome, pending);
    }

    Ok(HttpResponse::Ok()
        .content_type(NDJSON_CONTENT_TYPE)
        .streaming(body))
}

//! Byte-exact relay of the inference NDJSON stream.
//!
//! Chunks go to the caller untouched while a side parser rebuilds the
//! assistant reply from `message.content` of every complete line.

use crate::error::GatewayError;
use crate::io_struct::StreamFrame;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

fn frame_content(line: &[u8]) -> Option<String> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    serde_json::from_slice::<StreamFrame>(line)
        .ok()?
        .message?
        .content
}

/// Incremental NDJSON reader that keeps the unfinished tail between chunks.
#[derive(Debug, Default)]
pub struct AnswerAccumulator {
    pending: Vec<u8>,
    answer: String,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            if let Some(content) = frame_content(&self.pending[start..end]) {
                self.answer.push_str(&content);
            }
            start = end + 1;
        }
        self.pending.drain(..start);
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Decode whatever is left once the body has ended and return the answer.
    pub fn finish(mut self) -> String {
        if let Some(content) = frame_content(&self.pending) {
            self.answer.push_str(&content);
        }
        self.answer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    Completed,
    CallerGone,
    UpstreamFailed,
}

#[derive(Debug)]
pub struct RelayOutcome {
    pub answer: String,
    pub end: RelayEnd,
}

impl RelayOutcome {
    pub fn should_record(&self) -> bool {
        self.end != RelayEnd::UpstreamFailed && !self.answer.trim().is_empty()
    }
}

/// Chunks in flight between the relay task and the caller. A full buffer
/// pauses reads from the inference backend until the caller catches up.
pub const RELAY_BUFFER_CHUNKS: usize = 32;

pub type RelayBody = ReceiverStream<Result<Bytes, GatewayError>>;

/// Spawn the relay task. The returned body feeds the HTTP response; the
/// receiver yields the accumulated answer once the relay has stopped.
pub fn relay<S, E>(upstream: S) -> (RelayBody, oneshot::Receiver<RelayOutcome>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(RELAY_BUFFER_CHUNKS);
    let (outcome_tx, outcome_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut upstream = Box::pin(upstream);
        let mut accumulator = AnswerAccumulator::new();
        let mut end = RelayEnd::Completed;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = tx.closed() => {
                    end = RelayEnd::CallerGone;
                    break;
                }
                chunk = upstream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    if tx.send(Ok(bytes.clone())).await.is_err() {
                        end = RelayEnd::CallerGone;
                        break;
                    }
                    accumulator.push(&bytes);
                }
                Some(Err(e)) => {
                    log::error!("Inference stream error: {}", e);
                    let _ = tx.send(Err(GatewayError::Stream(e.to_string()))).await;
                    end = RelayEnd::UpstreamFailed;
                    break;
                }
                None => break,
            }
        }
        if end == RelayEnd::CallerGone {
            log::info!("Caller disconnected mid-stream");
        }
        let _ = outcome_tx.send(RelayOutcome {
            answer: accumulator.finish(),
            end,
        });
    });

    (ReceiverStream::new(rx), outcome_rx)
}

//! Line-oriented decoding of a chat-completion SSE body.
//!
//! The reader task is the only sender on its channel. Every exit path sends
//! exactly one terminal chunk and then drops the sender, closing the channel.

use crate::domain::ports::{GatewayError, StreamChunk};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const STREAM_CHANNEL_CAPACITY: usize = 32;

const DATA_PREFIX: &str = "data: ";
const DONE_PAYLOAD: &str = "[DONE]";

#[derive(Debug, Default, Deserialize)]
struct StreamEnvelope {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What one SSE line contributes to the stream.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LineEvent {
    pub content: Option<String>,
    pub finished: bool,
}

/// `Ok(None)` for lines that carry nothing: blanks and non-`data:` fields.
pub fn decode_line(line: &str) -> Result<Option<LineEvent>, GatewayError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    if payload.trim() == DONE_PAYLOAD {
        return Ok(Some(LineEvent {
            content: None,
            finished: true,
        }));
    }

    let envelope: StreamEnvelope = serde_json::from_str(payload)
        .map_err(|error| GatewayError::Decode(format!("invalid stream chunk: {error}")))?;
    let Some(choice) = envelope.choices.into_iter().next() else {
        return Ok(Some(LineEvent::default()));
    };
    Ok(Some(LineEvent {
        content: choice.delta.content.filter(|content| !content.is_empty()),
        finished: choice
            .finish_reason
            .is_some_and(|reason| !reason.is_empty()),
    }))
}

/// Accumulates body bytes and hands out complete lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|byte| *byte == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

enum Step {
    Continue,
    Stop(StreamChunk),
}

/// Spawns the reader for `body` and returns the receiving end of its channel.
pub fn spawn_chunk_reader<S, E>(body: S, cancel: CancellationToken) -> mpsc::Receiver<StreamChunk>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let terminal = read_chunks(body, &tx, &cancel).await;
        if let Some(error) = &terminal.error {
            tracing::warn!(error = %error, "model stream ended with error");
        } else {
            tracing::debug!("model stream finished");
        }
        // The receiver may already be gone; there is nobody left to tell.
        let _ = tx.send(terminal).await;
    });
    rx
}

async fn read_chunks<S, E>(
    body: S,
    tx: &mpsc::Sender<StreamChunk>,
    cancel: &CancellationToken,
) -> StreamChunk
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::default();

    loop {
        while let Some(line) = lines.next_line() {
            if let Step::Stop(terminal) = forward_line(&line, tx, cancel).await {
                return terminal;
            }
        }

        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamChunk::failed(GatewayError::cancelled()),
            next = body.next() => next,
        };
        match next {
            Some(Ok(bytes)) => lines.push(&bytes),
            Some(Err(error)) => {
                return StreamChunk::failed(GatewayError::Stream(format!(
                    "failed to read stream: {error}"
                )))
            }
            None => {
                if let Some(line) = lines.take_rest() {
                    if let Step::Stop(terminal) = forward_line(&line, tx, cancel).await {
                        return terminal;
                    }
                }
                return StreamChunk::finished();
            }
        }
    }
}

async fn forward_line(
    line: &str,
    tx: &mpsc::Sender<StreamChunk>,
    cancel: &CancellationToken,
) -> Step {
    if cancel.is_cancelled() {
        return Step::Stop(StreamChunk::failed(GatewayError::cancelled()));
    }
    let event = match decode_line(line) {
        Ok(Some(event)) => event,
        Ok(None) => return Step::Continue,
        Err(error) => return Step::Stop(StreamChunk::failed(error)),
    };
    if let Some(content) = event.content {
        if tx.send(StreamChunk::content(content)).await.is_err() {
            return Step::Stop(StreamChunk::failed(GatewayError::Stream(
                "receiver dropped".to_string(),
            )));
        }
    }
    if event.finished {
        return Step::Stop(StreamChunk::finished());
    }
    Step::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_skips_noise() {
        assert_eq!(decode_line("").unwrap(), None);
        assert_eq!(decode_line(": keep-alive").unwrap(), None);
        assert_eq!(decode_line("event: message").unwrap(), None);
    }

    #[test]
    fn decode_line_reads_content_and_finish() {
        let event = decode_line(
            r#"data: {"choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":"stop"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.content.as_deref(), Some("Hi"));
        assert!(event.finished);
    }

    #[test]
    fn decode_line_recognizes_terminator() {
        assert!(decode_line("data: [DONE]\r").unwrap().unwrap().finished);
    }

    #[test]
    fn line_buffer_splits_across_pushes() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"data: a");
        assert_eq!(buffer.next_line(), None);
        buffer.push(b"bc\ndata: d\n");
        assert_eq!(buffer.next_line().as_deref(), Some("data: abc\n"));
        assert_eq!(buffer.next_line().as_deref(), Some("data: d\n"));
        assert_eq!(buffer.take_rest(), None);
    }
}

mod support;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use smart_task_backend::domain::ports::{GatewayError, StreamChunk};
use smart_task_backend::infrastructure::model::sse::spawn_chunk_reader;
use std::time::Duration;
use support::collect_chunks;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

fn delta(content: &str) -> String {
    format!("data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{content}\"}}}}]}}\n\n")
}

fn body(parts: Vec<String>) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    futures::stream::iter(parts.into_iter().map(|part| Ok(Bytes::from(part))))
}

#[tokio::test]
async fn content_then_single_done_then_closed() {
    let parts = vec![
        ": keep-alive\n\n".to_string(),
        delta("Hel"),
        delta("lo"),
        "data: [DONE]\n\n".to_string(),
        delta("ignored after done"),
    ];
    let chunks = collect_chunks(spawn_chunk_reader(body(parts), CancellationToken::new())).await;

    assert_eq!(
        chunks,
        vec![
            StreamChunk::content("Hel"),
            StreamChunk::content("lo"),
            StreamChunk::finished(),
        ]
    );
}

#[tokio::test]
async fn lines_split_across_reads_are_joined() {
    let line = delta("สวัสดี");
    let (head, tail) = line.split_at(12);
    let parts = vec![head.to_string(), tail.to_string(), "data: [DONE]\n".to_string()];
    let chunks = collect_chunks(spawn_chunk_reader(body(parts), CancellationToken::new())).await;

    assert_eq!(chunks, vec![StreamChunk::content("สวัสดี"), StreamChunk::finished()]);
}

#[tokio::test]
async fn finish_reason_ends_stream() {
    let parts = vec![
        "data: {\"choices\":[{\"delta\":{\"content\":\"bye\"},\"finish_reason\":\"stop\"}]}\n".to_string(),
        delta("never"),
    ];
    let chunks = collect_chunks(spawn_chunk_reader(body(parts), CancellationToken::new())).await;

    assert_eq!(chunks, vec![StreamChunk::content("bye"), StreamChunk::finished()]);
}

#[tokio::test]
async fn eof_without_terminator_finishes_cleanly() {
    // The last line has no trailing newline and must still be delivered.
    let parts = vec![delta("one"), "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}".to_string()];
    let chunks = collect_chunks(spawn_chunk_reader(body(parts), CancellationToken::new())).await;

    assert_eq!(
        chunks,
        vec![
            StreamChunk::content("one"),
            StreamChunk::content("two"),
            StreamChunk::finished(),
        ]
    );
}

#[tokio::test]
async fn malformed_chunk_is_terminal_error() {
    let parts = vec![delta("ok"), "data: {not json}\n".to_string(), delta("lost")];
    let chunks = collect_chunks(spawn_chunk_reader(body(parts), CancellationToken::new())).await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], StreamChunk::content("ok"));
    assert!(chunks[1].done);
    assert!(matches!(chunks[1].error, Some(GatewayError::Decode(_))));
}

#[tokio::test]
async fn read_failure_is_terminal_error() {
    let parts: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from(delta("partial"))),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer")),
    ];
    let chunks =
        collect_chunks(spawn_chunk_reader(futures::stream::iter(parts), CancellationToken::new())).await;

    assert_eq!(chunks.len(), 2);
    let error = chunks[1].error.clone().expect("terminal error");
    assert!(matches!(error, GatewayError::Stream(_)));
    assert!(error.to_string().contains("reset by peer"));
}

#[tokio::test]
async fn cancellation_mid_stream_emits_one_error_and_closes() {
    let (body_tx, body_rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(4);
    let cancel = CancellationToken::new();
    let mut rx = spawn_chunk_reader(ReceiverStream::new(body_rx), cancel.clone());

    body_tx.send(Ok(Bytes::from(delta("first")))).await.unwrap();
    assert_eq!(rx.recv().await, Some(StreamChunk::content("first")));

    cancel.cancel();
    // More body after cancellation must not be forwarded.
    let _ = body_tx.send(Ok(Bytes::from(delta("late")))).await;

    let terminal = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("reader reacts to cancellation")
        .expect("terminal chunk");
    assert!(terminal.done);
    assert_eq!(terminal.error, Some(GatewayError::cancelled()));
    assert_eq!(rx.recv().await, None);
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};

/// Lazy sequence of content deltas for one streamed assistant turn.
/// Finite and not restartable; a new request must be made to re-stream.
pub type DeltaStream = BoxStream<'static, ChatResult<String>>;

/// Cooperative cancellation token shared between a pending stream and its
/// controller. Cancelling is idempotent; clones observe the same state.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            // Register interest before re-checking so a cancel between the
            // check and the await is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// One decoded protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    /// A `data:` payload whose JSON carried a string `content` field.
    Delta(String),
    /// A `data:` payload that failed JSON parsing; carried verbatim so
    /// malformed-but-present data is never dropped.
    Raw(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Incremental frame reassembly for the `data: <payload>\n\n` block protocol.
///
/// Bytes arrive on arbitrary chunk boundaries, including mid-block and
/// mid-UTF-8-codepoint. Blocks are split on the blank line at the byte level
/// (the delimiter is ASCII, so codepoint fragments can only sit in the
/// retained tail), and the last incomplete block stays buffered until more
/// bytes complete it or the stream ends.
#[derive(Default)]
pub(crate) struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next decoded event, or `None` if no complete block is buffered.
    /// Blocks without the `data: ` prefix and JSON payloads without a string
    /// `content` field are skipped without yielding.
    pub(crate) fn next_event(&mut self) -> Option<SseEvent> {
        while let Some(pos) = find_block_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..pos + 2).take(pos).collect();
            let text = String::from_utf8_lossy(&block);
            if let Some(event) = parse_block(&text) {
                return Some(event);
            }
        }
        None
    }
}

fn find_block_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let payload = block.strip_prefix("data: ")?;
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => value
            .get("content")
            .and_then(|c| c.as_str())
            .map(|s| SseEvent::Delta(s.to_string())),
        Err(error) => {
            warn!(%error, payload, "Unparseable stream payload, passing through verbatim");
            Some(SseEvent::Raw(payload.to_string()))
        }
    }
}

/// Wrap a raw byte stream into a lazy sequence of content deltas.
///
/// One outstanding read at a time, deltas delivered in arrival order. The
/// cancellation token is raced against every pending read; when it fires the
/// stream fails with `StreamAborted`. Every exit path (`[DONE]`, exhaustion,
/// error, abort) drops the byte stream, releasing the underlying connection.
pub fn decode_stream<S, E>(mut bytes: S, cancel: CancelToken) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut frames = FrameBuffer::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stream read cancelled");
                    yield Err(ChatError::StreamAborted);
                    return;
                }
                chunk = bytes.next() => chunk,
            };

            match chunk {
                Some(Ok(chunk)) => {
                    frames.push(&chunk);
                    while let Some(event) = frames.next_event() {
                        match event {
                            SseEvent::Delta(text) => yield Ok(text),
                            SseEvent::Raw(raw) => yield Ok(raw),
                            SseEvent::Done => {
                                debug!("Stream end marker [DONE] received");
                                return;
                            }
                        }
                    }
                }
                Some(Err(error)) => {
                    yield Err(ChatError::StreamFailed(error.to_string()));
                    return;
                }
                None => return,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Route decoder tracing through the test harness so `warn!` output for
    /// malformed frames shows up alongside failing assertions.
    fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pstral_core=debug")
            .with_test_writer()
            .try_init();
    }

    fn chunk_stream(
        chunks: Vec<Vec<u8>>,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    async fn collect_deltas(chunks: Vec<Vec<u8>>) -> Vec<String> {
        let mut stream = decode_stream(chunk_stream(chunks), CancelToken::new());
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap());
        }
        out
    }

    fn event(content: &str) -> String {
        format!("data: {}\n\n", serde_json::json!({ "content": content }))
    }

    #[tokio::test]
    async fn yields_one_delta_per_event() {
        let body = format!("{}{}data: [DONE]\n\n", event("SELECT"), event(" * FROM customers"));
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["SELECT", " * FROM customers"]);
    }

    #[tokio::test]
    async fn delta_sequence_is_invariant_under_chunk_splits() {
        let body = format!("{}{}data: [DONE]\n\n", event("héllo"), event(" wörld"))
            .into_bytes();
        let expected = vec!["héllo".to_string(), " wörld".to_string()];

        // Every two-way split, including mid-line and mid-UTF-8-codepoint.
        for split in 0..=body.len() {
            let chunks = vec![body[..split].to_vec(), body[split..].to_vec()];
            assert_eq!(collect_deltas(chunks).await, expected, "split at {split}");
        }

        // Byte-at-a-time delivery.
        let chunks: Vec<Vec<u8>> = body.iter().map(|b| vec![*b]).collect();
        assert_eq!(collect_deltas(chunks).await, expected);
    }

    #[tokio::test]
    async fn done_terminates_even_with_buffered_bytes() {
        let body = format!("{}data: [DONE]\n\n{}", event("first"), event("never"));
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["first"]);
    }

    #[tokio::test]
    async fn malformed_payload_falls_back_to_raw_text() {
        init_test_logging();
        let body = format!("data: not json at all\n\n{}data: [DONE]\n\n", event("ok"));
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["not json at all", "ok"]);
    }

    #[tokio::test]
    async fn json_without_content_field_is_dropped() {
        let body = format!(
            "data: {{\"usage\": 12}}\n\n{}data: [DONE]\n\n",
            event("kept")
        );
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["kept"]);
    }

    #[tokio::test]
    async fn non_data_blocks_are_skipped() {
        let body = format!(": keepalive\n\n{}data: [DONE]\n\n", event("kept"));
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["kept"]);
    }

    #[tokio::test]
    async fn stream_end_without_done_flushes_nothing_incomplete() {
        // Trailing half-finished block is retained, never emitted.
        let body = format!("{}data: {{\"content\": \"tru", event("whole"));
        let deltas = collect_deltas(vec![body.into_bytes()]).await;
        assert_eq!(deltas, vec!["whole"]);
    }

    #[tokio::test]
    async fn cancellation_fails_the_pending_read() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut stream = decode_stream(
            futures::stream::pending::<Result<Bytes, std::io::Error>>(),
            cancel,
        );
        match stream.next().await {
            Some(Err(ChatError::StreamAborted)) => {}
            other => panic!("expected StreamAborted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_stream_failed() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from(event("partial"))),
            Err(std::io::Error::other("connection reset")),
        ];
        let mut stream = decode_stream(futures::stream::iter(chunks), CancelToken::new());
        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        match stream.next().await {
            Some(Err(ChatError::StreamFailed(msg))) => {
                assert!(msg.contains("connection reset"));
            }
            other => panic!("expected StreamFailed, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn cancel_token_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }
}

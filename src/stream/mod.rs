pub mod ndjson;

use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::ProxyError;
use crate::protocol::ollama::ChatChunk;
use crate::stream::ndjson::{parse_chunk_line, NdjsonLines};

/// Dialect seam for the stream drivers: turns decoded native chunks into
/// ready-to-write SSE frames, and produces the dialect's graceful terminator
/// when the backend stream fails underneath us.
pub trait ChunkFramer: Send + 'static {
    fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<String>;
    fn abort_frames(&mut self, err: &ProxyError) -> Vec<String>;
}

/// Drives the backend's byte stream through the NDJSON splitter and a
/// dialect framer, yielding one SSE frame per pull.
///
/// Lazy and non-restartable: nothing is read from the backend until the
/// client-side body asks for the next frame, so memory stays bounded by one
/// line plus pending frames, and dropping the body drops the backend
/// connection with it.
pub struct FramedChatStream<F: ChunkFramer> {
    upstream: BoxStream<'static, reqwest::Result<Bytes>>,
    lines: NdjsonLines,
    framer: F,
    pending: VecDeque<String>,
    read_timeout: Duration,
    finished: bool,
}

impl<F: ChunkFramer> FramedChatStream<F> {
    pub fn new(
        response: reqwest::Response,
        framer: F,
        initial_frames: Vec<String>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            upstream: response.bytes_stream().boxed(),
            lines: NdjsonLines::new(),
            framer,
            pending: initial_frames.into(),
            read_timeout,
            finished: false,
        }
    }

    /// Next outbound SSE frame, or `None` when the stream is complete.
    /// Suspends only while awaiting the next backend read.
    pub async fn next_frame(&mut self) -> Option<String> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(frame);
            }
            if self.finished {
                return None;
            }
            self.fill_pending().await;
        }
    }

    /// Convert into an axum body streaming each frame as it is produced.
    pub fn into_body(self) -> axum::body::Body {
        let frames = futures_util::stream::unfold(self, |mut driver| async move {
            let frame = driver.next_frame().await?;
            Some((Ok::<Bytes, Infallible>(Bytes::from(frame)), driver))
        });
        axum::body::Body::from_stream(frames)
    }

    async fn fill_pending(&mut self) {
        match tokio::time::timeout(self.read_timeout, self.upstream.next()).await {
            Err(_) => {
                self.abort(&ProxyError::Transport(
                    "timed out waiting for the next backend chunk".to_string(),
                ));
            }
            Ok(None) => {
                self.abort(&ProxyError::Transport(
                    "backend stream ended before completion".to_string(),
                ));
            }
            Ok(Some(Err(err))) => {
                self.abort(&ProxyError::Transport(format!(
                    "backend stream failed: {err}"
                )));
            }
            Ok(Some(Ok(bytes))) => {
                self.lines.push(&bytes);
                while let Some(line) = self.lines.next_line() {
                    let Some(chunk) = parse_chunk_line(&line) else {
                        continue;
                    };
                    self.pending.extend(self.framer.on_chunk(&chunk));
                    if chunk.done {
                        self.finished = true;
                        break;
                    }
                }
            }
        }
    }

    fn abort(&mut self, err: &ProxyError) {
        tracing::warn!(error = %err, "terminating stream early");
        self.pending.extend(self.framer.abort_frames(err));
        self.finished = true;
    }
}

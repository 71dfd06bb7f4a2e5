//! Inbound body capture for replay across attempts.
//!
//! # Responsibilities
//! - Decide once per request whether its body can be sent more than once
//! - Materialize replayable bodies in memory
//! - Stream non-replayable bodies to the first attempt only
//!
//! # Design Decisions
//! - Only a declared `Content-Length` within the ceiling is buffered
//! - Chunked or unknown-length bodies are never buffered, whatever their size
//! - A body is read exactly once; attempts receive cheap `Bytes` clones

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderMap};
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunks in flight between the inbound body and the upstream request.
const BRIDGE_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
}

/// An inbound body, prepared before the attempt loop.
#[derive(Debug)]
pub enum BufferedRequestBody {
    /// No content; replayable.
    Empty,
    /// Fully read; replayable.
    Captured(Bytes),
    /// Too large or of unknown length; sent at most once.
    Unbuffered(Option<Body>),
}

impl BufferedRequestBody {
    /// Prepare `body` given the request `headers` and the replay ceiling.
    pub async fn try_buffer(
        headers: &HeaderMap,
        body: Body,
        max_bytes: usize,
    ) -> Result<Self, BodyError> {
        let declared = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let length = match declared {
            Some(0) => return Ok(BufferedRequestBody::Empty),
            Some(length) => length,
            None if headers.contains_key(header::TRANSFER_ENCODING) => {
                return Ok(BufferedRequestBody::Unbuffered(Some(body)));
            }
            // HTTP/2 uploads carry neither header; only a finished stream is empty.
            None if body.is_end_stream() => return Ok(BufferedRequestBody::Empty),
            None => return Ok(BufferedRequestBody::Unbuffered(Some(body))),
        };

        match usize::try_from(length) {
            Ok(length) if length <= max_bytes => {
                let bytes = axum::body::to_bytes(body, length).await?;
                Ok(BufferedRequestBody::Captured(bytes))
            }
            _ => Ok(BufferedRequestBody::Unbuffered(Some(body))),
        }
    }

    /// Whether the body may be sent to a second platform.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BufferedRequestBody::Unbuffered(_))
    }

    /// Captured length, if the body was read into memory.
    pub fn captured_len(&self) -> Option<usize> {
        match self {
            BufferedRequestBody::Empty => Some(0),
            BufferedRequestBody::Captured(bytes) => Some(bytes.len()),
            BufferedRequestBody::Unbuffered(_) => None,
        }
    }

    /// Outbound body for the next attempt.
    ///
    /// Returns `None` when there is nothing to send, including every call after
    /// the first for an unbuffered body.
    pub fn for_attempt(&mut self) -> Option<reqwest::Body> {
        match self {
            BufferedRequestBody::Empty => None,
            BufferedRequestBody::Captured(bytes) => Some(reqwest::Body::from(bytes.clone())),
            BufferedRequestBody::Unbuffered(body) => body.take().map(stream_upstream),
        }
    }
}

/// Pump an inbound body into a `reqwest::Body`.
///
/// `reqwest::Body::wrap_stream` needs a `Sync` stream, which the inbound body
/// is not, so chunks cross a bounded channel fed by a spawned task.
fn stream_upstream(body: Body) -> reqwest::Body {
    let (tx, rx) = mpsc::channel(BRIDGE_CAPACITY);

    tokio::spawn(async move {
        let mut chunks = body.into_data_stream();
        while let Some(chunk) = chunks.next().await {
            let failed = chunk.is_err();
            // Receiver gone: the attempt was dropped.
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(ChannelBody { rx })
}

struct ChannelBody {
    rx: mpsc::Receiver<Result<Bytes, axum::Error>>,
}

impl Stream for ChannelBody {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

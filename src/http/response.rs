//! Response handling.
//!
//! # Responsibilities
//! - Relay an upstream response to the client as a stream
//! - Tell the caller how a relayed body ended
//! - Produce the proxy's own plain-text rejections
//!
//! # Design Decisions
//! - Upstream bodies are never buffered
//! - Hop-by-hop headers and `Transfer-Encoding` are stripped before relaying
//! - A relayed body dropped before its end (client gone) reports nothing

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{BoxStream, Stream, StreamExt};

use crate::security::headers::relay_response_headers;

/// Hand an upstream response to the client: status, filtered headers, streamed body.
pub fn relay(upstream: reqwest::Response) -> Response {
    relay_observed(upstream, |_| {})
}

/// Like [`relay`], calling `on_end` once when the upstream body finishes:
/// `None` on a clean end, the read error otherwise.
pub fn relay_observed<F>(upstream: reqwest::Response, on_end: F) -> Response
where
    F: FnOnce(Option<&reqwest::Error>) + Send + Unpin + 'static,
{
    let status = upstream.status();
    let headers = relay_response_headers(upstream.headers());
    let body = ObservedBody {
        inner: upstream.bytes_stream().boxed(),
        on_end: Some(on_end),
    };

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Plain-text response generated by the proxy itself.
pub fn rejection(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

struct ObservedBody<F> {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    on_end: Option<F>,
}

impl<F> ObservedBody<F>
where
    F: FnOnce(Option<&reqwest::Error>),
{
    fn finish(&mut self, error: Option<&reqwest::Error>) {
        if let Some(on_end) = self.on_end.take() {
            on_end(error);
        }
    }
}

impl<F> Stream for ObservedBody<F>
where
    F: FnOnce(Option<&reqwest::Error>) + Unpin,
{
    type Item = reqwest::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let polled = this.inner.poll_next_unpin(cx);
        match &polled {
            Poll::Ready(None) => this.finish(None),
            Poll::Ready(Some(Err(error))) => this.finish(Some(error)),
            _ => {}
        }
        polled
    }
}

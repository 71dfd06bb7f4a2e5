//! Request orchestration.
//!
//! # Request State Machine
//! ```text
//! AUTHORIZE ─(bad secret)──────────────────────────────▶ 401
//!     │
//! RESOLVE (group + forward path)
//!     │
//! SELECT ─(no platforms / none healthy)────────────────▶ 503
//!     │
//! ATTEMPT(i) ─(status < 400)───────────────────────────▶ relay upstream response
//!     │  │                                   (health reported when the body ends)
//!     │  ├─(status >= 400, retry allowed)──▶ ATTEMPT(i+1)
//!     │  ├─(status >= 400, last attempt)───▶ relay upstream response
//!     │  ├─(timeout / transport error)─────▶ ATTEMPT(i+1) or exhausted
//!     │  └─(shutdown)──────────────────────▶ empty 503, no health impact
//!     │
//! exhausted ──────────────────────────────────────────▶ 503
//! ```
//!
//! Every attempt outcome except a cancellation is reported to the platform's
//! health before the next attempt starts. A relayed success is reported once its
//! body has streamed to the end; a body that breaks midway counts as a failure.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use axum::body::Body;
use axum::http::{request::Parts, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::health::HealthTracker;
use crate::http::body::BufferedRequestBody;
use crate::http::request::build_target_url;
use crate::http::response::{rejection, relay, relay_observed};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::platform::Platform;
use crate::load_balancer::{BuildError, CandidateSelector, PlatformDirectory, SelectError};
use crate::observability::metrics::{self, AttemptOutcome};
use crate::observability::{AttemptRecord, CircuitBreakRecord, RequestLogger};
use crate::resilience::{attempt_limit, can_retry, run_attempt, AttemptError, Interrupted};
use crate::routing::{GroupRouter, ResolvedRoute};
use crate::security::{check_bearer, forward_request_headers};

pub const NO_UPSTREAM_CONFIGURED: &str = "No upstream configured for this group.";
pub const NO_HEALTHY_UPSTREAM_FOR_GROUP: &str = "No healthy upstream available for this group.";
pub const NO_HEALTHY_UPSTREAM: &str = "No healthy upstream available.";
pub const BAD_REQUEST_BODY: &str = "Failed to read request body.";

/// Errors building the proxy service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Platform(#[from] BuildError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared per-process proxy state; one instance serves every request.
#[derive(Debug)]
pub struct ProxyService {
    config: Arc<ProxyConfig>,
    router: GroupRouter,
    selector: CandidateSelector,
    health: HealthTracker,
    logger: RequestLogger,
    client: reqwest::Client,
}

/// Per-request values shared by every attempt.
struct Inbound<'a> {
    parts: &'a Parts,
    route: &'a ResolvedRoute,
    log_path: &'a str,
}

enum Attempted {
    /// The response to send; the request is finished.
    Respond(Response),
    /// Try the next candidate.
    Next,
}

impl ProxyService {
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, ServiceError> {
        let directory = Arc::new(PlatformDirectory::new(&config.platforms)?);
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self {
            router: GroupRouter::from_config(&config),
            selector: CandidateSelector::new(directory),
            health: HealthTracker::new(&config.health),
            logger: RequestLogger::new(),
            client,
            config,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<PlatformDirectory> {
        self.selector.directory()
    }

    pub fn router(&self) -> &GroupRouter {
        &self.router
    }

    /// Serve one inbound request.
    ///
    /// `shutdown` aborts an in-flight attempt; dropping the returned future
    /// (client disconnect) aborts it as well, without touching health.
    pub async fn handle(&self, request: Request<Body>, shutdown: &ShutdownSignal) -> Response {
        let (parts, body) = request.into_parts();

        if let Err(error) = check_bearer(&parts.headers, &self.config.server.auth_key) {
            tracing::debug!(error = %error, path = %parts.uri.path(), "Unauthorized request");
            metrics::record_rejection("unauthorized");
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let route = self.router.resolve(parts.uri.path());
        let group = self.config.group_override(&route.group);

        let candidates = match self.selector.get_candidates(
            &route.group,
            group,
            &self.config.server,
            Instant::now(),
        ) {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::warn!(group = %route.group, error = %error, "No candidate platform");
                return match error {
                    SelectError::NoUpstreamConfigured => {
                        metrics::record_rejection("no_upstream");
                        rejection(StatusCode::SERVICE_UNAVAILABLE, NO_UPSTREAM_CONFIGURED)
                    }
                    SelectError::NoHealthyUpstream => {
                        metrics::record_rejection("no_healthy_upstream");
                        rejection(StatusCode::SERVICE_UNAVAILABLE, NO_HEALTHY_UPSTREAM_FOR_GROUP)
                    }
                };
            }
        };

        let limit = attempt_limit(self.config.effective_max_failover(group), candidates.len());
        let timeout = self.config.effective_timeout(group);

        let mut body = match BufferedRequestBody::try_buffer(
            &parts.headers,
            body,
            self.config.server.max_request_body_bytes,
        )
        .await
        {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(group = %route.group, error = %error, "Request body unreadable");
                metrics::record_rejection("bad_request");
                return rejection(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
            }
        };

        let log_path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let inbound = Inbound {
            parts: &parts,
            route: &route,
            log_path,
        };

        for (attempt, platform) in candidates.iter().take(limit).enumerate() {
            if attempt > 0 && !body.is_retryable() {
                break;
            }

            let started = Instant::now();
            let outbound = self.outbound(&inbound, platform, &mut body);
            let outcome = run_attempt(outbound.send(), timeout, shutdown.triggered()).await;

            let result = match outcome {
                Err(Interrupted::Cancelled) => {
                    tracing::info!(
                        group = %route.group,
                        platform = %platform.name(),
                        "Request aborted by shutdown"
                    );
                    metrics::record_rejection("shutdown");
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                Err(Interrupted::DeadlineElapsed) => Err(AttemptError::Timeout),
                Ok(Err(error)) => Err(AttemptError::Transport(error_chain(&error))),
                Ok(Ok(response)) => Ok(response),
            };

            let retry_allowed = can_retry(attempt, limit, body.is_retryable());
            let attempted = match result {
                Ok(response) => {
                    self.on_response(&inbound, platform, response, started, attempt, limit, retry_allowed)
                }
                Err(error) => {
                    self.on_error(&inbound, platform, &error, started, attempt, limit);
                    Attempted::Next
                }
            };

            if let Attempted::Respond(response) = attempted {
                return response;
            }
        }

        metrics::record_rejection("exhausted");
        rejection(StatusCode::SERVICE_UNAVAILABLE, NO_HEALTHY_UPSTREAM)
    }

    fn outbound(
        &self,
        inbound: &Inbound<'_>,
        platform: &Platform,
        body: &mut BufferedRequestBody,
    ) -> reqwest::RequestBuilder {
        let url = build_target_url(
            platform.base_url(),
            &inbound.route.forward_path,
            inbound.parts.uri.query(),
        );
        let headers = forward_request_headers(&inbound.parts.headers, platform);

        let builder = self
            .client
            .request(inbound.parts.method.clone(), url)
            .headers(headers);
        match body.for_attempt() {
            Some(outbound) => builder.body(outbound),
            None => builder,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_response(
        &self,
        inbound: &Inbound<'_>,
        platform: &Arc<Platform>,
        response: reqwest::Response,
        started: Instant,
        attempt: usize,
        limit: usize,
        retry_allowed: bool,
    ) -> Attempted {
        let status = response.status();
        let elapsed = started.elapsed();
        let group = inbound.route.group.as_str();

        if !HealthTracker::is_failure_status(status) {
            let completion = RelayCompletion {
                health: self.health.clone(),
                logger: self.logger,
                platform: Arc::clone(platform),
                group: group.to_string(),
                method: inbound.parts.method.clone(),
                path: inbound.log_path.to_string(),
                status: status.as_u16(),
                started,
                attempt,
                limit,
            };
            if response.content_length() == Some(0) || inbound.parts.method == Method::HEAD {
                completion.finish(None);
                return Attempted::Respond(relay(response));
            }
            return Attempted::Respond(relay_observed(response, move |error| {
                completion.finish(error)
            }));
        }

        self.report_failure(group, platform, status.as_str());
        metrics::record_attempt(group, platform.name(), AttemptOutcome::FailureStatus, elapsed);

        if retry_allowed {
            self.log_attempt(
                inbound,
                platform,
                status.as_u16(),
                started,
                attempt,
                limit,
                Some("retryable status"),
            );
            Attempted::Next
        } else {
            self.log_attempt(inbound, platform, status.as_u16(), started, attempt, limit, None);
            Attempted::Respond(relay(response))
        }
    }

    fn on_error(
        &self,
        inbound: &Inbound<'_>,
        platform: &Platform,
        error: &AttemptError,
        started: Instant,
        attempt: usize,
        limit: usize,
    ) {
        let group = inbound.route.group.as_str();
        let reason = error.to_string();
        let outcome = match error {
            AttemptError::Timeout => AttemptOutcome::Timeout,
            AttemptError::Transport(_) => AttemptOutcome::TransportError,
        };

        self.report_failure(group, platform, &reason);
        metrics::record_attempt(group, platform.name(), outcome, started.elapsed());
        self.log_attempt(
            inbound,
            platform,
            error.log_status(),
            started,
            attempt,
            limit,
            Some(&reason),
        );
    }

    fn report_failure(&self, group: &str, platform: &Platform, reason: &str) {
        report_failure(&self.health, &self.logger, group, platform, reason);
    }

    #[allow(clippy::too_many_arguments)]
    fn log_attempt(
        &self,
        inbound: &Inbound<'_>,
        platform: &Platform,
        status: u16,
        started: Instant,
        attempt: usize,
        limit: usize,
        error: Option<&str>,
    ) {
        self.logger.log_attempt(&AttemptRecord {
            timestamp: SystemTime::now(),
            group: &inbound.route.group,
            platform: platform.name(),
            method: inbound.parts.method.as_str(),
            path: inbound.log_path,
            status,
            elapsed: started.elapsed(),
            success: error.is_none() && status < 400,
            attempt: attempt + 1,
            attempt_limit: limit,
            error,
        });
    }
}

/// Everything needed to settle a successful attempt once its body has been relayed.
struct RelayCompletion {
    health: HealthTracker,
    logger: RequestLogger,
    platform: Arc<Platform>,
    group: String,
    method: Method,
    path: String,
    status: u16,
    started: Instant,
    attempt: usize,
    limit: usize,
}

impl RelayCompletion {
    fn finish(self, error: Option<&reqwest::Error>) {
        let elapsed = self.started.elapsed();
        let reason = error.map(|e| error_chain(e));

        match &reason {
            None => {
                self.health.report_success(&self.platform);
                metrics::record_attempt(&self.group, self.platform.name(), AttemptOutcome::Success, elapsed);
            }
            Some(reason) => {
                report_failure(&self.health, &self.logger, &self.group, &self.platform, reason);
                metrics::record_attempt(&self.group, self.platform.name(), AttemptOutcome::BodyError, elapsed);
            }
        }

        self.logger.log_attempt(&AttemptRecord {
            timestamp: SystemTime::now(),
            group: &self.group,
            platform: self.platform.name(),
            method: self.method.as_str(),
            path: &self.path,
            status: self.status,
            elapsed,
            success: reason.is_none(),
            attempt: self.attempt + 1,
            attempt_limit: self.limit,
            error: reason.as_deref(),
        });
    }
}

fn report_failure(
    health: &HealthTracker,
    logger: &RequestLogger,
    group: &str,
    platform: &Platform,
    reason: &str,
) {
    let Some(event) = health.report_failure(platform, Instant::now()) else {
        return;
    };
    metrics::record_circuit_break(group, platform.name());
    logger.log_circuit_break(&CircuitBreakRecord::from_event(group, platform.name(), reason, &event));
}

/// Render an error with its sources, e.g. `error sending request: connection refused`.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::lifecycle::Shutdown;
    use axum::http::header;

    fn service(toml: &str) -> ProxyService {
        ProxyService::new(Arc::new(parse_config(toml).unwrap())).unwrap()
    }

    const UNREACHABLE: &str = r#"
        [server]
        auth_key = "secret"

        [[platforms]]
        name = "dead"
        base_url = "http://127.0.0.1:9"
        group = "g"
    "#;

    fn request(path: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_wrong_secret() {
        let proxy = service(UNREACHABLE);
        let shutdown = Shutdown::new();

        let response = proxy
            .handle(request("/g/v1", Some("Bearer nope")), &shutdown.signal())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = proxy.handle(request("/g/v1", None), &shutdown.signal()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let dead = proxy.directory().platform("dead").unwrap();
        assert_eq!(dead.health().snapshot().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_unknown_group_without_platforms() {
        let proxy = service(UNREACHABLE);
        let shutdown = Shutdown::new();

        // `/v1` is not a group, so it lands in the empty default group.
        let response = proxy
            .handle(request("/v1", Some("Bearer secret")), &shutdown.signal())
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transport_error_counts_against_health() {
        let proxy = service(UNREACHABLE);
        let shutdown = Shutdown::new();

        let response = proxy
            .handle(request("/g/v1", Some("Bearer secret")), &shutdown.signal())
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let dead = proxy.directory().platform("dead").unwrap();
        assert_eq!(dead.health().snapshot().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_without_health_impact() {
        let proxy = service(UNREACHABLE);
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let response = proxy
            .handle(request("/g/v1", Some("Bearer secret")), &shutdown.signal())
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let dead = proxy.directory().platform("dead").unwrap();
        assert_eq!(dead.health().snapshot(), Default::default());
    }

    #[test]
    fn test_error_chain_skips_repeated_text() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] std::io::Error);

        let error = Outer(std::io::Error::new(std::io::ErrorKind::Other, "refused"));
        assert_eq!(error_chain(&error), "outer: refused");
    }
}

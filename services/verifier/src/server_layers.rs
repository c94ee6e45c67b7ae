use std::time::Duration;

use axum::response::IntoResponse;
use http::{Request, Response, StatusCode};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::ErrorResponse;

/// Request span with method and path; `/health` probes get none.
#[derive(Clone, Debug)]
pub struct MakeRequestSpan;

impl<B> MakeSpan<B> for MakeRequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        if request.uri().path() == "/health" {
            return Span::none();
        }

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// Logs server failures at `error` and everything else at `debug` inside a live span.
#[derive(Clone, Debug)]
pub struct ConditionalOnResponse;

impl<B> OnResponse<B> for ConditionalOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                latency_ms = latency.as_millis(),
                "request failed",
            );
        } else if !span.is_disabled() && status != StatusCode::NOT_FOUND {
            tracing::debug!(
                status = %status,
                latency_ms = latency.as_millis(),
                "request completed",
            );
        }
    }
}

pub fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    MakeRequestSpan,
    DefaultOnRequest,
    ConditionalOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(MakeRequestSpan)
        .on_response(ConditionalOnResponse)
}

/// Answers `504 Gateway Timeout` once a request runs longer than `timeout`.
pub fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, timeout)
}

/// Gives the empty `504` produced by [`timeout_layer`] the API's JSON error body.
pub async fn timeout_error_body(response: axum::response::Response) -> axum::response::Response {
    if response.status() == StatusCode::GATEWAY_TIMEOUT {
        return ErrorResponse::gateway_timeout().into_response();
    }
    response
}

//! Per-request proxy pipeline
//!
//! Validates the target, fetches it upstream with disguised headers,
//! classifies challenges, then either redirects to the solver, rewrites HTML,
//! or streams the body through untouched.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{MirageError, Result, USAGE_MESSAGE};
use crate::proxy::fetch::{UpstreamBody, UpstreamResponse};
use crate::proxy::rewrite::{encode_component, RewriteContext};
use crate::proxy::server::AppState;
use crate::proxy::{challenge, disguise, rewrite, sanitize};

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

/// GET /proxy?url=...
#[instrument(skip(state, headers))]
pub async fn proxy(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> Response {
    let Some(target) = params.url else {
        return MirageError::MissingTarget.into_response();
    };

    let self_base = self_base(&headers, &state);

    match run_pipeline(&state, &target, &self_base).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Proxy request for {} failed: {}", target, e);
            e.into_response()
        }
    }
}

/// GET / — fixed usage responder, outside the proxy pipeline
pub async fn usage() -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain")],
        USAGE_MESSAGE,
    )
        .into_response()
}

/// Scheme and host under which this proxy is being accessed, used when
/// building proxied links.
fn self_base(headers: &HeaderMap, state: &AppState) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.addr());

    format!("{}://{}", scheme, host)
}

/// The single-request state machine: validate, fetch, classify, respond
async fn run_pipeline(state: &AppState, raw_target: &str, self_base: &str) -> Result<Response> {
    let target = Url::parse(raw_target)
        .map_err(|_| MirageError::MalformedTarget(raw_target.to_string()))?;

    let outbound_headers = disguise::headers_for(&target);
    let upstream = state.fetcher.fetch(&target, outbound_headers).await?;

    if challenge::is_challenge(&upstream) {
        debug!("Challenge detected for {}, redirecting to solver", raw_target);
        return redirect_to_solver(state, raw_target);
    }

    let UpstreamResponse {
        status,
        headers: mut response_headers,
        content_type,
        body,
    } = upstream;

    sanitize::sanitize_response_headers(&mut response_headers, &state.config.fetch.identifier);

    let response = match body {
        UpstreamBody::Text(text) if content_type.contains("text/html") => {
            let ctx = RewriteContext::new(target, self_base.to_string());
            let rewritten = rewrite::rewrite_html(&text, &ctx);
            // Rewriting changes the length; let axum set it fresh.
            response_headers.remove(header::CONTENT_LENGTH);
            build_response(status, response_headers, Body::from(rewritten))
        }
        UpstreamBody::Text(text) => {
            response_headers.remove(header::CONTENT_LENGTH);
            build_response(status, response_headers, Body::from(text))
        }
        // Binary bodies stream straight through; the pull-based body gives
        // backpressure and drops the upstream connection if the client goes
        // away.
        UpstreamBody::Stream(stream) => {
            build_response(status, response_headers, Body::from_stream(stream))
        }
    };

    Ok(response)
}

/// 302 to the external challenge-solving service
fn redirect_to_solver(state: &AppState, raw_target: &str) -> Result<Response> {
    let location = format!(
        "{}/?url={}",
        state.config.solver.base_url,
        encode_component(raw_target)
    );

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .map_err(|e| MirageError::Internal(e.to_string()))
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

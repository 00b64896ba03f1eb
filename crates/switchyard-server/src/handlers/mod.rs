//! HTTP endpoints and the built-in action handlers.

mod echo;
mod site;
mod status;

use crate::server::AppState;
use axum::{
    body::Body,
    extract::{ConnectInfo, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use switchyard::{ActionRequest, DispatchOutcome, Handler, HandlerSource, ResponseSink};
use tracing::{debug, error};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// Built-in handlers
// ============================================================================

/// Handlers compiled into the server binary.
///
/// With a module manifest, every handler is registered under the module it
/// names instead of the default one.
#[derive(Debug, Default)]
pub struct BuiltinHandlers {
    manifest: Option<PathBuf>,
}

impl BuiltinHandlers {
    pub fn new(manifest: Option<PathBuf>) -> Self {
        Self { manifest }
    }
}

impl HandlerSource for BuiltinHandlers {
    fn name(&self) -> &str {
        "builtin"
    }

    fn discover(&self) -> Vec<Handler> {
        let handlers = vec![
            Handler::json_output(status::Ping),
            Handler::json_in_out(echo::Echo),
            Handler::text(site::SiteRoot),
            Handler::raw(site::Download),
        ];

        match &self.manifest {
            Some(path) => handlers
                .into_iter()
                .map(|h| h.with_module_manifest(path))
                .collect(),
            None => handlers,
        }
    }
}

// ============================================================================
// Request and response translation
// ============================================================================

/// Turn the pieces of an HTTP request into an [`ActionRequest`].
///
/// Query parameters come first, then form-encoded body parameters.
pub(crate) fn build_action_request(
    query: Option<&str>,
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    body: Bytes,
) -> ActionRequest {
    let mut request = ActionRequest::new();

    if let Some(query) = query {
        request = request.with_parameters(url::form_urlencoded::parse(query.as_bytes()).into_owned());
    }

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false);
    if is_form {
        request = request.with_parameters(url::form_urlencoded::parse(&body).into_owned());
    }

    for (name, value) in headers {
        request = request.with_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    if let Some(addr) = remote {
        request = request.with_remote_addr(addr.ip().to_string());
    }

    request.with_body(body)
}

/// Write a filled [`ResponseSink`] out as an HTTP response.
pub(crate) fn into_http_response(sink: ResponseSink) -> Response {
    let (status, content_type, headers, body) = sink.into_parts();

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    for (name, value) in headers {
        builder = builder.header(name, value);
    }

    match builder.body(Body::from(body)) {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Action endpoint. Every registered handler is reached through here.
pub async fn handle_action(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = build_action_request(
        query.as_deref(),
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        body,
    );
    let mut sink = ResponseSink::new();

    match state.dispatcher.dispatch(&request, &mut sink).await {
        Ok(outcome) => {
            if let DispatchOutcome::Failed { key, .. } = &outcome {
                debug!("Action {} failed, response already written", key);
            }
            into_http_response(sink)
        }
        Err(e) => {
            error!("Dispatch error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

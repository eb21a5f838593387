use std::error::Error as StdError;

use moodboard_contracts::{Backend, CallContext, DomainError};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::{classify, ErrorDetail, RawFailure};
use crate::config::{BackendConfig, ConfigError};

const LOGGED_BODY_CHARS: usize = 512;
const DETAIL_BODY_CHARS: usize = 200;

pub(crate) fn build_client(backend: Backend, config: &BackendConfig) -> Result<HttpClient, ConfigError> {
    HttpClient::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|source| ConfigError::HttpClient { backend, source })
}

pub(crate) fn with_extra_headers(mut request: RequestBuilder, config: &BackendConfig) -> RequestBuilder {
    for (name, value) in &config.extra_headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

/// Sends one JSON request and returns the parsed success body.
///
/// Transport errors and non-2xx statuses come back already classified.
pub(crate) fn send_json(
    request: RequestBuilder,
    endpoint: &str,
    body: &Value,
    ctx: CallContext,
) -> Result<Value, DomainError> {
    debug!(
        backend = ctx.backend.name(),
        mode = ?ctx.mode,
        endpoint,
        "sending image request"
    );
    let response = request
        .json(body)
        .send()
        .map_err(|err| fail(ctx, RawFailure::Transport(error_chain_text(&err))))?;
    let status = response.status();
    let text = response
        .text()
        .map_err(|err| fail(ctx, RawFailure::Transport(error_chain_text(&err))))?;
    debug!(
        backend = ctx.backend.name(),
        status = status.as_u16(),
        body = %truncate_text(&text, LOGGED_BODY_CHARS),
        "provider response"
    );

    if !status.is_success() {
        let detail = ErrorDetail::from_body(&text).unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                ErrorDetail::message(status.canonical_reason().unwrap_or_default())
            } else {
                ErrorDetail::message(truncate_text(trimmed, DETAIL_BODY_CHARS))
            }
        });
        return Err(fail(
            ctx,
            RawFailure::Http {
                status: status.as_u16(),
                detail,
            },
        ));
    }

    serde_json::from_str(&text).map_err(|err| {
        warn!(
            backend = ctx.backend.name(),
            error = %err,
            "provider returned invalid JSON"
        );
        DomainError::malformed_response(ctx)
    })
}

/// Classifies and logs a failure in one step.
pub(crate) fn fail(ctx: CallContext, failure: RawFailure) -> DomainError {
    let err = classify(&failure, ctx);
    warn!(
        backend = ctx.backend.name(),
        mode = ?ctx.mode,
        kind = %err.kind(),
        "image call failed: {}",
        err.message()
    );
    err
}

fn error_chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(|last| last != trimmed).unwrap_or(true) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), DETAIL_BODY_CHARS)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

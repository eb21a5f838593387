//! Maps raw provider failures onto the fixed [`DomainErrorKind`] taxonomy.
//!
//! [`DomainErrorKind`]: moodboard_contracts::DomainErrorKind

use moodboard_contracts::{CallContext, DomainError};
use serde_json::Value;

const CREDENTIAL_TOKENS: &[&str] = &[
    "authentication_error",
    "invalid_api_key",
    "invalid api key",
    "api_key_invalid",
    "api key not valid",
    "unauthorized",
];
const RATE_TOKENS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "resource_exhausted",
];
const QUOTA_TOKENS: &[&str] = &[
    "quota",
    "credits",
    "insufficient funds",
    "insufficient balance",
    "insufficient_balance",
];
const POLICY_TOKENS: &[&str] = &[
    "content_policy_violation",
    "content policy",
    "moderation_blocked",
];

/// Whatever the provider said about a failure, as far as it could be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: Option<String>,
    pub code: Option<String>,
    pub status: Option<String>,
    pub kind: Option<String>,
}

impl ErrorDetail {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    /// Best effort: `None` when the body is not JSON or carries no known
    /// error envelope.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let detail = match value.get("error") {
            Some(Value::Object(error)) => Self {
                message: error.get("message").and_then(value_text),
                code: error.get("code").and_then(value_text),
                status: error.get("status").and_then(value_text),
                kind: error.get("type").and_then(value_text),
            },
            Some(Value::String(message)) => Self::message(message.clone()),
            _ => {
                if let Some(base_resp) = value.get("base_resp").filter(|resp| {
                    resp.get("status_code")
                        .and_then(Value::as_i64)
                        .map(|code| code != 0)
                        .unwrap_or(false)
                }) {
                    Self {
                        message: base_resp.get("status_msg").and_then(value_text),
                        code: base_resp.get("status_code").and_then(value_text),
                        ..Self::default()
                    }
                } else {
                    Self {
                        message: value.get("message").and_then(value_text),
                        code: value.get("code").and_then(value_text),
                        ..Self::default()
                    }
                }
            }
        };
        if detail == Self::default() {
            return None;
        }
        Some(detail)
    }

    fn haystack(&self) -> String {
        [&self.message, &self.code, &self.status, &self.kind]
            .into_iter()
            .flatten()
            .map(|text| text.to_ascii_lowercase())
            .collect::<Vec<String>>()
            .join(" ")
    }

    fn summary(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.status.as_deref())
            .or(self.code.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// The request never produced an HTTP response.
    Transport(String),
    /// Non-success status, or a success status whose body reports an error.
    Http { status: u16, detail: ErrorDetail },
    /// The provider withheld the image and named a safety reason.
    Blocked { reason: String },
    /// Nothing structured to go on.
    Unstructured,
}

pub fn classify(failure: &RawFailure, ctx: CallContext) -> DomainError {
    match failure {
        RawFailure::Unstructured => DomainError::unstructured(ctx),
        RawFailure::Blocked { reason } => DomainError::safety_blocked(ctx, reason),
        RawFailure::Transport(text) => {
            let text = text.trim();
            if text.is_empty() {
                return DomainError::unstructured(ctx);
            }
            classify_signals(None, &text.to_ascii_lowercase(), ctx).unwrap_or_else(|| {
                DomainError::unknown(
                    ctx,
                    &format!("{} request failed: {text}", ctx.backend.label()),
                )
            })
        }
        RawFailure::Http { status, detail } => {
            classify_signals(Some(*status), &detail.haystack(), ctx).unwrap_or_else(|| {
                let summary = detail.summary().unwrap_or("no error details");
                DomainError::unknown(
                    ctx,
                    &format!("{} API error: {status} - {summary}", ctx.backend.label()),
                )
            })
        }
    }
}

fn classify_signals(status: Option<u16>, haystack: &str, ctx: CallContext) -> Option<DomainError> {
    if status == Some(401) || contains_any(haystack, CREDENTIAL_TOKENS) {
        return Some(DomainError::invalid_credential(ctx));
    }
    if status == Some(429) || contains_any(haystack, RATE_TOKENS) {
        return Some(DomainError::rate_limited(ctx));
    }
    if contains_any(haystack, QUOTA_TOKENS) {
        return Some(DomainError::quota_exceeded(ctx));
    }
    if contains_any(haystack, POLICY_TOKENS) {
        return Some(DomainError::content_policy_blocked(ctx));
    }
    None
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

use moodboard_contracts::{Backend, BaseImage, CallContext, DomainError, GeneratedItem, GenerationMode};
use reqwest::blocking::Client as HttpClient;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use super::{finish, ImageAdapter};
use crate::classify::{ErrorDetail, RawFailure};
use crate::config::{BackendConfig, ConfigError};
use crate::extract::extract_chat_message;
use crate::transport::{build_client, fail, send_json, with_extra_headers};

const MODEL: &str = "google/gemini-2.5-flash-image";
const DEFAULT_MIME: &str = "image/png";

pub struct OpenRouterAdapter {
    config: BackendConfig,
    http: HttpClient,
}

impl OpenRouterAdapter {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        config.ensure_credential(Backend::OpenRouter)?;
        let http = build_client(Backend::OpenRouter, &config)?;
        Ok(Self { config, http })
    }
}

impl ImageAdapter for OpenRouterAdapter {
    fn backend(&self) -> Backend {
        Backend::OpenRouter
    }

    fn generate(
        &self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<GeneratedItem, DomainError> {
        let ctx = CallContext::new(
            Backend::OpenRouter,
            GenerationMode::for_base_image(base_image),
        );
        let endpoint = format!("{}/chat/completions", self.config.api_base);
        let payload = build_payload(prompt, base_image);
        let request = with_extra_headers(
            self.http
                .post(&endpoint)
                .bearer_auth(self.config.api_key.expose_secret()),
            &self.config,
        );
        let body = send_json(request, &endpoint, &payload, ctx)?;
        if let Some(failure) = embedded_error(&body) {
            return Err(fail(ctx, failure));
        }
        finish(prompt, extract_chat_message(&body, DEFAULT_MIME, ctx), ctx)
    }
}

pub(crate) fn build_payload(prompt: &str, base_image: Option<&BaseImage>) -> Value {
    let content = match base_image {
        Some(base) => json!([
            {
                "type": "text",
                "text": format!(
                    "Edit this architectural moodboard image: {prompt}. Keep the moodboard style with clean, elegant visual elements and no text."
                ),
            },
            {
                "type": "image_url",
                "image_url": { "url": base.to_data_uri() },
            },
        ]),
        None => json!([{
            "type": "text",
            "text": format!(
                "Create an architectural moodboard image of: {prompt}. Keep it clean and elegant with a few well-chosen elements and no text."
            ),
        }]),
    };
    json!({
        "model": MODEL,
        "modalities": ["image", "text"],
        "messages": [{ "role": "user", "content": content }],
    })
}

/// OpenRouter forwards upstream failures as a 200 body with an `error` object.
/// A null `error` next to valid choices is not a failure.
fn embedded_error(body: &Value) -> Option<RawFailure> {
    let error = body.get("error").filter(|error| !error.is_null())?;
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(200);
    let detail = ErrorDetail::from_value(body).unwrap_or_else(|| ErrorDetail::message(error.to_string()));
    Some(RawFailure::Http { status, detail })
}

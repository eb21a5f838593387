use moodboard_contracts::{Backend, BaseImage, CallContext, DomainError, GeneratedItem, GenerationMode};
use reqwest::blocking::Client as HttpClient;
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};

use super::{finish, moodboard_prompt, reference_prompt, ImageAdapter};
use crate::config::{BackendConfig, ConfigError};
use crate::extract::{extract_image_list, ImageListShape};
use crate::transport::{build_client, send_json};

const MODEL: &str = "gpt-image-1-mini";
const SIZE: &str = "1024x1024";
const QUALITY: &str = "low";
const OUTPUT_FORMAT: &str = "png";
const RESPONSE_SHAPES: &[ImageListShape] = &[ImageListShape {
    list: "/data",
    payload: "/b64_json",
    mime: None,
    blocked: None,
    default_mime: "image/png",
}];

pub struct OpenAiAdapter {
    config: BackendConfig,
    http: HttpClient,
}

impl OpenAiAdapter {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        config.ensure_credential(Backend::OpenAi)?;
        let http = build_client(Backend::OpenAi, &config)?;
        Ok(Self { config, http })
    }
}

impl ImageAdapter for OpenAiAdapter {
    fn backend(&self) -> Backend {
        Backend::OpenAi
    }

    fn generate(
        &self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<GeneratedItem, DomainError> {
        let mode = GenerationMode::for_base_image(base_image);
        let ctx = CallContext::new(Backend::OpenAi, mode);
        let endpoint = match mode {
            GenerationMode::Create => format!("{}/images/generations", self.config.api_base),
            GenerationMode::Edit => format!("{}/images/edits", self.config.api_base),
        };
        let payload = build_payload(prompt, base_image);
        let request = self
            .http
            .post(&endpoint)
            .bearer_auth(self.config.api_key.expose_secret());
        let body = send_json(request, &endpoint, &payload, ctx)?;
        finish(prompt, extract_image_list(&body, RESPONSE_SHAPES, ctx), ctx)
    }
}

pub(crate) fn build_payload(prompt: &str, base_image: Option<&BaseImage>) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(MODEL));
    payload.insert("size".to_string(), json!(SIZE));
    payload.insert("quality".to_string(), json!(QUALITY));
    payload.insert("n".to_string(), json!(1));
    payload.insert("output_format".to_string(), json!(OUTPUT_FORMAT));
    match base_image {
        Some(base) => {
            payload.insert("prompt".to_string(), json!(reference_prompt(prompt)));
            payload.insert(
                "images".to_string(),
                json!([{ "image_url": base.to_data_uri() }]),
            );
        }
        None => {
            payload.insert("prompt".to_string(), json!(moodboard_prompt(prompt)));
        }
    }
    Value::Object(payload)
}

use moodboard_contracts::{Backend, BaseImage, CallContext, DomainError, GeneratedItem, GenerationMode};
use reqwest::blocking::Client as HttpClient;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use super::{finish, ImageAdapter};
use crate::config::{BackendConfig, ConfigError};
use crate::extract::{extract_candidate_parts, extract_image_list, ImageListShape};
use crate::transport::{build_client, send_json};

const CREATE_MODEL: &str = "imagen-4.0-generate-001";
const EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";
const EDIT_SYSTEM_INSTRUCTION: &str = "You are an AI image editing tool. Modify the user's image based on their text prompt. Only output the edited image. Do not output any conversational text.";
const CREATE_MIME: &str = "image/jpeg";
const EDIT_DEFAULT_MIME: &str = "image/png";

// REST predictions first, then the SDK-style `generatedImages` envelope.
const PREDICT_SHAPES: &[ImageListShape] = &[
    ImageListShape {
        list: "/predictions",
        payload: "/bytesBase64Encoded",
        mime: Some("/mimeType"),
        blocked: Some("/raiFilteredReason"),
        default_mime: CREATE_MIME,
    },
    ImageListShape {
        list: "/generatedImages",
        payload: "/image/imageBytes",
        mime: Some("/image/mimeType"),
        blocked: Some("/raiFilteredReason"),
        default_mime: CREATE_MIME,
    },
];

pub struct GeminiAdapter {
    config: BackendConfig,
    http: HttpClient,
}

impl GeminiAdapter {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        config.ensure_credential(Backend::Gemini)?;
        let http = build_client(Backend::Gemini, &config)?;
        Ok(Self { config, http })
    }

    fn post(&self, endpoint: &str, payload: &Value, ctx: CallContext) -> Result<Value, DomainError> {
        let request = self
            .http
            .post(endpoint)
            .header("x-goog-api-key", self.config.api_key.expose_secret());
        send_json(request, endpoint, payload, ctx)
    }
}

impl ImageAdapter for GeminiAdapter {
    fn backend(&self) -> Backend {
        Backend::Gemini
    }

    fn generate(
        &self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<GeneratedItem, DomainError> {
        match base_image {
            Some(base) => {
                let ctx = CallContext::new(Backend::Gemini, GenerationMode::Edit);
                let endpoint = format!(
                    "{}/models/{EDIT_MODEL}:generateContent",
                    self.config.api_base
                );
                let body = self.post(&endpoint, &build_edit_payload(prompt, base), ctx)?;
                finish(
                    prompt,
                    extract_candidate_parts(&body, EDIT_DEFAULT_MIME, ctx),
                    ctx,
                )
            }
            None => {
                let ctx = CallContext::new(Backend::Gemini, GenerationMode::Create);
                let endpoint = format!("{}/models/{CREATE_MODEL}:predict", self.config.api_base);
                let body = self.post(&endpoint, &build_create_payload(prompt), ctx)?;
                finish(prompt, extract_image_list(&body, PREDICT_SHAPES, ctx), ctx)
            }
        }
    }
}

pub(crate) fn build_create_payload(prompt: &str) -> Value {
    json!({
        "instances": [{
            "prompt": format!("Create an architectural moodboard image of: {prompt}"),
        }],
        "parameters": {
            "sampleCount": 1,
            "outputMimeType": CREATE_MIME,
            "includeRaiReason": true,
        },
    })
}

pub(crate) fn build_edit_payload(prompt: &str, base: &BaseImage) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": EDIT_SYSTEM_INSTRUCTION }],
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "inlineData": { "mimeType": base.mime_type(), "data": base.data() } },
                { "text": prompt },
            ],
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
        },
    })
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use moodboard_contracts::{BaseImage, DomainErrorKind};
    use serde_json::json;

    use super::{build_create_payload, build_edit_payload, GeminiAdapter};
    use crate::adapters::ImageAdapter;
    use crate::config::BackendConfig;

    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn adapter(server: &Server) -> GeminiAdapter {
        GeminiAdapter::new(BackendConfig::new("g-key", server.url())).unwrap()
    }

    fn base() -> BaseImage {
        BaseImage::new(PIXEL, "image/jpeg").unwrap()
    }

    #[test]
    fn create_and_edit_payloads_differ_in_shape() {
        let create = build_create_payload("courtyard");
        assert_eq!(
            create["instances"][0]["prompt"],
            "Create an architectural moodboard image of: courtyard"
        );
        assert_eq!(create["parameters"]["sampleCount"], 1);
        assert!(create.get("contents").is_none());

        let edit = build_edit_payload("courtyard", &base());
        let parts = &edit["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], PIXEL);
        assert_eq!(parts[1]["text"], "courtyard");
        assert_eq!(
            edit["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
        assert!(edit.get("instances").is_none());
    }

    #[test]
    fn create_uses_predict_endpoint_and_api_key_header() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .match_header("x-goog-api-key", "g-key")
            .match_body(Matcher::PartialJson(json!({
                "parameters": { "outputMimeType": "image/jpeg" }
            })))
            .with_status(200)
            .with_body(
                json!({ "predictions": [{ "bytesBase64Encoded": PIXEL, "mimeType": "image/png" }] })
                    .to_string(),
            )
            .create();

        let item = adapter(&server).generate("courtyard", None).unwrap();
        mock.assert();
        assert_eq!(item.mime_type(), "image/png");
        assert_eq!(item.base64_data(), PIXEL);
    }

    #[test]
    fn create_filtered_prediction_is_safety_blocked() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .with_status(200)
            .with_body(
                json!({ "predictions": [{ "raiFilteredReason": "Unable to show generated images." }] })
                    .to_string(),
            )
            .create();
        let err = adapter(&server).generate("courtyard", None).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::SafetyBlocked);
        assert_eq!(
            err.message(),
            "A geração da imagem falhou devido a filtros de segurança: Unable to show generated images."
        );
    }

    #[test]
    fn create_without_predictions_is_empty_response() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .with_status(200)
            .with_body("{}")
            .create();
        let err = adapter(&server).generate("courtyard", None).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::EmptyResponse);
        assert_eq!(
            err.message(),
            "A geração da imagem falhou. A API não retornou nenhuma imagem."
        );
    }

    #[test]
    fn edit_reads_inline_part_from_candidates() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash-image-preview:generateContent")
            .match_header("x-goog-api-key", "g-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "parts": [{ "inlineData": { "mimeType": "image/jpeg", "data": PIXEL } }, { "text": "courtyard" }] }]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "parts": [
                            { "text": "Edited." },
                            { "inlineData": { "data": PIXEL } }
                        ]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create();

        let item = adapter(&server).generate("courtyard", Some(&base())).unwrap();
        mock.assert();
        assert_eq!(item.mime_type(), "image/png");
    }

    #[test]
    fn edit_prompt_block_is_safety_blocked() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash-image-preview:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create();
        let err = adapter(&server)
            .generate("courtyard", Some(&base()))
            .unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::SafetyBlocked);
        assert!(err.message().ends_with(": SAFETY"));
    }

    #[test]
    fn resource_exhausted_and_401_statuses() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .with_status(429)
            .with_body(
                r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#,
            )
            .create();
        let err = adapter(&server).generate("courtyard", None).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::RateLimited);

        let mut denied = Server::new();
        let _denied = denied
            .mock("POST", "/models/gemini-2.5-flash-image-preview:generateContent")
            .with_status(401)
            .with_body("")
            .create();
        let err = adapter(&denied)
            .generate("courtyard", Some(&base()))
            .unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::InvalidCredential);
    }
}

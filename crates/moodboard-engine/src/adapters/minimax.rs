use moodboard_contracts::{Backend, BaseImage, CallContext, DomainError, GeneratedItem, GenerationMode};
use reqwest::blocking::Client as HttpClient;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use super::{finish, moodboard_prompt, reference_prompt, ImageAdapter};
use crate::classify::{ErrorDetail, RawFailure};
use crate::config::{BackendConfig, ConfigError};
use crate::extract::{extract_image_list, ImageListShape};
use crate::transport::{build_client, fail, send_json};

const MODEL: &str = "image-01";
const ASPECT_RATIO: &str = "16:9";
const RESPONSE_SHAPES: &[ImageListShape] = &[ImageListShape {
    list: "/data/image_base64",
    payload: "",
    mime: None,
    blocked: None,
    default_mime: "image/jpeg",
}];

pub struct MiniMaxAdapter {
    config: BackendConfig,
    http: HttpClient,
}

impl MiniMaxAdapter {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        config.ensure_credential(Backend::MiniMax)?;
        let http = build_client(Backend::MiniMax, &config)?;
        Ok(Self { config, http })
    }
}

impl ImageAdapter for MiniMaxAdapter {
    fn backend(&self) -> Backend {
        Backend::MiniMax
    }

    fn generate(
        &self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<GeneratedItem, DomainError> {
        let ctx = CallContext::new(Backend::MiniMax, GenerationMode::for_base_image(base_image));
        let endpoint = format!("{}/image_generation", self.config.api_base);
        let payload = build_payload(prompt, base_image);
        let request = self
            .http
            .post(&endpoint)
            .bearer_auth(self.config.api_key.expose_secret());
        let body = send_json(request, &endpoint, &payload, ctx)?;
        if let Some(failure) = base_resp_failure(&body) {
            return Err(fail(ctx, failure));
        }
        finish(prompt, extract_image_list(&body, RESPONSE_SHAPES, ctx), ctx)
    }
}

pub(crate) fn build_payload(prompt: &str, base_image: Option<&BaseImage>) -> Value {
    match base_image {
        Some(base) => json!({
            "model": MODEL,
            "prompt": reference_prompt(prompt),
            "aspect_ratio": ASPECT_RATIO,
            "response_format": "base64",
            "subject_reference": [{
                "type": "character",
                "image_file": base.to_data_uri(),
            }],
        }),
        None => json!({
            "model": MODEL,
            "prompt": moodboard_prompt(prompt),
            "aspect_ratio": ASPECT_RATIO,
            "response_format": "base64",
        }),
    }
}

/// MiniMax answers some failures with HTTP 200 and a non-zero
/// `base_resp.status_code`.
fn base_resp_failure(body: &Value) -> Option<RawFailure> {
    let base_resp = body.get("base_resp")?;
    let code = base_resp.get("status_code")?.as_i64()?;
    if code == 0 {
        return None;
    }
    let token = match code {
        1002 => "rate_limit_exceeded".to_string(),
        1004 => "authentication_error".to_string(),
        1008 => "insufficient_balance".to_string(),
        1026 | 1027 => "content_policy_violation".to_string(),
        other => other.to_string(),
    };
    Some(RawFailure::Http {
        status: u16::try_from(code).unwrap_or(200),
        detail: ErrorDetail {
            message: base_resp
                .get("status_msg")
                .and_then(Value::as_str)
                .map(str::to_string),
            code: Some(token),
            ..ErrorDetail::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use moodboard_contracts::{BaseImage, DomainErrorKind};
    use serde_json::json;

    use super::{build_payload, MiniMaxAdapter};
    use crate::adapters::ImageAdapter;
    use crate::config::BackendConfig;

    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn adapter(server: &Server) -> MiniMaxAdapter {
        MiniMaxAdapter::new(BackendConfig::new("mm-key", server.url())).unwrap()
    }

    #[test]
    fn create_payload_has_fixed_fields_and_no_reference() {
        let payload = build_payload("timber pavilion", None);
        assert_eq!(payload["model"], "image-01");
        assert_eq!(payload["aspect_ratio"], "16:9");
        assert_eq!(payload["response_format"], "base64");
        assert!(payload["prompt"]
            .as_str()
            .unwrap()
            .ends_with("Theme: timber pavilion"));
        assert!(payload.get("subject_reference").is_none());
    }

    #[test]
    fn edit_payload_carries_subject_reference() {
        let base = BaseImage::new(PIXEL, "image/jpeg").unwrap();
        let payload = build_payload("timber pavilion", Some(&base));
        assert_eq!(payload["subject_reference"][0]["type"], "character");
        assert_eq!(
            payload["subject_reference"][0]["image_file"],
            format!("data:image/jpeg;base64,{PIXEL}")
        );
        assert!(payload["prompt"]
            .as_str()
            .unwrap()
            .contains("Use the visual reference as inspiration."));
    }

    #[test]
    fn create_returns_jpeg_item() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/image_generation")
            .match_header("authorization", "Bearer mm-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "image-01",
                "aspect_ratio": "16:9",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": { "image_base64": [PIXEL] },
                    "base_resp": { "status_code": 0, "status_msg": "success" }
                })
                .to_string(),
            )
            .create();

        let item = adapter(&server)
            .generate("brutalist concrete house at sunset", None)
            .unwrap();
        mock.assert();
        assert_eq!(item.mime_type(), "image/jpeg");
        assert_eq!(item.base64_data(), PIXEL);
        assert_eq!(item.prompt(), "brutalist concrete house at sunset");
        assert_eq!(item.image_url(), format!("data:image/jpeg;base64,{PIXEL}"));
    }

    #[test]
    fn base_resp_errors_in_success_body_are_classified() {
        let cases = [
            (1002, "rate limit exceeded(RPM)", DomainErrorKind::RateLimited),
            (1004, "login fail", DomainErrorKind::InvalidCredential),
            (1008, "insufficient balance", DomainErrorKind::QuotaExceeded),
            (1026, "input new_sensitive", DomainErrorKind::ContentPolicyBlocked),
            (2013, "invalid params", DomainErrorKind::Unknown),
        ];
        for (code, message, expected) in cases {
            let mut server = Server::new();
            let _mock = server
                .mock("POST", "/image_generation")
                .with_status(200)
                .with_body(
                    json!({ "data": null, "base_resp": { "status_code": code, "status_msg": message } })
                        .to_string(),
                )
                .create();
            let err = adapter(&server).generate("facade", None).unwrap_err();
            assert_eq!(err.kind(), expected, "code {code}");
        }
    }

    #[test]
    fn unknown_base_resp_code_is_reported_in_detail() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/image_generation")
            .with_status(200)
            .with_body(r#"{"base_resp":{"status_code":2013,"status_msg":"invalid params"}}"#)
            .create();
        let err = adapter(&server).generate("facade", None).unwrap_err();
        assert_eq!(
            err.message(),
            "Falha ao gerar imagem: MiniMax API error: 2013 - invalid params"
        );
    }

    #[test]
    fn http_401_is_invalid_credential() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/image_generation")
            .with_status(401)
            .with_body("unauthorized")
            .create();
        let err = adapter(&server).generate("facade", None).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::InvalidCredential);
        assert_eq!(
            err.message(),
            "Chave da API MiniMax inválida. Verifique sua MINIMAX_API_KEY."
        );
    }

    #[test]
    fn empty_image_list_is_empty_response() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/image_generation")
            .with_status(200)
            .with_body(r#"{"data":{"image_base64":[]},"base_resp":{"status_code":0}}"#)
            .create();
        let err = adapter(&server).generate("facade", None).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::EmptyResponse);
    }
}

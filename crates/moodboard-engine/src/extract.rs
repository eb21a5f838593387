//! Locates the generated image inside a provider's success body.
//!
//! Providers (and versions of the same provider) disagree on where the image
//! lives, so each entry point walks an ordered list of known shapes and the
//! first match wins. A data URI found along the way always carries its own
//! MIME type; bare payloads fall back to the backend default.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use moodboard_contracts::{
    find_image_data_uri, is_base64_payload, is_image_mime, CallContext, DataUri, DomainError,
};
use serde_json::Value;

use crate::classify::{classify, RawFailure};

const SAFETY_FINISH_REASONS: &[&str] = &["SAFETY", "IMAGE_SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub base64_data: String,
    pub mime_type: String,
}

impl ExtractedImage {
    fn from_data_uri(uri: DataUri) -> Self {
        let (mime_type, base64_data) = uri.into_parts();
        Self {
            base64_data,
            mime_type,
        }
    }

    /// A payload field may hold bare base64 or a full data URI. Anything else
    /// (a hosted URL, prose) is not an image.
    fn from_payload(payload: &str, fallback_mime: &str) -> Option<Self> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        if payload.starts_with("data:") {
            return DataUri::parse(payload)
                .ok()
                .or_else(|| find_image_data_uri(payload))
                .map(Self::from_data_uri);
        }
        if !is_base64_payload(payload) {
            return None;
        }
        Some(Self {
            base64_data: payload.to_string(),
            mime_type: fallback_mime.to_string(),
        })
    }
}

/// Where one "list of generated images" variant keeps its data.
///
/// All paths are JSON pointers; `payload`, `mime` and `blocked` are relative
/// to the first list entry (`""` is the entry itself).
#[derive(Debug, Clone, Copy)]
pub struct ImageListShape {
    pub list: &'static str,
    pub payload: &'static str,
    pub mime: Option<&'static str>,
    pub blocked: Option<&'static str>,
    pub default_mime: &'static str,
}

pub fn extract_image_list(
    body: &Value,
    shapes: &[ImageListShape],
    ctx: CallContext,
) -> Result<ExtractedImage, DomainError> {
    for shape in shapes {
        let Some(first) = body
            .pointer(shape.list)
            .and_then(Value::as_array)
            .and_then(|list| list.first())
        else {
            continue;
        };

        let mime = shape
            .mime
            .and_then(|pointer| first.pointer(pointer))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|mime| is_image_mime(mime))
            .unwrap_or(shape.default_mime);
        if let Some(image) = first
            .pointer(shape.payload)
            .and_then(Value::as_str)
            .and_then(|payload| ExtractedImage::from_payload(payload, mime))
        {
            return Ok(image);
        }
        if let Some(reason) = shape
            .blocked
            .and_then(|pointer| first.pointer(pointer))
            .and_then(Value::as_str)
            .filter(|reason| !reason.trim().is_empty())
        {
            return Err(classify(
                &RawFailure::Blocked {
                    reason: reason.to_string(),
                },
                ctx,
            ));
        }
        return Err(DomainError::malformed_response(ctx));
    }
    Err(DomainError::empty_response(ctx))
}

pub fn extract_candidate_parts(
    body: &Value,
    default_mime: &str,
    ctx: CallContext,
) -> Result<ExtractedImage, DomainError> {
    let candidates = body
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|candidates| !candidates.is_empty());
    let Some(candidates) = candidates else {
        if let Some(reason) = body
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            return Err(classify(
                &RawFailure::Blocked {
                    reason: reason.to_string(),
                },
                ctx,
            ));
        }
        return Err(DomainError::empty_response(ctx));
    };

    let inline_image = candidates
        .iter()
        .filter_map(|candidate| candidate.pointer("/content/parts").and_then(Value::as_array))
        .flatten()
        .find_map(|part| inline_part_image(part, default_mime));
    if let Some(image) = inline_image {
        return Ok(image);
    }

    if let Some(reason) = candidates[0]
        .get("finishReason")
        .and_then(Value::as_str)
        .filter(|reason| SAFETY_FINISH_REASONS.contains(reason))
    {
        return Err(classify(
            &RawFailure::Blocked {
                reason: reason.to_string(),
            },
            ctx,
        ));
    }
    Err(DomainError::malformed_response(ctx))
}

fn inline_part_image(part: &Value, default_mime: &str) -> Option<ExtractedImage> {
    let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
    let mime = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .filter(|mime| is_image_mime(mime))
        .unwrap_or(default_mime);
    ExtractedImage::from_payload(inline.get("data")?.as_str()?, mime)
}

type ChatMatcher = fn(&Value, &str) -> Option<ExtractedImage>;

/// (a) attachment list, (b) data URI inside text content, (c) text content
/// that is itself the payload, (d) content object with a `url`.
const CHAT_MATCHERS: [ChatMatcher; 4] = [
    attachment_list_image,
    embedded_content_image,
    bare_content_image,
    content_url_image,
];

pub fn extract_chat_message(
    body: &Value,
    default_mime: &str,
    ctx: CallContext,
) -> Result<ExtractedImage, DomainError> {
    let Some(choice) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    else {
        return Err(DomainError::empty_response(ctx));
    };
    let message = choice.get("message").unwrap_or(&Value::Null);
    CHAT_MATCHERS
        .iter()
        .find_map(|matcher| matcher(message, default_mime))
        .ok_or_else(|| DomainError::malformed_response(ctx))
}

fn attachment_list_image(message: &Value, _default_mime: &str) -> Option<ExtractedImage> {
    let first = message.get("images")?.as_array()?.first()?;
    let url = first
        .pointer("/image_url/url")
        .or_else(|| first.get("image_url"))
        .and_then(Value::as_str)?;
    find_image_data_uri(url).map(ExtractedImage::from_data_uri)
}

fn embedded_content_image(message: &Value, _default_mime: &str) -> Option<ExtractedImage> {
    let content = message.get("content")?.as_str()?;
    find_image_data_uri(content).map(ExtractedImage::from_data_uri)
}

fn bare_content_image(message: &Value, default_mime: &str) -> Option<ExtractedImage> {
    let content = message.get("content")?.as_str()?.trim();
    // Short words like "Done" are valid base64, so the bytes must look like an image.
    let bytes = BASE64.decode(content.as_bytes()).ok()?;
    image::guess_format(&bytes).ok()?;
    ExtractedImage::from_payload(content, default_mime)
}

fn content_url_image(message: &Value, _default_mime: &str) -> Option<ExtractedImage> {
    let url = message.get("content")?.get("url")?.as_str()?;
    find_image_data_uri(url).map(ExtractedImage::from_data_uri)
}

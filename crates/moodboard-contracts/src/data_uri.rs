//! The `data:<mime>;base64,<payload>` grammar.
//!
//! Providers embed images as data URIs in several places (attachment lists,
//! free-text message content, URL fields). All parsing of that form goes
//! through this module so the rules live in one place:
//!
//! - `<mime>` is `type/subtype`, each side built from ASCII alphanumerics and
//!   `+ - .`
//! - `<payload>` is non-empty standard base64 with `=` padding only at the end

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref EMBEDDED_IMAGE_DATA_URI: Regex =
        Regex::new(r"data:(image/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/]+={0,2})").unwrap();
}

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUriError {
    #[error("data URI must start with 'data:'")]
    MissingScheme,
    #[error("data URI is missing the ';base64,' marker")]
    MissingBase64Marker,
    #[error("data URI has an invalid MIME type '{0}'")]
    InvalidMimeType(String),
    #[error("data URI payload is empty")]
    EmptyPayload,
    #[error("data URI payload has an invalid character at offset {0}")]
    InvalidPayload(usize),
}

impl DataUri {
    /// Strict whole-string parse.
    pub fn parse(text: &str) -> Result<Self, DataUriError> {
        let rest = text
            .strip_prefix(SCHEME)
            .ok_or(DataUriError::MissingScheme)?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or(DataUriError::MissingBase64Marker)?;
        if !is_valid_mime(mime_type) {
            return Err(DataUriError::InvalidMimeType(mime_type.to_string()));
        }
        if payload.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        if let Some(offset) = invalid_payload_offset(payload) {
            return Err(DataUriError::InvalidPayload(offset));
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_parts(self) -> (String, String) {
        (self.mime_type, self.payload)
    }
}

/// First `data:image/...;base64,...` occurrence inside arbitrary text.
pub fn find_image_data_uri(text: &str) -> Option<DataUri> {
    let captures = EMBEDDED_IMAGE_DATA_URI.captures(text)?;
    Some(DataUri {
        mime_type: captures.get(1)?.as_str().to_string(),
        payload: captures.get(2)?.as_str().to_string(),
    })
}

pub fn format_data_uri(mime_type: &str, payload: &str) -> String {
    format!("{SCHEME}{mime_type}{BASE64_MARKER}{payload}")
}

/// Whether `payload` could stand after the `;base64,` marker.
pub fn is_base64_payload(payload: &str) -> bool {
    !payload.is_empty() && invalid_payload_offset(payload).is_none()
}

/// An `image/*` MIME type that satisfies the data-URI grammar.
pub fn is_image_mime(raw: &str) -> bool {
    raw.starts_with("image/") && is_valid_mime(raw)
}

fn is_valid_mime(raw: &str) -> bool {
    let Some((kind, subtype)) = raw.split_once('/') else {
        return false;
    };
    let token_ok = |token: &str| {
        !token.is_empty()
            && token
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
    };
    token_ok(kind) && token_ok(subtype)
}

fn invalid_payload_offset(payload: &str) -> Option<usize> {
    let body_len = payload.trim_end_matches('=').len();
    if payload.len() - body_len > 2 {
        return Some(body_len);
    }
    payload
        .char_indices()
        .take_while(|(offset, _)| *offset < body_len)
        .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '+' || *ch == '/'))
        .map(|(offset, _)| offset)
}

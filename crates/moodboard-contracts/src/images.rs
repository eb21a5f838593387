use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::data_uri::{format_data_uri, DataUri, DataUriError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageValueError {
    #[error("image MIME type must be an image/* type, got '{0}'")]
    InvalidMimeType(String),
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("image payload must be bare base64, not a data URI")]
    DataUriPrefix,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("image URL does not match the item's payload and MIME type")]
    MismatchedImageUrl,
    #[error(transparent)]
    DataUri(#[from] DataUriError),
}

/// Optional reference image that switches a call into edit mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BaseImageRecord")]
pub struct BaseImage {
    data: String,
    mime_type: String,
}

impl BaseImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Result<Self, ImageValueError> {
        let data = data.into();
        let mime_type = mime_type.into();
        validate_image_mime(&mime_type)?;
        if data.is_empty() {
            return Err(ImageValueError::EmptyPayload);
        }
        if data.starts_with("data:") {
            return Err(ImageValueError::DataUriPrefix);
        }
        BASE64
            .decode(data.as_bytes())
            .map_err(|err| ImageValueError::InvalidBase64(err.to_string()))?;
        Ok(Self { data, mime_type })
    }

    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self, ImageValueError> {
        let mime_type = mime_type.into();
        validate_image_mime(&mime_type)?;
        if bytes.is_empty() {
            return Err(ImageValueError::EmptyPayload);
        }
        Ok(Self {
            data: BASE64.encode(bytes),
            mime_type,
        })
    }

    /// Accepts the `data:<mime>;base64,<payload>` form a file reader produces.
    pub fn from_data_uri(text: &str) -> Result<Self, ImageValueError> {
        let (mime_type, payload) = DataUri::parse(text.trim())?.into_parts();
        Self::new(payload, mime_type)
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn to_data_uri(&self) -> String {
        format_data_uri(&self.mime_type, &self.data)
    }
}

/// One produced moodboard image.
///
/// `image_url`, `base64_data` and `mime_type` encode the same artifact and are
/// fixed at construction. Deserialization re-checks that they agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GeneratedItemRecord")]
pub struct GeneratedItem {
    id: String,
    image_url: String,
    prompt: String,
    base64_data: String,
    mime_type: String,
}

impl GeneratedItem {
    pub fn new(
        prompt: impl Into<String>,
        base64_data: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let base64_data = base64_data.into();
        let mime_type = mime_type.into();
        Self {
            id: Uuid::new_v4().to_string(),
            image_url: format_data_uri(&mime_type, &base64_data),
            prompt: prompt.into(),
            base64_data,
            mime_type,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn base64_data(&self) -> &str {
        &self.base64_data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data_uri(&self) -> Result<DataUri, DataUriError> {
        DataUri::parse(&self.image_url)
    }

    /// Reference image for a variation of this item.
    pub fn to_base_image(&self) -> Result<BaseImage, ImageValueError> {
        BaseImage::new(self.base64_data.clone(), self.mime_type.clone())
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, ImageValueError> {
        BASE64
            .decode(self.base64_data.as_bytes())
            .map_err(|err| ImageValueError::InvalidBase64(err.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseImageRecord {
    data: String,
    mime_type: String,
}

impl TryFrom<BaseImageRecord> for BaseImage {
    type Error = ImageValueError;

    fn try_from(record: BaseImageRecord) -> Result<Self, Self::Error> {
        Self::new(record.data, record.mime_type)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedItemRecord {
    id: String,
    image_url: String,
    prompt: String,
    base64_data: String,
    mime_type: String,
}

impl TryFrom<GeneratedItemRecord> for GeneratedItem {
    type Error = ImageValueError;

    fn try_from(record: GeneratedItemRecord) -> Result<Self, Self::Error> {
        let base = BaseImage::new(record.base64_data, record.mime_type)?;
        DataUri::parse(&record.image_url)?;
        if record.image_url != base.to_data_uri() {
            return Err(ImageValueError::MismatchedImageUrl);
        }
        Ok(Self {
            id: record.id,
            image_url: record.image_url,
            prompt: record.prompt,
            base64_data: base.data,
            mime_type: base.mime_type,
        })
    }
}

fn validate_image_mime(mime_type: &str) -> Result<(), ImageValueError> {
    let subtype = mime_type.strip_prefix("image/").unwrap_or_default();
    if subtype.is_empty() || subtype.contains(char::is_whitespace) {
        return Err(ImageValueError::InvalidMimeType(mime_type.to_string()));
    }
    Ok(())
}

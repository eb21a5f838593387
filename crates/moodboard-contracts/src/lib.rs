//! Shared vocabulary for the moodboard workspace: image values, the data-URI
//! grammar, backend identifiers, the domain error taxonomy and the session
//! command parser. Nothing in this crate touches the network.

pub mod backends;
pub mod commands;
pub mod data_uri;
pub mod errors;
pub mod images;

pub use backends::{Backend, GenerationMode, UnknownBackend};
pub use data_uri::{
    find_image_data_uri, format_data_uri, is_base64_payload, is_image_mime, DataUri, DataUriError,
};
pub use errors::{CallContext, DomainError, DomainErrorKind};
pub use images::{BaseImage, GeneratedItem, ImageValueError};

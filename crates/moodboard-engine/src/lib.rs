//! Provider adapter layer for moodboard image generation.
//!
//! Every adapter turns `(prompt, Option<BaseImage>)` into one JSON POST
//! against its backend, then normalizes the reply into a [`GeneratedItem`]
//! or a classified [`DomainError`].
//!
//! [`GeneratedItem`]: moodboard_contracts::GeneratedItem
//! [`DomainError`]: moodboard_contracts::DomainError

pub mod adapters;
pub mod classify;
pub mod config;
pub mod extract;
pub mod session;
mod transport;

pub use adapters::{
    build_adapter, AdapterRegistry, GeminiAdapter, ImageAdapter, MiniMaxAdapter, OpenAiAdapter,
    OpenRouterAdapter,
};
pub use classify::{classify, ErrorDetail, RawFailure};
pub use config::{BackendConfig, Config, ConfigError};
pub use extract::ExtractedImage;
pub use session::{Moodboard, SessionError};

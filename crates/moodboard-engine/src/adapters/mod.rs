use std::collections::BTreeMap;

use moodboard_contracts::{Backend, BaseImage, CallContext, DomainError, GeneratedItem};
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::extract::ExtractedImage;

mod gemini;
mod minimax;
mod openai;
mod openrouter;

pub use gemini::GeminiAdapter;
pub use minimax::MiniMaxAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;

const MOODBOARD_PREAMBLE: &str = "Create a clean, elegant architectural moodboard with a few well-chosen elements. Focus on essentials and visual harmony. No text.";

/// One image backend. `generate` edits when a base image is given and
/// creates from text otherwise; each call is a single request with no retry.
pub trait ImageAdapter: Send + Sync {
    fn backend(&self) -> Backend;
    fn generate(
        &self,
        prompt: &str,
        base_image: Option<&BaseImage>,
    ) -> Result<GeneratedItem, DomainError>;
}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Backend, Box<dyn ImageAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an adapter for every backend that has a credential.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for backend in config.configured() {
            registry
                .adapters
                .insert(backend, build_adapter(backend, config)?);
        }
        Ok(registry)
    }

    pub fn register<A: ImageAdapter + 'static>(&mut self, adapter: A) {
        self.adapters.insert(adapter.backend(), Box::new(adapter));
    }

    pub fn get(&self, backend: Backend) -> Option<&dyn ImageAdapter> {
        self.adapters.get(&backend).map(|adapter| adapter.as_ref())
    }

    pub fn take(&mut self, backend: Backend) -> Option<Box<dyn ImageAdapter>> {
        self.adapters.remove(&backend)
    }

    pub fn backends(&self) -> Vec<Backend> {
        self.adapters.keys().copied().collect()
    }
}

pub fn build_adapter(backend: Backend, config: &Config) -> Result<Box<dyn ImageAdapter>, ConfigError> {
    let backend_config = config.backend(backend)?.clone();
    let adapter: Box<dyn ImageAdapter> = match backend {
        Backend::MiniMax => Box::new(MiniMaxAdapter::new(backend_config)?),
        Backend::OpenAi => Box::new(OpenAiAdapter::new(backend_config)?),
        Backend::Gemini => Box::new(GeminiAdapter::new(backend_config)?),
        Backend::OpenRouter => Box::new(OpenRouterAdapter::new(backend_config)?),
    };
    Ok(adapter)
}

fn moodboard_prompt(theme: &str) -> String {
    format!("{MOODBOARD_PREAMBLE} Theme: {theme}")
}

fn reference_prompt(theme: &str) -> String {
    format!("{MOODBOARD_PREAMBLE} Use the visual reference as inspiration. Theme: {theme}")
}

/// Turns an extraction result into the call's outcome, logging either way.
fn finish(
    prompt: &str,
    extracted: Result<ExtractedImage, DomainError>,
    ctx: CallContext,
) -> Result<GeneratedItem, DomainError> {
    match extracted {
        Ok(image) => {
            let item = GeneratedItem::new(prompt, image.base64_data, image.mime_type);
            info!(
                backend = ctx.backend.name(),
                mode = ?ctx.mode,
                id = item.id(),
                mime_type = item.mime_type(),
                "moodboard item generated"
            );
            Ok(item)
        }
        Err(err) => {
            warn!(
                backend = ctx.backend.name(),
                mode = ?ctx.mode,
                kind = %err.kind(),
                "image response rejected: {}",
                err.message()
            );
            Err(err)
        }
    }
}

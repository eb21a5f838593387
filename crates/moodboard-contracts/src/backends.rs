use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::images::BaseImage;

/// Third-party image backends the engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    MiniMax,
    OpenAi,
    Gemini,
    OpenRouter,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::MiniMax,
        Backend::OpenAi,
        Backend::Gemini,
        Backend::OpenRouter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Backend::MiniMax => "minimax",
            Backend::OpenAi => "openai",
            Backend::Gemini => "gemini",
            Backend::OpenRouter => "openrouter",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Backend::MiniMax => "MiniMax",
            Backend::OpenAi => "OpenAI",
            Backend::Gemini => "Gemini",
            Backend::OpenRouter => "OpenRouter",
        }
    }

    /// Primary environment variable carrying this backend's credential.
    pub fn credential_env(self) -> &'static str {
        match self {
            Backend::MiniMax => "MINIMAX_API_KEY",
            Backend::OpenAi => "OPENAI_API_KEY",
            Backend::Gemini => "GEMINI_API_KEY",
            Backend::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend '{0}' (expected one of: minimax, openai, gemini, openrouter)")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name() == normalized)
            .ok_or_else(|| UnknownBackend(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Create,
    Edit,
}

impl GenerationMode {
    /// A present base image always means image-conditioned generation.
    pub fn for_base_image(base_image: Option<&BaseImage>) -> Self {
        match base_image {
            Some(_) => GenerationMode::Edit,
            None => GenerationMode::Create,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, GenerationMode};
    use crate::images::BaseImage;

    #[test]
    fn backend_names_round_trip_through_from_str() {
        for backend in Backend::ALL {
            assert_eq!(backend.name().parse::<Backend>(), Ok(backend));
        }
        assert_eq!(" OpenRouter ".parse::<Backend>(), Ok(Backend::OpenRouter));
    }

    #[test]
    fn unknown_backend_is_rejected_with_its_name() {
        let err = "dalle".parse::<Backend>().unwrap_err();
        assert_eq!(err.0, "dalle");
        assert!(err.to_string().contains("unknown backend 'dalle'"));
    }

    #[test]
    fn mode_follows_base_image_presence() {
        let base = BaseImage::new("aGVsbG8=", "image/png").unwrap();
        assert_eq!(GenerationMode::for_base_image(None), GenerationMode::Create);
        assert_eq!(
            GenerationMode::for_base_image(Some(&base)),
            GenerationMode::Edit
        );
    }
}

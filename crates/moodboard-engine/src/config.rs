use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use moodboard_contracts::Backend;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_OPENROUTER_REFERER: &str = "https://moodboard-ia.com";
const DEFAULT_OPENROUTER_TITLE: &str = "Moodboard IA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{env} is not set; the {} backend needs a credential", .backend.label())]
    MissingCredential { backend: Backend, env: &'static str },
    #[error("failed to build HTTP client for the {} backend", .backend.label())]
    HttpClient {
        backend: Backend,
        #[source]
        source: reqwest::Error,
    },
}

/// Everything one adapter needs: credential, endpoint root, transport limits
/// and any extra headers the backend expects on every call.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: SecretString,
    pub api_base: String,
    pub request_timeout: Duration,
    pub extra_headers: Vec<(String, String)>,
}

impl BackendConfig {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_base: normalize_api_base(&api_base.into()),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn ensure_credential(&self, backend: Backend) -> Result<(), ConfigError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                backend,
                env: backend.credential_env(),
            });
        }
        Ok(())
    }
}

/// Startup configuration for every backend, built once and handed to the
/// adapters. Backends without a credential are simply absent.
#[derive(Debug, Clone, Default)]
pub struct Config {
    backends: BTreeMap<Backend, BackendConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| -> Option<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let request_timeout = Duration::from_secs(
            non_empty("MOODBOARD_REQUEST_TIMEOUT")
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                .clamp(MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS),
        );

        let mut config = Self::new();
        for backend in Backend::ALL {
            let Some(api_key) = credential_env_candidates(backend)
                .iter()
                .find_map(|key| non_empty(*key))
            else {
                continue;
            };
            let api_base =
                non_empty(api_base_env(backend)).unwrap_or_else(|| default_api_base(backend).to_string());
            let mut backend_config =
                BackendConfig::new(api_key, api_base).with_request_timeout(request_timeout);
            if backend == Backend::OpenRouter {
                backend_config = backend_config
                    .with_header(
                        "HTTP-Referer",
                        non_empty("OPENROUTER_HTTP_REFERER")
                            .unwrap_or_else(|| DEFAULT_OPENROUTER_REFERER.to_string()),
                    )
                    .with_header(
                        "X-Title",
                        non_empty("OPENROUTER_X_TITLE")
                            .unwrap_or_else(|| DEFAULT_OPENROUTER_TITLE.to_string()),
                    );
            }
            config.backends.insert(backend, backend_config);
        }
        config
    }

    pub fn with_backend(mut self, backend: Backend, backend_config: BackendConfig) -> Self {
        self.backends.insert(backend, backend_config);
        self
    }

    pub fn backend(&self, backend: Backend) -> Result<&BackendConfig, ConfigError> {
        self.backends
            .get(&backend)
            .ok_or(ConfigError::MissingCredential {
                backend,
                env: backend.credential_env(),
            })
    }

    pub fn configured(&self) -> Vec<Backend> {
        self.backends.keys().copied().collect()
    }
}

pub fn default_api_base(backend: Backend) -> &'static str {
    match backend {
        Backend::MiniMax => "https://api.minimax.io/v1",
        Backend::OpenAi => "https://api.openai.com/v1",
        Backend::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        Backend::OpenRouter => "https://openrouter.ai/api/v1",
    }
}

fn api_base_env(backend: Backend) -> &'static str {
    match backend {
        Backend::MiniMax => "MINIMAX_API_BASE",
        Backend::OpenAi => "OPENAI_API_BASE",
        Backend::Gemini => "GEMINI_API_BASE",
        Backend::OpenRouter => "OPENROUTER_API_BASE",
    }
}

fn credential_env_candidates(backend: Backend) -> &'static [&'static str] {
    match backend {
        Backend::MiniMax => &["MINIMAX_API_KEY", "VITE_MINIMAX_API_KEY"],
        Backend::OpenAi => &["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"],
        Backend::Gemini => &["GEMINI_API_KEY", "VITE_GEMINI_API_KEY", "API_KEY"],
        Backend::OpenRouter => &["OPENROUTER_API_KEY", "VITE_OPENROUTER_API_KEY"],
    }
}

fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backends::{Backend, GenerationMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainErrorKind {
    InvalidCredential,
    RateLimited,
    QuotaExceeded,
    ContentPolicyBlocked,
    SafetyBlocked,
    EmptyResponse,
    MalformedResponse,
    Unknown,
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainErrorKind::InvalidCredential => "invalid_credential",
            DomainErrorKind::RateLimited => "rate_limited",
            DomainErrorKind::QuotaExceeded => "quota_exceeded",
            DomainErrorKind::ContentPolicyBlocked => "content_policy_blocked",
            DomainErrorKind::SafetyBlocked => "safety_blocked",
            DomainErrorKind::EmptyResponse => "empty_response",
            DomainErrorKind::MalformedResponse => "malformed_response",
            DomainErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Which backend was called and in which mode; selects the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub backend: Backend,
    pub mode: GenerationMode,
}

impl CallContext {
    pub fn new(backend: Backend, mode: GenerationMode) -> Self {
        Self { backend, mode }
    }

    fn failed_phrase(self) -> &'static str {
        match self.mode {
            GenerationMode::Create => "A geração da imagem falhou",
            GenerationMode::Edit => "A edição da imagem falhou",
        }
    }
}

/// User-facing failure of one adapter call. `Display` is the localized
/// message, ready to be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    kind: DomainErrorKind,
    message: String,
}

impl DomainError {
    pub fn kind(&self) -> DomainErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn invalid_credential(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::InvalidCredential,
            format!(
                "Chave da API {} inválida. Verifique sua {}.",
                ctx.backend.label(),
                ctx.backend.credential_env()
            ),
        )
    }

    pub fn rate_limited(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::RateLimited,
            format!(
                "Você excedeu o limite de solicitações da API {}. Por favor, espere um momento antes de tentar novamente.",
                ctx.backend.label()
            ),
        )
    }

    pub fn quota_exceeded(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::QuotaExceeded,
            format!(
                "Você excedeu sua cota da API {}. Verifique seu plano ou adicione créditos.",
                ctx.backend.label()
            ),
        )
    }

    pub fn content_policy_blocked(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::ContentPolicyBlocked,
            format!(
                "A solicitação foi recusada por violar a política de conteúdo da {}. Tente um prompt diferente.",
                ctx.backend.label()
            ),
        )
    }

    pub fn safety_blocked(ctx: CallContext, reason: &str) -> Self {
        Self::with(
            DomainErrorKind::SafetyBlocked,
            format!(
                "{} devido a filtros de segurança: {}",
                ctx.failed_phrase(),
                reason.trim()
            ),
        )
    }

    pub fn empty_response(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::EmptyResponse,
            format!(
                "{}. A API não retornou nenhuma imagem.",
                ctx.failed_phrase()
            ),
        )
    }

    pub fn malformed_response(ctx: CallContext) -> Self {
        Self::with(
            DomainErrorKind::MalformedResponse,
            format!(
                "{}. A API não retornou uma imagem em um formato reconhecido.",
                ctx.failed_phrase()
            ),
        )
    }

    /// Only this kind carries provider detail (status code, raw message).
    pub fn unknown(ctx: CallContext, detail: &str) -> Self {
        let prefix = match ctx.mode {
            GenerationMode::Create => "Falha ao gerar imagem",
            GenerationMode::Edit => "Falha ao editar imagem",
        };
        Self::with(DomainErrorKind::Unknown, format!("{prefix}: {}", detail.trim()))
    }

    pub fn unstructured(ctx: CallContext) -> Self {
        let message = match ctx.mode {
            GenerationMode::Create => "Ocorreu um erro desconhecido durante a geração da imagem.",
            GenerationMode::Edit => "Ocorreu um erro desconhecido durante a edição da imagem.",
        };
        Self::with(DomainErrorKind::Unknown, message.to_string())
    }

    fn with(kind: DomainErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

#[cfg(test)]
mod tests {
    use super::{CallContext, DomainError, DomainErrorKind};
    use crate::backends::{Backend, GenerationMode};

    fn create(backend: Backend) -> CallContext {
        CallContext::new(backend, GenerationMode::Create)
    }

    #[test]
    fn credential_message_names_backend_and_variable() {
        let err = DomainError::invalid_credential(create(Backend::MiniMax));
        assert_eq!(err.kind(), DomainErrorKind::InvalidCredential);
        assert_eq!(
            err.to_string(),
            "Chave da API MiniMax inválida. Verifique sua MINIMAX_API_KEY."
        );
    }

    #[test]
    fn safety_block_interpolates_reason_and_mode() {
        let ctx = CallContext::new(Backend::Gemini, GenerationMode::Edit);
        let err = DomainError::safety_blocked(ctx, " PROHIBITED_CONTENT ");
        assert_eq!(err.kind(), DomainErrorKind::SafetyBlocked);
        assert_eq!(
            err.message(),
            "A edição da imagem falhou devido a filtros de segurança: PROHIBITED_CONTENT"
        );
    }

    #[test]
    fn unknown_prefix_depends_on_mode() {
        let created = DomainError::unknown(create(Backend::OpenAi), "OpenAI API error: 500 - boom");
        assert_eq!(
            created.message(),
            "Falha ao gerar imagem: OpenAI API error: 500 - boom"
        );
        let edited = DomainError::unknown(
            CallContext::new(Backend::OpenRouter, GenerationMode::Edit),
            "socket closed",
        );
        assert_eq!(edited.message(), "Falha ao editar imagem: socket closed");
    }

    #[test]
    fn fixed_templates_carry_no_provider_detail() {
        let ctx = create(Backend::OpenRouter);
        for err in [
            DomainError::rate_limited(ctx),
            DomainError::quota_exceeded(ctx),
            DomainError::content_policy_blocked(ctx),
            DomainError::empty_response(ctx),
            DomainError::malformed_response(ctx),
            DomainError::unstructured(ctx),
        ] {
            assert!(!err.message().contains("429"));
            assert!(!err.message().is_empty());
        }
        assert_eq!(DomainError::unstructured(ctx).kind(), DomainErrorKind::Unknown);
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

const GENERIC_REMOTE_MESSAGE: &str = "Ocorreu um erro inesperado.";
const GENERIC_AUTH_MESSAGE: &str = "Sessão expirada ou sem permissão. Faça login novamente.";
const GENERIC_NETWORK_MESSAGE: &str = "Erro ao conectar com o servidor.";

/// Marca deixada na resposta quando a API da InovaTech recusou as credenciais.
/// Quem decide a navegação é o `navigation_controller`, nunca o cliente HTTP.
#[derive(Debug, Clone, Copy)]
pub struct AuthLost;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Checagens locais que não cabem no derive (CNPJ, confirmação de senha...)
    #[error("{0}")]
    InvalidInput(String),

    // 401/403 vindos da API
    #[error("{}", message_or(.message, GENERIC_AUTH_MESSAGE))]
    AuthExpired { status: u16, message: Option<String> },

    // Qualquer outra resposta fora da faixa 2xx
    #[error("{}", message_or(.message, GENERIC_REMOTE_MESSAGE))]
    Remote { status: u16, message: Option<String> },

    #[error("API indisponível: {0}")]
    NetworkUnavailable(#[source] reqwest::Error),

    // Relatório PDF sem os arquivos de fonte
    #[error("{0}")]
    FontNotFound(String),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

fn message_or<'a>(message: &'a Option<String>, fallback: &'a str) -> &'a str {
    message.as_deref().unwrap_or(fallback)
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// Preenche a mensagem de quem chamou quando a API não mandou `{"error": ...}`.
    /// Falha de rede vira um erro remoto com essa mesma mensagem.
    pub fn or_message(self, fallback: &str) -> Self {
        match self {
            AppError::Remote { status, message: None } => AppError::Remote {
                status,
                message: Some(fallback.to_string()),
            },
            AppError::AuthExpired { status, message: None } => AppError::AuthExpired {
                status,
                message: Some(fallback.to_string()),
            },
            AppError::NetworkUnavailable(e) => {
                tracing::warn!("API inacessível: {}", e);
                AppError::Remote {
                    status: StatusCode::BAD_GATEWAY.as_u16(),
                    message: Some(fallback.to_string()),
                }
            }
            other => other,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, AppError::AuthExpired { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            AppError::AuthExpired { status, message } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::UNAUTHORIZED);
                let body = Json(json!({
                    "error": message.unwrap_or_else(|| GENERIC_AUTH_MESSAGE.to_string()),
                }));
                let mut response = (status, body).into_response();
                response.extensions_mut().insert(AuthLost);
                return response;
            }
            AppError::Remote { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message.unwrap_or_else(|| GENERIC_REMOTE_MESSAGE.to_string()),
            ),
            AppError::NetworkUnavailable(ref e) => {
                tracing::warn!("API inacessível: {}", e);
                (StatusCode::BAD_GATEWAY, GENERIC_NETWORK_MESSAGE.to_string())
            }
            AppError::FontNotFound(message) => {
                tracing::error!("{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Não foi possível gerar o PDF.".to_string())
            }
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e @ AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_REMOTE_MESSAGE.to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

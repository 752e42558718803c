// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Recurso não encontrado: {0}")]
    NotFound(String),

    #[error("Arquivo de relatório não reconhecido: {0}")]
    UnknownReport(String),

    #[error("Aba '{sheet}' não encontrada no arquivo '{file}'")]
    SheetNotFound { file: String, sheet: String },

    #[error("Planilha ilegível: {0}")]
    Spreadsheet(String),

    #[error("Registro de relatórios inválido: {0}")]
    InvalidRegistry(String),

    #[error("Já existe um processamento em andamento para o apartamento {0}")]
    RobotBusy(i32),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` guarda o contexto de falhas inesperadas.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// Erro pronto para a resposta HTTP, já traduzido.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnknownReport(_) | AppError::SheetNotFound { .. } | AppError::Spreadsheet(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::RobotBusy(_) => StatusCode::CONFLICT,
            AppError::InvalidRegistry(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro de domínio na mensagem do idioma pedido pelo cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        let pt = locale.is_portuguese();

        let message = match self {
            AppError::ValidationError(errors) => {
                let fields: Vec<String> = errors
                    .field_errors()
                    .keys()
                    .map(|field| field.to_string())
                    .collect();
                if pt {
                    format!("Um ou mais campos são inválidos: {}", fields.join(", "))
                } else {
                    format!("One or more fields are invalid: {}", fields.join(", "))
                }
            }
            AppError::NotFound(what) => {
                if pt { format!("Não encontrado: {what}") } else { format!("Not found: {what}") }
            }
            AppError::UnknownReport(file) => {
                if pt {
                    format!("Arquivo '{file}' não corresponde a nenhum relatório conhecido.")
                } else {
                    format!("File '{file}' does not match any known report.")
                }
            }
            AppError::SheetNotFound { file, sheet } => {
                if pt {
                    format!("A aba '{sheet}' não existe no arquivo '{file}'.")
                } else {
                    format!("Sheet '{sheet}' is missing from file '{file}'.")
                }
            }
            AppError::Spreadsheet(detail) => {
                if pt {
                    format!("Não foi possível ler a planilha: {detail}")
                } else {
                    format!("Could not read the spreadsheet: {detail}")
                }
            }
            AppError::RobotBusy(tenant_id) => {
                if pt {
                    format!("Já existe um processamento em andamento para o apartamento {tenant_id}.")
                } else {
                    format!("A job is already running for tenant {tenant_id}.")
                }
            }
            AppError::BadRequest(detail) => detail.clone(),

            // Falhas internas: o detalhe vai para o log, nunca para o cliente.
            e @ (AppError::InvalidRegistry(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                if pt {
                    "Ocorreu um erro inesperado.".to_string()
                } else {
                    "An unexpected error occurred.".to_string()
                }
            }
        };

        ApiError { status, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RobotBusy(1).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::UnknownReport("a.xls".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn translates_messages_by_locale() {
        let err = AppError::UnknownReport("foo.xls".into());
        let pt = err.to_api_error(&Locale("pt".into()));
        let en = err.to_api_error(&Locale("en".into()));
        assert!(pt.message.contains("relatório conhecido"));
        assert!(en.message.contains("known report"));
    }

    #[test]
    fn hides_internal_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha=123"));
        let api = err.to_api_error(&Locale("en".into()));
        assert!(!api.message.contains("senha"));
    }
}

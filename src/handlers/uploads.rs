// src/handlers/uploads.rs

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::import::ImportReport,
};

// POST /api/uploads
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Importação",
    request_body(content_type = "multipart/form-data", description = "Um ou mais relatórios .xls/.xlsx exportados do ERP"),
    responses(
        (status = 200, description = "Resultado da importação de cada arquivo", body = Vec<ImportReport>),
        (status = 400, description = "Nenhum arquivo enviado"),
        (status = 422, description = "Arquivo não reconhecido ou planilha ilegível")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn upload_reports(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut reports = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()).to_api_error(&locale))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()).to_api_error(&locale))?;

        tracing::info!("Upload de '{}' ({} bytes) para o apartamento {}", file_name, bytes.len(), tenant.0);

        let report = app_state
            .import_service
            .import_upload(&file_name, bytes.to_vec(), tenant.0)
            .await
            .map_err(|e| e.to_api_error(&locale))?;
        reports.push(report);
    }

    if reports.is_empty() {
        return Err(AppError::BadRequest("nenhum arquivo no formulário".into()).to_api_error(&locale));
    }

    Ok((StatusCode::OK, Json(reports)))
}

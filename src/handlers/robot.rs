// src/handlers/robot.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::robot::{LogsQuery, RobotJob, RobotLogEntry, RobotSettingsPayload},
};

// GET /api/robot/settings
#[utoipa::path(
    get,
    path = "/api/robot/settings",
    tag = "Robô",
    responses(
        (status = 200, description = "Configurações do robô (chave -> valor)")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .robot_service
        .settings(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/robot/settings
#[utoipa::path(
    put,
    path = "/api/robot/settings",
    tag = "Robô",
    request_body = RobotSettingsPayload,
    responses(
        (status = 200, description = "Configurações gravadas"),
        (status = 400, description = "Payload inválido")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<RobotSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let saved = app_state
        .robot_service
        .save_settings(tenant.0, payload.settings)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(json!({ "saved": saved }))))
}

// POST /api/robot/jobs
#[utoipa::path(
    post,
    path = "/api/robot/jobs",
    tag = "Robô",
    responses(
        (status = 202, description = "Processamento da pasta de downloads enfileirado", body = RobotJob),
        (status = 409, description = "Já existe um processamento em andamento")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn submit_job(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let job = app_state
        .robot_service
        .submit_job(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::ACCEPTED, Json(job)))
}

// GET /api/robot/logs
#[utoipa::path(
    get,
    path = "/api/robot/logs",
    tag = "Robô",
    responses(
        (status = 200, description = "Log de progresso, mais recentes primeiro", body = Vec<RobotLogEntry>)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        LogsQuery
    )
)]
pub async fn get_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = app_state
        .robot_service
        .logs(tenant.0, query.limit)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(logs)))
}

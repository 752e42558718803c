// src/handlers/expense_groups.rs

use axum::{
    extract::State,
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
    models::classification::{ExpenseGroupFlag, UpdateGroupsPayload},
};

// GET /api/expense-groups
#[utoipa::path(
    get,
    path = "/api/expense-groups",
    tag = "Classificação",
    responses(
        (status = 200, description = "Grupos de despesa e sua classificação", body = Vec<ExpenseGroupFlag>)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn list_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let groups = app_state
        .classification_service
        .list(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(groups)))
}

// PUT /api/expense-groups
#[utoipa::path(
    put,
    path = "/api/expense-groups",
    tag = "Classificação",
    request_body = UpdateGroupsPayload,
    responses(
        (status = 200, description = "Classificação atualizada", body = Vec<ExpenseGroupFlag>),
        (status = 400, description = "Payload inválido")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn update_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<UpdateGroupsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    app_state
        .classification_service
        .update_flags(tenant.0, &payload.groups)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let groups = app_state
        .classification_service
        .list(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(groups)))
}

// POST /api/expense-groups/sync
#[utoipa::path(
    post,
    path = "/api/expense-groups/sync",
    tag = "Classificação",
    responses(
        (status = 200, description = "Quantidade de grupos novos criados")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn sync_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let inserted = app_state
        .classification_service
        .sync(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(json!({ "inserted": inserted }))))
}

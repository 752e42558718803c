// src/handlers/dashboard.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Query; // aceita ?filial=A&filial=B

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::{
        dashboard::{
            ExpenseAudit, ExpenseDashboard, FilterOptions, FinancialSummary, RevenueDashboard,
            TimeSeries, TripReport,
        },
        filter::ReportQuery,
    },
};

// GET /api/reports/summary
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Receita, custos, despesas, saldo e margem do período", body = FinancialSummary)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ReportQuery
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .dashboard_service
        .summary(tenant.0, &query.into_filter())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/reports/series
#[utoipa::path(
    get,
    path = "/api/reports/series",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Receita x custo x despesa por dia (até 62 dias) ou por mês", body = TimeSeries)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ReportQuery
    )
)]
pub async fn get_series(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let series = app_state
        .dashboard_service
        .time_series(tenant.0, &query.into_filter())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(series)))
}

// GET /api/reports/revenue
#[utoipa::path(
    get,
    path = "/api/reports/revenue",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Análise de faturamento", body = RevenueDashboard)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ReportQuery
    )
)]
pub async fn get_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = app_state
        .dashboard_service
        .revenue(tenant.0, &query.into_filter())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(dashboard)))
}

// GET /api/reports/expenses
#[utoipa::path(
    get,
    path = "/api/reports/expenses",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Análise de despesas", body = ExpenseDashboard)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ReportQuery
    )
)]
pub async fn get_expenses(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = app_state
        .dashboard_service
        .expenses(tenant.0, &query.into_filter())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(dashboard)))
}

// GET /api/reports/audit
#[utoipa::path(
    get,
    path = "/api/reports/audit",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Documentos que compõem cada grupo de custo/despesa", body = ExpenseAudit)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ReportQuery
    )
)]
pub async fn get_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let audit = app_state
        .dashboard_service
        .audit(tenant.0, &query.into_filter())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(audit)))
}

// GET /api/reports/trips/{num_conhec}
#[utoipa::path(
    get,
    path = "/api/reports/trips/{num_conhec}",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Resultado de uma viagem", body = TripReport),
        (status = 404, description = "Viagem ou faturamento não encontrado")
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento"),
        ("num_conhec" = String, Path, description = "Número do CT-e")
    )
)]
pub async fn get_trip_report(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(num_conhec): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .dashboard_service
        .trip_report(tenant.0, &num_conhec)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/reports/filters
#[utoipa::path(
    get,
    path = "/api/reports/filters",
    tag = "Relatórios",
    responses(
        (status = 200, description = "Filiais, placas com tipo e período padrão", body = FilterOptions)
    ),
    params(
        ("x-tenant-id" = i32, Header, description = "ID do apartamento")
    )
)]
pub async fn get_filter_options(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let options = app_state
        .dashboard_service
        .filter_options(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(options)))
}

// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Importação ---
        handlers::uploads::upload_reports,

        // --- Relatórios ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_series,
        handlers::dashboard::get_revenue,
        handlers::dashboard::get_expenses,
        handlers::dashboard::get_audit,
        handlers::dashboard::get_trip_report,
        handlers::dashboard::get_filter_options,

        // --- Classificação ---
        handlers::expense_groups::list_groups,
        handlers::expense_groups::update_groups,
        handlers::expense_groups::sync_groups,

        // --- Robô ---
        handlers::robot::get_settings,
        handlers::robot::update_settings,
        handlers::robot::submit_job,
        handlers::robot::get_logs,
    ),
    components(
        schemas(
            // --- Importação ---
            models::import::ImportReport,

            // --- Relatórios ---
            models::dashboard::FinancialSummary,
            models::dashboard::Granularity,
            models::dashboard::SeriesPoint,
            models::dashboard::TimeSeries,
            models::dashboard::NamedValue,
            models::dashboard::NamedCount,
            models::dashboard::RevenueDashboard,
            models::dashboard::BranchCategoryTotals,
            models::dashboard::FuelByVehicle,
            models::dashboard::ExpenseDashboard,
            models::dashboard::ExpenseAudit,
            models::dashboard::TripReport,
            models::dashboard::PlateEntry,
            models::dashboard::FilterOptions,

            // --- Classificação ---
            models::classification::Classification,
            models::classification::ExpenseGroupFlag,
            models::classification::GroupUpdate,
            models::classification::UpdateGroupsPayload,

            // --- Robô ---
            models::robot::DateWindow,
            models::robot::RobotJob,
            models::robot::RobotLogEntry,
            models::robot::RobotSettingsPayload,
        )
    ),
    tags(
        (name = "Importação", description = "Upload dos relatórios exportados do ERP"),
        (name = "Relatórios", description = "Resumo financeiro, séries e análises"),
        (name = "Classificação", description = "Grupos de despesa: custo de viagem ou despesa geral"),
        (name = "Robô", description = "Configuração, log e processamento dos downloads do robô")
    )
)]
pub struct ApiDoc;

//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::tenancy::tenant_guard;

const UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração ou banco a aplicação não sobe.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let upload_routes = Router::new()
        .route("/", post(handlers::uploads::upload_reports))
        // Planilhas do ERP passam fácil do limite padrão de 2 MB.
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(axum_middleware::from_fn(tenant_guard));

    let report_routes = Router::new()
        .route("/summary", get(handlers::dashboard::get_summary))
        .route("/series", get(handlers::dashboard::get_series))
        .route("/revenue", get(handlers::dashboard::get_revenue))
        .route("/expenses", get(handlers::dashboard::get_expenses))
        .route("/audit", get(handlers::dashboard::get_audit))
        .route("/trips/{num_conhec}", get(handlers::dashboard::get_trip_report))
        .route("/filters", get(handlers::dashboard::get_filter_options))
        .layer(axum_middleware::from_fn(tenant_guard));

    let expense_group_routes = Router::new()
        .route("/"
               ,get(handlers::expense_groups::list_groups)
               .put(handlers::expense_groups::update_groups)
        )
        .route("/sync", post(handlers::expense_groups::sync_groups))
        .layer(axum_middleware::from_fn(tenant_guard));

    let robot_routes = Router::new()
        .route("/settings"
               ,get(handlers::robot::get_settings)
               .put(handlers::robot::update_settings)
        )
        .route("/jobs", post(handlers::robot::submit_job))
        .route("/logs", get(handlers::robot::get_logs))
        .layer(axum_middleware::from_fn(tenant_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/uploads", upload_routes)
        .nest("/api/reports", report_routes)
        .nest("/api/expense-groups", expense_group_routes)
        .nest("/api/robot", robot_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

// src/config.rs

pub mod registry;

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{ExpenseGroupRepository, RobotRepository, TableRepository},
    services::{ClassificationService, DashboardService, ImportService, RobotService},
};
use registry::ReportRegistry;

/// Variáveis de ambiente lidas na inicialização.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub server_addr: String,
    pub downloads_dir: PathBuf,
    /// Substitui o registro embutido quando informado.
    pub registry_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let downloads_dir = env::var("DOWNLOADS_DIR").unwrap_or_else(|_| "downloads".to_string()).into();
        let registry_path = env::var("REPORT_REGISTRY_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { database_url, server_addr, downloads_dir, registry_path })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub import_service: ImportService,
    pub classification_service: ClassificationService,
    pub dashboard_service: DashboardService,
    pub robot_service: RobotService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let registry = Arc::new(ReportRegistry::load(settings.registry_path.as_deref())?);
        tracing::info!("✅ Registro de relatórios carregado: {} tabela(s)", registry.tables().count());

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let tables = Arc::new(TableRepository::new(db_pool.clone()));
        let groups = Arc::new(ExpenseGroupRepository::new(db_pool.clone()));
        let robot_repo = Arc::new(RobotRepository::new(db_pool.clone()));

        let classification_service = ClassificationService::new(groups, tables.clone(), registry.clone());
        let import_service = ImportService::new(tables.clone(), registry.clone(), classification_service.clone());
        let robot_service = RobotService::new(robot_repo, import_service.clone(), settings.downloads_dir.clone());
        let dashboard_service = DashboardService::new(
            tables,
            registry,
            classification_service.clone(),
            robot_service.clone(),
        );

        Ok(Self {
            db_pool,
            import_service,
            classification_service,
            dashboard_service,
            robot_service,
        })
    }
}

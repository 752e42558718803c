// src/db/robot_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{robot::RobotLogEntry, TenantId},
};

#[async_trait]
pub trait RobotStore: Send + Sync {
    async fn settings(&self, tenant_id: TenantId) -> Result<HashMap<String, String>, AppError>;
    async fn save_settings(&self, tenant_id: TenantId, settings: &[(String, String)]) -> Result<(), AppError>;
    async fn append_log(&self, tenant_id: TenantId, message: &str) -> Result<(), AppError>;
    /// Mais recentes primeiro.
    async fn logs(&self, tenant_id: TenantId, limit: i64) -> Result<Vec<RobotLogEntry>, AppError>;
}

#[derive(Clone)]
pub struct RobotRepository {
    pool: PgPool,
}

impl RobotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RobotStore for RobotRepository {
    async fn settings(&self, tenant_id: TenantId) -> Result<HashMap<String, String>, AppError> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT chave, valor FROM configuracoes_robo WHERE apartamento_id = $1",
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    async fn save_settings(&self, tenant_id: TenantId, settings: &[(String, String)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings {
            sqlx::query(
                r#"
                INSERT INTO configuracoes_robo (apartamento_id, chave, valor)
                VALUES ($1, $2, $3)
                ON CONFLICT (apartamento_id, chave) DO UPDATE SET valor = EXCLUDED.valor
                "#,
            )
                .bind(tenant_id)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_log(&self, tenant_id: TenantId, message: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO tb_logs_robo (apartamento_id, mensagem) VALUES ($1, $2)")
            .bind(tenant_id)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn logs(&self, tenant_id: TenantId, limit: i64) -> Result<Vec<RobotLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, RobotLogEntry>(
            r#"
            SELECT id, "timestamp", mensagem AS message
            FROM tb_logs_robo
            WHERE apartamento_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}

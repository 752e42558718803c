// src/db/expense_group_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{
        classification::{flag_char, parse_flag, ClassificationFlags, GroupFlags},
        TenantId,
    },
};

#[async_trait]
pub trait ExpenseGroupStore: Send + Sync {
    async fn flags(&self, tenant_id: TenantId) -> Result<ClassificationFlags, AppError>;

    /// Cria com as flags padrão os grupos que ainda não existem. Nunca altera
    /// uma linha existente. Retorna quantos foram criados.
    async fn insert_missing(&self, tenant_id: TenantId, groups: &[String]) -> Result<u64, AppError>;

    /// Grava as flags informadas (cria o grupo se preciso), numa transação.
    async fn save_flags(&self, tenant_id: TenantId, updates: &[(String, GroupFlags)]) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct ExpenseGroupRepository {
    pool: PgPool,
}

impl ExpenseGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseGroupStore for ExpenseGroupRepository {
    async fn flags(&self, tenant_id: TenantId) -> Result<ClassificationFlags, AppError> {
        let rows: Vec<(String, String, String, bool)> = sqlx::query_as(
            r#"
            SELECT group_name, is_despesa, is_custo_viagem, incluir_em_tipo_d
            FROM static_expense_groups
            WHERE apartamento_id = $1
            "#,
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        let groups: HashMap<String, GroupFlags> = rows
            .into_iter()
            .map(|(name, despesa, custo, tipo_d)| {
                let flags = GroupFlags {
                    is_despesa: parse_flag(&despesa),
                    is_custo_viagem: parse_flag(&custo),
                    include_in_type_d: tipo_d,
                };
                (name, flags)
            })
            .collect();
        Ok(ClassificationFlags::new(groups))
    }

    async fn insert_missing(&self, tenant_id: TenantId, groups: &[String]) -> Result<u64, AppError> {
        if groups.is_empty() {
            return Ok(0);
        }
        // Conflito = grupo já classificado; ignorado em silêncio.
        let inserted = sqlx::query(
            r#"
            INSERT INTO static_expense_groups (apartamento_id, group_name, is_despesa, is_custo_viagem)
            SELECT $1, g, 'S', 'N' FROM UNNEST($2::text[]) AS g
            ON CONFLICT (apartamento_id, group_name) DO NOTHING
            "#,
        )
            .bind(tenant_id)
            .bind(groups)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(inserted)
    }

    async fn save_flags(&self, tenant_id: TenantId, updates: &[(String, GroupFlags)]) -> Result<u64, AppError> {
        if updates.is_empty() {
            return Ok(0);
        }
        let names: Vec<String> = updates.iter().map(|(name, _)| name.clone()).collect();
        let despesa: Vec<String> = updates.iter().map(|(_, f)| flag_char(f.is_despesa).to_string()).collect();
        let custo: Vec<String> = updates.iter().map(|(_, f)| flag_char(f.is_custo_viagem).to_string()).collect();
        let tipo_d: Vec<bool> = updates.iter().map(|(_, f)| f.include_in_type_d).collect();

        let mut tx = self.pool.begin().await?;
        let saved = sqlx::query(
            r#"
            INSERT INTO static_expense_groups (apartamento_id, group_name, is_despesa, is_custo_viagem, incluir_em_tipo_d)
            SELECT $1, u.name, u.despesa, u.custo, u.tipo_d
            FROM UNNEST($2::text[], $3::text[], $4::text[], $5::bool[]) AS u(name, despesa, custo, tipo_d)
            ON CONFLICT (apartamento_id, group_name)
            DO UPDATE SET
                is_despesa = EXCLUDED.is_despesa,
                is_custo_viagem = EXCLUDED.is_custo_viagem,
                incluir_em_tipo_d = EXCLUDED.incluir_em_tipo_d
            "#,
        )
            .bind(tenant_id)
            .bind(&names)
            .bind(&despesa)
            .bind(&custo)
            .bind(&tipo_d)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(saved)
    }
}

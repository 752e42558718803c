// src/db/table_repo.rs
//
// Tabelas largas dos relatórios. As linhas trafegam como JSON
// (to_jsonb / jsonb_populate_recordset) para não depender de structs
// com 200 campos.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    config::registry::{TableSchema, TENANT_COLUMN},
    models::{dataset::Dataset, TenantId},
    services::coercion::coerce_dataset,
};

// Linhas por INSERT dentro da mesma transação.
const BATCH_SIZE: usize = 2_000;

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, AppError>;

    /// Linhas do tenant, tipadas pelo esquema. Tabela ausente = dataset vazio.
    async fn load_table(&self, schema: &TableSchema, tenant_id: TenantId) -> Result<Dataset, AppError>;

    /// Apaga as linhas do tenant e insere `data`, tudo numa transação.
    async fn replace_all(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError>;

    /// Insere ou atualiza pela chave natural (escopo do tenant), numa transação.
    async fn upsert(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError>;

    /// Valores distintos e não vazios de uma coluna (aparados).
    async fn distinct_values(
        &self,
        schema: &TableSchema,
        tenant_id: TenantId,
        column: &str,
    ) -> Result<Vec<String>, AppError>;
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn insert_sql(schema: &TableSchema, columns: &[String], on_conflict: bool) -> String {
    let table = quote_ident(&schema.name);
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let select_list: Vec<String> = columns.iter().map(|c| format!("r.{}", quote_ident(c))).collect();

    // apartamento_id vem sempre do parâmetro, nunca do arquivo.
    let mut sql = format!(
        "INSERT INTO {table} ({TENANT_COLUMN}, {}) SELECT $1, {} FROM jsonb_populate_recordset(NULL::{table}, $2::jsonb) AS r",
        column_list.join(", "),
        select_list.join(", "),
    );

    if on_conflict {
        let keys: Vec<String> = schema.key_columns.iter().map(|k| quote_ident(k)).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !schema.key_columns.iter().any(|k| k.eq_ignore_ascii_case(c)))
            .map(|c| format!("{0} = EXCLUDED.{0}", quote_ident(c)))
            .collect();
        sql.push_str(&format!(" ON CONFLICT (apartamento_id, {})", keys.join(", ")));
        if updates.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            sql.push_str(&format!(" DO UPDATE SET {}", updates.join(", ")));
        }
    }
    sql
}

#[derive(Clone)]
pub struct TableRepository {
    pool: PgPool,
}

impl TableRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_rows(
        tx: &mut Transaction<'_, Postgres>,
        schema: &TableSchema,
        tenant_id: TenantId,
        data: &Dataset,
        on_conflict: bool,
    ) -> Result<u64, AppError> {
        if data.is_empty() || data.columns().is_empty() {
            return Ok(0);
        }
        let sql = insert_sql(schema, data.columns(), on_conflict);
        let rows = data.to_json_rows();

        let mut written = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let result = sqlx::query(&sql)
                .bind(tenant_id)
                .bind(JsonValue::Array(chunk.to_vec()))
                .execute(&mut **tx)
                .await?;
            written += result.rows_affected();
        }
        Ok(written)
    }
}

#[async_trait]
impl TableStore for TableRepository {
    async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn load_table(&self, schema: &TableSchema, tenant_id: TenantId) -> Result<Dataset, AppError> {
        if !self.table_exists(&schema.name).await? {
            tracing::debug!("Tabela '{}' não existe; usando conjunto vazio", schema.name);
            return Ok(Dataset::new(schema.column_names()));
        }

        let sql = format!(
            "SELECT to_jsonb(t) - 'apartamento_id' FROM {} t WHERE t.apartamento_id = $1",
            quote_ident(&schema.name)
        );
        let rows: Vec<JsonValue> = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(Dataset::new(schema.column_names()));
        }
        let raw = Dataset::from_json_rows(&rows, &schema.column_names());
        Ok(coerce_dataset(schema, &raw))
    }

    async fn replace_all(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE apartamento_id = $1",
            quote_ident(&schema.name)
        ))
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let written = Self::insert_rows(&mut tx, schema, tenant_id, data, false).await?;
        tx.commit().await?;

        tracing::info!(
            "✅ '{}' substituída para o apartamento {}: {} removidas, {} inseridas",
            schema.name, tenant_id, deleted, written
        );
        Ok(written)
    }

    async fn upsert(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let written = Self::insert_rows(&mut tx, schema, tenant_id, data, true).await?;
        tx.commit().await?;

        tracing::info!(
            "✅ Upsert em '{}' para o apartamento {}: {} linhas",
            schema.name, tenant_id, written
        );
        Ok(written)
    }

    async fn distinct_values(
        &self,
        schema: &TableSchema,
        tenant_id: TenantId,
        column: &str,
    ) -> Result<Vec<String>, AppError> {
        // Resolve a grafia real da coluna (ou sai vazio se não existir).
        let actual: Option<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND lower(column_name) = lower($2)
            LIMIT 1
            "#,
        )
            .bind(&schema.name)
            .bind(column)
            .fetch_optional(&self.pool)
            .await?;

        let Some(actual) = actual else {
            return Ok(Vec::new());
        };

        let col = quote_ident(&actual);
        let sql = format!(
            "SELECT DISTINCT btrim({col}::text) FROM {} WHERE apartamento_id = $1 AND {col} IS NOT NULL AND btrim({col}::text) <> ''",
            quote_ident(&schema.name)
        );
        let values: Vec<String> = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }
}

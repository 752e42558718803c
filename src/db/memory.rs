// src/db/memory.rs
//
// Armazenamento em memória com a mesma semântica dos repositórios Postgres.
// Usado pelos testes dos serviços.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    common::error::AppError,
    config::registry::TableSchema,
    db::{ExpenseGroupStore, RobotStore, TableStore},
    models::{
        classification::{ClassificationFlags, GroupFlags},
        dataset::{Dataset, Value},
        robot::RobotLogEntry,
        TenantId,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<(String, TenantId), Dataset>>,
    groups: Mutex<HashMap<TenantId, HashMap<String, GroupFlags>>>,
    settings: Mutex<HashMap<TenantId, HashMap<String, String>>>,
    logs: Mutex<Vec<(TenantId, RobotLogEntry)>>,
    next_log_id: AtomicI64,
    fail_writes: AtomicBool,
}

fn lock_err<T>(_: std::sync::PoisonError<T>) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("lock envenenado"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faz toda escrita em tabela falhar (simula erro de banco).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn row_count(&self, table: &str, tenant_id: TenantId) -> usize {
        self.tables
            .lock()
            .map(|t| t.get(&(table.to_string(), tenant_id)).map_or(0, Dataset::len))
            .unwrap_or(0)
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("falha de escrita simulada")));
        }
        Ok(())
    }

    // Reposiciona a linha de `data` no layout das colunas do esquema.
    fn project(schema: &TableSchema, data: &Dataset, row: usize) -> Vec<Option<Value>> {
        schema
            .columns
            .iter()
            .map(|col| data.column(&col.name).map(|idx| data.value(row, idx).clone()))
            .collect()
    }

    fn key_of(schema: &TableSchema, stored: &Dataset, row: usize) -> Vec<Option<String>> {
        schema.key_columns.iter().map(|k| stored.get(row, k).as_text()).collect()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        let tables = self.tables.lock().map_err(lock_err)?;
        Ok(tables.keys().any(|(name, _)| name == table))
    }

    async fn load_table(&self, schema: &TableSchema, tenant_id: TenantId) -> Result<Dataset, AppError> {
        let tables = self.tables.lock().map_err(lock_err)?;
        Ok(tables
            .get(&(schema.name.clone(), tenant_id))
            .cloned()
            .unwrap_or_else(|| Dataset::new(schema.column_names())))
    }

    async fn replace_all(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError> {
        self.check_writable()?;
        let mut stored = Dataset::new(schema.column_names());
        for row in 0..data.len() {
            let values = Self::project(schema, data, row)
                .into_iter()
                .map(|v| v.unwrap_or(Value::Null))
                .collect();
            stored.push_row(values);
        }
        let written = stored.len() as u64;
        self.tables
            .lock()
            .map_err(lock_err)?
            .insert((schema.name.clone(), tenant_id), stored);
        Ok(written)
    }

    async fn upsert(&self, schema: &TableSchema, tenant_id: TenantId, data: &Dataset) -> Result<u64, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().map_err(lock_err)?;
        let current = tables
            .get(&(schema.name.clone(), tenant_id))
            .cloned()
            .unwrap_or_else(|| Dataset::new(schema.column_names()));

        let mut rows: Vec<Vec<Value>> = current.rows().to_vec();
        let mut keys: Vec<Vec<Option<String>>> =
            (0..current.len()).map(|r| Self::key_of(schema, &current, r)).collect();

        let mut written = 0;
        for row in 0..data.len() {
            let projected = Self::project(schema, data, row);
            let mut incoming = Dataset::new(schema.column_names());
            incoming.push_row(projected.iter().map(|v| v.clone().unwrap_or(Value::Null)).collect());
            let key = Self::key_of(schema, &incoming, 0);

            match keys.iter().position(|k| *k == key) {
                // Atualiza só as colunas presentes no lote.
                Some(pos) => {
                    for (idx, value) in projected.into_iter().enumerate() {
                        if let Some(value) = value {
                            rows[pos][idx] = value;
                        }
                    }
                }
                None => {
                    rows.push(incoming.rows()[0].clone());
                    keys.push(key);
                }
            }
            written += 1;
        }

        let mut stored = Dataset::new(schema.column_names());
        for row in rows {
            stored.push_row(row);
        }
        tables.insert((schema.name.clone(), tenant_id), stored);
        Ok(written)
    }

    async fn distinct_values(
        &self,
        schema: &TableSchema,
        tenant_id: TenantId,
        column: &str,
    ) -> Result<Vec<String>, AppError> {
        let data = self.load_table(schema, tenant_id).await?;
        let mut values: Vec<String> = Vec::new();
        for row in 0..data.len() {
            if let Some(v) = data.text(row, column) {
                if !values.contains(&v) {
                    values.push(v);
                }
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl ExpenseGroupStore for MemoryStore {
    async fn flags(&self, tenant_id: TenantId) -> Result<ClassificationFlags, AppError> {
        let groups = self.groups.lock().map_err(lock_err)?;
        Ok(ClassificationFlags::new(groups.get(&tenant_id).cloned().unwrap_or_default()))
    }

    async fn insert_missing(&self, tenant_id: TenantId, names: &[String]) -> Result<u64, AppError> {
        let mut groups = self.groups.lock().map_err(lock_err)?;
        let tenant = groups.entry(tenant_id).or_default();
        let mut inserted = 0;
        for name in names {
            if !tenant.contains_key(name) {
                tenant.insert(name.clone(), GroupFlags::default());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn save_flags(&self, tenant_id: TenantId, updates: &[(String, GroupFlags)]) -> Result<u64, AppError> {
        let mut groups = self.groups.lock().map_err(lock_err)?;
        let tenant = groups.entry(tenant_id).or_default();
        for (name, flags) in updates {
            tenant.insert(name.clone(), *flags);
        }
        Ok(updates.len() as u64)
    }
}

#[async_trait]
impl RobotStore for MemoryStore {
    async fn settings(&self, tenant_id: TenantId) -> Result<HashMap<String, String>, AppError> {
        let settings = self.settings.lock().map_err(lock_err)?;
        Ok(settings.get(&tenant_id).cloned().unwrap_or_default())
    }

    async fn save_settings(&self, tenant_id: TenantId, values: &[(String, String)]) -> Result<(), AppError> {
        let mut settings = self.settings.lock().map_err(lock_err)?;
        let tenant = settings.entry(tenant_id).or_default();
        for (key, value) in values {
            tenant.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn append_log(&self, tenant_id: TenantId, message: &str) -> Result<(), AppError> {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = RobotLogEntry { id, timestamp: Utc::now(), message: message.to_string() };
        self.logs.lock().map_err(lock_err)?.push((tenant_id, entry));
        Ok(())
    }

    async fn logs(&self, tenant_id: TenantId, limit: i64) -> Result<Vec<RobotLogEntry>, AppError> {
        let logs = self.logs.lock().map_err(lock_err)?;
        Ok(logs
            .iter()
            .rev()
            .filter(|(tenant, _)| *tenant == tenant_id)
            .take(limit.max(0) as usize)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

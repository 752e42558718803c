// src/services/import_service.rs
//
// Importação por tenant: normaliza cabeçalhos, tipa as células, aplica os
// filtros de linha do registro e grava (substituição total ou upsert).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    common::error::AppError,
    config::registry::{ImportStrategy, ReportDefinition, ReportRegistry, ReportRole, TableSchema},
    db::TableStore,
    models::{dataset::Dataset, import::ImportReport, TenantId},
    services::{
        classification_service::ClassificationService,
        coercion::coerce_dataset,
        normalizer::normalize,
        spreadsheet::{read_sheet_from_bytes, read_sheet_from_path},
    },
};

#[derive(Clone)]
pub struct ImportService {
    tables: Arc<dyn TableStore>,
    registry: Arc<ReportRegistry>,
    classification: ClassificationService,
}

impl ImportService {
    pub fn new(
        tables: Arc<dyn TableStore>,
        registry: Arc<ReportRegistry>,
        classification: ClassificationService,
    ) -> Self {
        Self { tables, registry, classification }
    }

    fn report_for_file(&self, file_name: &str) -> Result<ReportDefinition, AppError> {
        self.registry
            .by_file_name(file_name)
            .cloned()
            .ok_or_else(|| AppError::UnknownReport(file_name.to_string()))
    }

    /// Arquivo enviado pela interface; o nome decide o relatório.
    pub async fn import_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        tenant_id: TenantId,
    ) -> Result<ImportReport, AppError> {
        let report = self.report_for_file(file_name)?;
        let name = file_name.to_string();
        let sheet = report.sheet_name.clone();

        // calamine é bloqueante
        let raw = tokio::task::spawn_blocking(move || read_sheet_from_bytes(bytes, &name, &sheet))
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))??;

        self.store(&report, tenant_id, &raw).await
    }

    /// Arquivo já em disco (pasta de downloads do robô).
    pub async fn import_file(&self, path: &Path, tenant_id: TenantId) -> Result<ImportReport, AppError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let report = self.report_for_file(&file_name)?;
        let path: PathBuf = path.to_path_buf();
        let sheet = report.sheet_name.clone();

        let raw = tokio::task::spawn_blocking(move || read_sheet_from_path(&path, &sheet))
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))??;

        self.store(&report, tenant_id, &raw).await
    }

    /// Linhas já lidas, endereçadas pelo nome da tabela.
    pub async fn import_rows(
        &self,
        table_name: &str,
        tenant_id: TenantId,
        raw: &Dataset,
    ) -> Result<ImportReport, AppError> {
        let report = self
            .registry
            .by_table(table_name)
            .cloned()
            .ok_or_else(|| AppError::UnknownReport(table_name.to_string()))?;
        self.store(&report, tenant_id, raw).await
    }

    async fn store(
        &self,
        report: &ReportDefinition,
        tenant_id: TenantId,
        raw: &Dataset,
    ) -> Result<ImportReport, AppError> {
        let schema = &report.table;
        let (normalized, unrecognized) = normalize(raw, schema);

        let mut result = ImportReport {
            report_key: report.key.clone(),
            table: schema.name.clone(),
            rows_received: raw.len(),
            rows_written: 0,
            unrecognized_columns: unrecognized,
        };

        let typed = apply_row_filters(schema, &coerce_dataset(schema, &normalized));
        if typed.columns().is_empty() || typed.is_empty() {
            tracing::info!("'{}' sem linhas reconhecidas; nada gravado", report.file_name);
            return Ok(result);
        }

        result.rows_written = match schema.strategy {
            ImportStrategy::ReplaceAll => self.tables.replace_all(schema, tenant_id, &typed).await?,
            ImportStrategy::Upsert => {
                let unique = dedupe_on_key(schema, &typed);
                self.tables.upsert(schema, tenant_id, &unique).await?
            }
        };

        tracing::info!(
            "✅ '{}' importado para o apartamento {}: {} de {} linha(s)",
            report.file_name, tenant_id, result.rows_written, result.rows_received
        );

        if report.role == Some(ReportRole::Expenses) {
            self.classification.sync(tenant_id).await?;
        }
        Ok(result)
    }
}

/// Filtros de linha do registro; coluna ausente = filtro ignorado.
pub fn apply_row_filters(schema: &TableSchema, data: &Dataset) -> Dataset {
    let mut out = data.clone();
    for filter in &schema.row_filters {
        let Some(col) = out.column(&filter.column) else {
            continue;
        };
        out = out.retain_rows(|row| filter.keeps(out.value(row, col).as_text().as_deref()));
    }
    out
}

/// Uma linha por chave natural; a última ocorrência vence.
pub fn dedupe_on_key(schema: &TableSchema, data: &Dataset) -> Dataset {
    if schema.key_columns.is_empty() {
        return data.clone();
    }
    let key_of = |row: usize| -> Vec<Option<String>> {
        schema.key_columns.iter().map(|k| data.text(row, k)).collect()
    };

    let mut last: HashMap<Vec<Option<String>>, usize> = HashMap::new();
    for row in 0..data.len() {
        last.insert(key_of(row), row);
    }
    if last.len() < data.len() {
        tracing::debug!("'{}': {} linha(s) duplicada(s) na chave", schema.name, data.len() - last.len());
    }
    data.retain_rows(|row| last.get(&key_of(row)) == Some(&row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, db::ExpenseGroupStore, models::dataset::Value};

    fn services(store: &Arc<MemoryStore>) -> ImportService {
        let registry = Arc::new(ReportRegistry::embedded().unwrap());
        let classification = ClassificationService::new(store.clone(), store.clone(), registry.clone());
        ImportService::new(store.clone(), registry, classification)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn raw(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        let mut ds = Dataset::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    fn trips() -> Dataset {
        raw(
            &["numConhec", "PLACAVEICULO", "freteEmpresa", "colunaEstranha"],
            vec![
                vec![text("1"), text("abc1234"), text("1.500,50"), text("x")],
                vec![text("2"), text("XYZ9876"), Value::Number(200.0), text("y")],
            ],
        )
    }

    fn expenses(rows: Vec<Vec<Value>>) -> Dataset {
        raw(&["numNota", "dataControle", "nomeForn", "descGrupoD", "liquido", "VED", "despesa"], rows)
    }

    #[tokio::test]
    async fn replace_all_is_idempotent_and_reports_extra_columns() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);

        let first = svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();
        let second = svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.rows_written, 2);
        assert_eq!(second.unrecognized_columns, vec!["colunaEstranha"]);
        assert_eq!(store.row_count("relFilViagensCliente", 1), 2);
    }

    #[tokio::test]
    async fn headers_match_case_insensitively_and_keep_canonical_names() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();

        let registry = ReportRegistry::embedded().unwrap();
        let schema = &registry.by_table("relFilViagensCliente").unwrap().table;
        let stored = store.load_table(schema, 1).await.unwrap();
        assert_eq!(stored.text(0, "placaVeiculo").as_deref(), Some("abc1234"));
        assert!(stored.columns().iter().any(|c| c == "placaVeiculo"));
        assert_eq!(stored.get(0, "freteEmpresa"), &Value::Number(1500.5));
        assert_eq!(stored.get(1, "numConhec"), &Value::Integer(2));
    }

    #[tokio::test]
    async fn tenants_never_see_each_other() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();

        let one_trip = raw(&["numConhec"], vec![vec![text("9")]]);
        svc.import_rows("relFilViagensCliente", 2, &one_trip).await.unwrap();

        assert_eq!(store.row_count("relFilViagensCliente", 1), 2);
        assert_eq!(store.row_count("relFilViagensCliente", 2), 1);
    }

    #[tokio::test]
    async fn tenant_column_in_the_file_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        let claims_other_tenant = raw(
            &["apartamento_id", "numConhec", "freteEmpresa"],
            vec![
                vec![Value::Integer(2), text("1"), text("1.000,00")],
                vec![text("2"), text("2"), text("500")],
            ],
        );

        let report = svc.import_rows("relFilViagensCliente", 1, &claims_other_tenant).await.unwrap();

        assert_eq!(report.unrecognized_columns, vec!["apartamento_id"]);
        assert_eq!(report.rows_written, 2);
        assert_eq!(store.row_count("relFilViagensCliente", 1), 2);
        assert_eq!(store.row_count("relFilViagensCliente", 2), 0);

        let registry = ReportRegistry::embedded().unwrap();
        let schema = &registry.by_table("relFilViagensCliente").unwrap().table;
        let stored = store.load_table(schema, 1).await.unwrap();
        assert!(!stored.has_column("apartamento_id"));
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_key_with_the_last_value() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        let batch = expenses(vec![
            vec![text("10"), text("01/03/2024"), text("POSTO A"), text("DIESEL"), text("100,00"), text("S"), text("S")],
            vec![text("10"), text("01/03/2024"), text("POSTO A"), text("DIESEL"), text("150,00"), text("S"), text("S")],
            vec![text("11"), text("02/03/2024"), text("POSTO A"), text("PEDAGIO"), text("30"), text("S"), text("S")],
        ]);

        let report = svc.import_rows("relFilDespesasGerais", 1, &batch).await.unwrap();
        assert_eq!(report.rows_written, 2);

        // Reimportar não duplica.
        svc.import_rows("relFilDespesasGerais", 1, &batch).await.unwrap();
        assert_eq!(store.row_count("relFilDespesasGerais", 1), 2);

        let registry = ReportRegistry::embedded().unwrap();
        let schema = &registry.by_table("relFilDespesasGerais").unwrap().table;
        let stored = store.load_table(schema, 1).await.unwrap();
        assert_eq!(stored.number(0, "liquido"), 150.0);
    }

    #[tokio::test]
    async fn row_filters_drop_entries_and_non_expenses() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        let batch = expenses(vec![
            vec![text("1"), text("01/03/2024"), text("A"), text("DIESEL"), text("10"), text("E"), text("S")],
            vec![text("2"), text("01/03/2024"), text("A"), text("DIESEL"), text("10"), text("S"), text("N")],
            vec![text("3"), text("01/03/2024"), text("A"), text("DIESEL"), text("10"), text("S"), text("S")],
        ]);
        let report = svc.import_rows("relFilDespesasGerais", 1, &batch).await.unwrap();
        assert_eq!(report.rows_received, 3);
        assert_eq!(report.rows_written, 1);
    }

    #[tokio::test]
    async fn expense_import_syncs_classification() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        let batch = expenses(vec![vec![
            text("1"), text("01/03/2024"), text("A"), text("LAVAGEM"), text("10"), text("S"), text("S"),
        ]]);
        svc.import_rows("relFilDespesasGerais", 4, &batch).await.unwrap();

        let flags = store.flags(4).await.unwrap();
        assert!(flags.get("LAVAGEM").is_some());
        assert_eq!(flags.len(), 3);
    }

    #[tokio::test]
    async fn failed_write_leaves_previous_data_untouched() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();

        store.fail_writes(true);
        let one_trip = raw(&["numConhec"], vec![vec![text("9")]]);
        assert!(svc.import_rows("relFilViagensCliente", 1, &one_trip).await.is_err());
        assert_eq!(store.row_count("relFilViagensCliente", 1), 2);
    }

    #[tokio::test]
    async fn unrecognized_only_files_write_nothing() {
        let store = Arc::new(MemoryStore::new());
        let svc = services(&store);
        svc.import_rows("relFilViagensCliente", 1, &trips()).await.unwrap();

        let junk = raw(&["foo", "bar"], vec![vec![text("1"), text("2")]]);
        let report = svc.import_rows("relFilViagensCliente", 1, &junk).await.unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(report.unrecognized_columns, vec!["foo", "bar"]);
        assert_eq!(store.row_count("relFilViagensCliente", 1), 2);
    }

    #[tokio::test]
    async fn unknown_files_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = services(&store)
            .import_upload("planilha.xls", Vec::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownReport(_)));
    }

    #[test]
    fn dedupe_without_key_keeps_everything() {
        let schema: TableSchema = serde_json::from_str(
            r#"{"name": "t", "strategy": "replace_all", "columns": [{"name": "a", "type": "text"}]}"#,
        )
        .unwrap();
        let data = raw(&["a"], vec![vec![text("x")], vec![text("x")]]);
        assert_eq!(dedupe_on_key(&schema, &data).len(), 2);
    }
}

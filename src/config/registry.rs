// src/config/registry.rs
//
// Registro dos relatórios do ERP: arquivo -> aba -> tabela, com o esquema
// tipado de cada tabela. É dado (JSON), não código: um sexto relatório entra
// aqui sem tocar no motor de agregação.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

const EMBEDDED_REGISTRY: &str = include_str!("reports.json");

/// Coluna do tenant; vem sempre da requisição, nunca do arquivo.
pub const TENANT_COLUMN: &str = "apartamento_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    Integer,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    /// Formato chrono tentado antes dos formatos genéricos.
    #[serde(default)]
    pub format: Option<String>,
    /// Outros cabeçalhos aceitos para esta coluna.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ColumnSpec {
    pub fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        self.name.eq_ignore_ascii_case(header)
            || self.aliases.iter().any(|a| a.trim().eq_ignore_ascii_case(header))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStrategy {
    /// Apaga tudo do tenant na tabela e insere o snapshot novo.
    ReplaceAll,
    /// Insere; em colisão da chave natural (por tenant) atualiza a linha.
    Upsert,
}

/// Filtro de linhas aplicado na importação. Ignorado se a coluna não existir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFilter {
    pub column: String,
    #[serde(default)]
    pub equals: Option<String>,
    #[serde(default)]
    pub not_equals: Option<String>,
}

impl RowFilter {
    pub fn keeps(&self, value: Option<&str>) -> bool {
        let value = value.map(str::trim);
        if let Some(expected) = &self.equals {
            if value != Some(expected.as_str()) {
                return false;
            }
        }
        if let Some(rejected) = &self.not_equals {
            if value == Some(rejected.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub name: String,
    pub strategy: ImportStrategy,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub row_filters: Vec<RowFilter>,
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn column(&self, header: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.matches(header))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for col in &self.columns {
            let names = std::iter::once(&col.name).chain(col.aliases.iter());
            for name in names {
                if name.trim().eq_ignore_ascii_case(TENANT_COLUMN) {
                    return Err(AppError::InvalidRegistry(format!(
                        "'{}' é reservada e não pode ser coluna de '{}'",
                        TENANT_COLUMN, self.name
                    )));
                }
                if !seen.insert(name.trim().to_lowercase()) {
                    return Err(AppError::InvalidRegistry(format!(
                        "coluna '{}' declarada mais de uma vez em '{}'",
                        name, self.name
                    )));
                }
            }
        }
        for key in &self.key_columns {
            if self.column(key).is_none() {
                return Err(AppError::InvalidRegistry(format!(
                    "chave '{}' não existe no esquema de '{}'",
                    key, self.name
                )));
            }
        }
        if self.strategy == ImportStrategy::Upsert && self.key_columns.is_empty() {
            return Err(AppError::InvalidRegistry(format!(
                "tabela '{}' usa upsert sem chave natural",
                self.name
            )));
        }
        Ok(())
    }
}

/// Papel da tabela nos cálculos do painel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportRole {
    Trips,
    Invoices,
    Expenses,
    Payables,
    Receivables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub key: String,
    pub file_name: String,
    pub sheet_name: String,
    #[serde(default)]
    pub role: Option<ReportRole>,
    pub table: TableSchema,
}

/// Colunas candidatas (por prioridade) para cada filtro semântico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterColumns {
    pub date: Vec<String>,
    pub plate: Vec<String>,
    pub branch: Vec<String>,
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            date: vec!["dataControle".into(), "dataViagemMotorista".into(), "dataVenc".into()],
            plate: vec!["placaVeiculo".into(), "placa".into()],
            branch: vec!["nomeFilial".into(), "nomeFil".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRegistry {
    #[serde(default)]
    pub filters: FilterColumns,
    pub reports: Vec<ReportDefinition>,
}

impl ReportRegistry {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let registry: ReportRegistry = serde_json::from_str(raw)
            .map_err(|e| AppError::InvalidRegistry(e.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Registro padrão, embutido no binário.
    pub fn embedded() -> Result<Self, AppError> {
        Self::from_json(EMBEDDED_REGISTRY)
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InvalidRegistry(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Usa o arquivo informado, ou o registro embutido.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                tracing::info!("Carregando registro de relatórios de {}", path.display());
                Self::from_path(path)
            }
            None => Self::embedded(),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut files = HashSet::new();
        let mut tables = HashSet::new();
        let mut roles = HashSet::new();
        for report in &self.reports {
            report.table.validate()?;
            if !files.insert(report.file_name.as_str()) {
                return Err(AppError::InvalidRegistry(format!(
                    "arquivo '{}' repetido", report.file_name
                )));
            }
            if !tables.insert(report.table.name.as_str()) {
                return Err(AppError::InvalidRegistry(format!(
                    "tabela '{}' repetida", report.table.name
                )));
            }
            if let Some(role) = report.role {
                if !roles.insert(role) {
                    return Err(AppError::InvalidRegistry(format!(
                        "papel {:?} atribuído a mais de um relatório", role
                    )));
                }
            }
        }
        Ok(())
    }

    /// Casa o nome exato do arquivo (sem diretórios).
    pub fn by_file_name(&self, file_name: &str) -> Option<&ReportDefinition> {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(file_name);
        self.reports.iter().find(|r| r.file_name == base)
    }

    pub fn by_table(&self, table: &str) -> Option<&ReportDefinition> {
        self.reports.iter().find(|r| r.table.name == table)
    }

    pub fn by_role(&self, role: ReportRole) -> Option<&ReportDefinition> {
        self.reports.iter().find(|r| r.role == Some(role))
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.reports.iter().map(|r| &r.table)
    }
}

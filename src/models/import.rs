// src/models/import.rs

use serde::Serialize;
use utoipa::ToSchema;

/// Resultado de uma importação de planilha.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub report_key: String,
    pub table: String,
    pub rows_received: usize,
    pub rows_written: u64,
    /// Colunas ignoradas (avisar o usuário).
    pub unrecognized_columns: Vec<String>,
}

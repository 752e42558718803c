// src/models/filter.rs

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

/// Sentinela de "sem filtro" usada pela interface.
pub const ALL: &str = "Todos";

/// Filtros do painel, já validados.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub plate: String,
    pub branches: Vec<String>,
    pub business_type: String,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            plate: ALL.to_string(),
            branches: Vec::new(),
            business_type: ALL.to_string(),
        }
    }
}

fn active(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && value != ALL).then_some(value)
}

impl ReportFilter {
    pub fn has_date_filter(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Placa normalizada (maiúscula, aparada) quando o filtro está ativo.
    pub fn plate_filter(&self) -> Option<String> {
        active(&self.plate).map(str::to_uppercase)
    }

    pub fn business_type_filter(&self) -> Option<&str> {
        active(&self.business_type)
    }

    /// Filiais em maiúsculas; vazio = todas.
    pub fn branch_filter(&self) -> Vec<String> {
        self.branches
            .iter()
            .map(|b| b.trim().to_uppercase())
            .filter(|b| !b.is_empty())
            .collect()
    }
}

/// Parâmetros de consulta dos relatórios (`?filial=A&filial=B` é aceito).
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// AAAA-MM-DD
    pub start_date: Option<String>,
    /// AAAA-MM-DD
    pub end_date: Option<String>,
    /// Placa ou "Todos"
    pub placa: Option<String>,
    #[serde(default)]
    pub filial: Vec<String>,
    /// "Todos", "FROTA", "AGENCIAMENTO"...
    pub tipo_negocio: Option<String>,
}

impl ReportQuery {
    /// Datas inválidas anulam o período inteiro (as duas datas são ignoradas).
    pub fn into_filter(self) -> ReportFilter {
        let parse = |raw: &Option<String>| -> Result<Option<NaiveDate>, ()> {
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| ()),
            }
        };
        let (start_date, end_date) = match (parse(&self.start_date), parse(&self.end_date)) {
            (Ok(start), Ok(end)) => (start, end),
            _ => {
                tracing::debug!("Período inválido ignorado: {:?} a {:?}", self.start_date, self.end_date);
                (None, None)
            }
        };

        ReportFilter {
            start_date,
            end_date,
            plate: self.placa.unwrap_or_else(|| ALL.to_string()),
            branches: self.filial,
            business_type: self.tipo_negocio.unwrap_or_else(|| ALL.to_string()),
        }
    }
}

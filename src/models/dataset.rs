// src/models/dataset.rs

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

/// Valor de uma célula, já tipado (ou ainda cru, quando vem da planilha).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Nulo ou texto em branco.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => crate::services::coercion::parse_locale_number(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(dt) => Some(dt.date()),
            Value::Text(s) => crate::services::coercion::parse_datetime(s, None).map(|dt| dt.date()),
            _ => None,
        }
    }

    /// Representação textual aparada; `None` para nulos e brancos.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(format_number(*n)),
            Value::Integer(i) => Some(i.to_string()),
            Value::Date(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Date(dt) => JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }

    pub fn from_json(value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Text(if *b { "S".into() } else { "N".into() }),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Value::Integer)
                .or_else(|| n.as_f64().map(Value::Number))
                .unwrap_or(Value::Null),
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

// 123.0 -> "123"; 1.5 -> "1.5"
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Tabela em memória: colunas ordenadas + linhas posicionais.
///
/// A busca de colunas é sempre case-insensitive, mas os nomes guardados
/// mantêm a grafia original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Monta a partir de objetos JSON (uma linha por objeto). A ordem das
    /// colunas segue `preferred` e, depois, a ordem em que aparecem.
    pub fn from_json_rows(rows: &[JsonValue], preferred: &[String]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        let present = |name: &str| {
            rows.iter().any(|r| r.as_object().is_some_and(|o| o.contains_key(name)))
        };
        for name in preferred {
            if present(name) && !seen.contains_key(name) {
                seen.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
        for row in rows {
            if let Some(obj) = row.as_object() {
                for key in obj.keys() {
                    if !seen.contains_key(key) {
                        seen.insert(key.clone(), columns.len());
                        columns.push(key.clone());
                    }
                }
            }
        }

        let mut dataset = Dataset::new(columns);
        for row in rows {
            let Some(obj) = row.as_object() else { continue };
            let mut values = vec![Value::Null; dataset.columns.len()];
            for (key, value) in obj {
                if let Some(&idx) = seen.get(key) {
                    values[idx] = Value::from_json(value);
                }
            }
            dataset.rows.push(values);
        }
        dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adiciona uma linha; completa com nulos ou trunca para o número de colunas.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.columns.iter().position(|c| c.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primeira coluna presente entre os candidatos, na ordem dada.
    pub fn first_column<S: AsRef<str>>(&self, candidates: &[S]) -> Option<usize> {
        candidates.iter().find_map(|c| self.column(c.as_ref()))
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }

    /// Valor de uma coluna pelo nome; nulo se a coluna não existir.
    pub fn get(&self, row: usize, name: &str) -> &Value {
        match self.column(name) {
            Some(idx) => self.value(row, idx),
            None => &Value::Null,
        }
    }

    pub fn text(&self, row: usize, name: &str) -> Option<String> {
        self.get(row, name).as_text()
    }

    pub fn number(&self, row: usize, name: &str) -> f64 {
        self.get(row, name).as_f64().unwrap_or(0.0)
    }

    pub fn date(&self, row: usize, name: &str) -> Option<NaiveDate> {
        self.get(row, name).as_date()
    }

    /// Mantém as linhas para as quais `keep` é verdadeiro, preservando a ordem.
    pub fn retain_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(usize) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(idx, _)| keep(*idx))
            .map(|(_, row)| row.clone())
            .collect();
        Dataset { columns: self.columns.clone(), rows }
    }

    pub fn row_to_json(&self, row: usize) -> serde_json::Map<String, JsonValue> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), self.value(row, idx).to_json()))
            .collect()
    }

    pub fn to_json_rows(&self) -> Vec<JsonValue> {
        (0..self.rows.len())
            .map(|idx| JsonValue::Object(self.row_to_json(idx)))
            .collect()
    }
}

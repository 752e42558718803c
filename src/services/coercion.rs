// src/services/coercion.rs
//
// Conversão célula a célula para o tipo declarado no registro.
// Nunca falha: valor ruim vira nulo (datas) ou zero (números).

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    config::registry::{ColumnSpec, ColumnType, TableSchema},
    models::dataset::{format_number, Dataset, Value},
};

// Formatos com dia primeiro (padrão do ERP), depois ISO.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%Y-%m-%d", "%Y/%m/%d"];

// Faixa de seriais do Excel aceitos como data (1900-01-01 .. 9999-12-31).
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 1.0..=2_958_465.0;

/// Textos que o export do ERP usa para "sem valor".
pub fn is_null_like(s: &str) -> bool {
    matches!(s.trim(), "" | "nan" | "NaN" | "NaT" | "None" | "null")
}

/// Número em texto no formato brasileiro ("1.234,56").
///
/// Ponto é sempre separador de milhar e a vírgula é o decimal: "1.500"
/// vale 1500. Células numéricas da planilha não passam por aqui.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if is_null_like(&compact) {
        return None;
    }
    let normalized = compact.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = serial.floor();
    let date = base.checked_add_days(Days::new(days as u64))?;
    let seconds = ((serial - days) * 86_400.0).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)?;
    Some(date.and_time(time))
}

/// Data tolerante: formato explícito, dia primeiro, ISO e, por fim, serial do Excel.
pub fn parse_datetime(raw: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if is_null_like(s) {
        return None;
    }

    if let Some(fmt) = format {
        if let Some(dt) = parse_with(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    s.parse::<f64>().ok().and_then(excel_serial_to_datetime)
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, fmt)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, fmt).ok().map(|d| d.and_time(NaiveTime::MIN)))
}

fn to_number(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) if n.is_finite() => *n,
        Value::Integer(i) => *i as f64,
        Value::Text(s) => parse_locale_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Converte uma célula crua para o tipo da coluna.
pub fn coerce_value(spec: &ColumnSpec, raw: &Value) -> Value {
    match spec.kind {
        ColumnType::Date => match raw {
            Value::Date(dt) => Value::Date(*dt),
            Value::Number(n) => excel_serial_to_datetime(*n).map_or(Value::Null, Value::Date),
            Value::Integer(i) => excel_serial_to_datetime(*i as f64).map_or(Value::Null, Value::Date),
            Value::Text(s) => parse_datetime(s, spec.format.as_deref()).map_or(Value::Null, Value::Date),
            Value::Null => Value::Null,
        },
        ColumnType::Number => Value::Number(to_number(raw)),
        ColumnType::Integer => {
            let n = to_number(raw).trunc();
            if n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                Value::Integer(n as i64)
            } else {
                Value::Integer(0)
            }
        }
        ColumnType::Text => match raw {
            Value::Null => Value::Null,
            Value::Text(s) if is_null_like(s) => Value::Null,
            Value::Text(s) => Value::Text(s.trim().to_string()),
            Value::Number(n) => Value::Text(format_number(*n)),
            Value::Integer(i) => Value::Text(i.to_string()),
            Value::Date(dt) => Value::Text(dt.format("%d/%m/%Y").to_string()),
        },
    }
}

/// Aplica o esquema da tabela a um dataset já normalizado. Colunas fora do
/// esquema passam como estão. Não altera a entrada.
pub fn coerce_dataset(schema: &TableSchema, data: &Dataset) -> Dataset {
    let specs: Vec<Option<&ColumnSpec>> =
        data.columns().iter().map(|name| schema.column(name)).collect();

    let mut out = Dataset::new(data.columns().to_vec());
    for row in data.rows() {
        let coerced = row
            .iter()
            .zip(&specs)
            .map(|(value, spec)| match spec {
                Some(spec) => coerce_value(spec, value),
                None => value.clone(),
            })
            .collect();
        out.push_row(coerced);
    }
    out
}
